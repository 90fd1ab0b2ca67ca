// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! End-to-end orchestration of one question: profile the dataset, ask
//! the model for a plan, screen and execute the generated SQL, then
//! render the result. Chart rendering is best effort; every earlier
//! stage aborts the run with a classified error.

use crate::client::ModelClient;
use crate::prompt;
use crate::render;
use crate::sandbox::SandboxedExecutor;
use crate::validate;
use once_cell::sync::Lazy;
use plan_contracts::{AnalysisError, AnalysisResponse, ChartKind, ChartSpec, Plan};
use polars::prelude::*;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};

static MISSING_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)not found|unable to find|no such column|ColumnNotFound")
        .expect("static pattern")
});
static DATE_COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(compare|comparison|cast).*(date|datetime|str)").expect("static pattern")
});

pub struct Pipeline {
    client: Arc<dyn ModelClient>,
    executor: SandboxedExecutor,
}

impl Pipeline {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            executor: SandboxedExecutor::default(),
        }
    }

    pub fn with_executor(client: Arc<dyn ModelClient>, executor: SandboxedExecutor) -> Self {
        Self { client, executor }
    }

    /// Answers one natural-language question about an ingested dataset.
    pub async fn run(
        &self,
        df: &DataFrame,
        question: &str,
    ) -> Result<AnalysisResponse, AnalysisError> {
        // date inference runs again here so callers that skipped
        // read_table still get typed temporal columns; it is a no-op
        // on already-converted frames
        let df = tabula::infer_dates(df.clone())
            .map_err(|e| AnalysisError::ExecutionFailed(format!("date inference failed: {e}")))?;
        let df = &df;
        let profile = tabula::profile(df)
            .map_err(|e| AnalysisError::ExecutionFailed(format!("profiling failed: {e}")))?;
        let (example_categorical, example_numeric) = tabula::pick_example_columns(df);
        let columns: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|name| (*name).to_string())
            .collect();

        let request = prompt::build_request(
            &profile,
            question,
            &columns,
            &example_categorical,
            &example_numeric,
        );
        info!(request_id = %request.id, question, "requesting plan");
        let content = self.client.complete(&request).await?;
        let plan = parse_plan(&content)?;
        info!(chart = %plan.chart, "plan received");

        let statements = validate::validate(&plan.transformation_code)?;
        let result = self
            .executor
            .run(df, &statements)
            .await
            .map_err(|e| enrich_execution_error(e, &columns))?;

        let chart_png_base64 = self.render_best_effort(&result, &plan)?;

        Ok(AnalysisResponse {
            question: question.to_string(),
            intent: plan.intent,
            reasoning: plan.reasoning,
            chart: plan.chart,
            chart_png_base64,
            preview_rows: df.height(),
            preview_cols: df.width(),
            used_columns: Some(used_columns(&columns, &plan.transformation_code)),
            transformation_code: plan.transformation_code,
            answer_hint: plan.answer_hint,
            generated_at: chrono::Utc::now(),
        })
    }

    /// Requested chart first, then a plain table, then a text panel.
    /// Shape mismatches are the one recoverable error class; anything
    /// fatal the renderer reports aborts the run like any other stage.
    fn render_best_effort(
        &self,
        result: &DataFrame,
        plan: &Plan,
    ) -> Result<String, AnalysisError> {
        let spec = ChartSpec {
            kind: plan.chart,
            title: Some(plan.intent.clone()),
            colorbar_label: None,
        };
        match render::render(result, &spec) {
            Ok(png) => Ok(png),
            Err(error) if error.is_fatal() => Err(error),
            Err(error) => {
                warn!(chart = %plan.chart, %error, "chart rendering failed, falling back");
                let fallback = ChartSpec {
                    kind: ChartKind::Table,
                    title: Some(plan.intent.clone()),
                    colorbar_label: None,
                };
                if plan.chart != ChartKind::Table {
                    if let Ok(png) = render::render(result, &fallback) {
                        return Ok(png);
                    }
                }
                let message = plan
                    .answer_hint
                    .clone()
                    .unwrap_or_else(|| error.user_message());
                Ok(render::render_message(&message).unwrap_or_default())
            }
        }
    }
}

/// Extracts a `Plan` from raw model output. Code fences and prose
/// around the JSON object are tolerated; anything else is a
/// `ModelResponseInvalid`.
pub fn parse_plan(content: &str) -> Result<Plan, AnalysisError> {
    let stripped = strip_code_fences(content);
    if let Ok(plan) = serde_json::from_str::<Plan>(stripped.trim()) {
        return Ok(plan);
    }

    let start = stripped.find('{');
    let end = stripped.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(plan) = serde_json::from_str::<Plan>(&stripped[start..=end]) {
                return Ok(plan);
            }
        }
    }
    Err(AnalysisError::ModelResponseInvalid(format!(
        "no parseable plan in model output ({} chars)",
        content.len()
    )))
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Which dataset columns the generated code touches, by name match.
/// A substring check is deliberately loose; quoting and qualification
/// vary too much for anything stricter to be worth it.
fn used_columns(columns: &[String], code: &str) -> Vec<String> {
    columns
        .iter()
        .filter(|name| code.contains(name.as_str()))
        .cloned()
        .collect()
}

/// Attaches actionable hints to the opaque engine errors users hit
/// most: misspelt columns and string-vs-date comparisons.
fn enrich_execution_error(error: AnalysisError, columns: &[String]) -> AnalysisError {
    let AnalysisError::ExecutionFailed(detail) = error else {
        return error;
    };
    let mut enriched = detail.clone();
    if MISSING_COLUMN.is_match(&detail) {
        enriched.push_str(&format!(". Available columns: {columns:?}"));
    } else if DATE_COMPARISON.is_match(&detail) {
        enriched.push_str(
            ". Hint: compare date columns against typed values, e.g. CAST('2024-01-01' AS DATE)",
        );
    }
    AnalysisError::ExecutionFailed(enriched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let plan = parse_plan(
            r#"{"intent":"totals","reasoning":"sum","chart":"bar","transformation_code":"CREATE TABLE result AS SELECT 1"}"#,
        )
        .unwrap();
        assert_eq!(plan.chart, ChartKind::Bar);
        assert_eq!(plan.answer_hint, None);
    }

    #[test]
    fn parses_fenced_json_with_prose() {
        let content = "Here is the plan:\n```json\n{\"intent\":\"t\",\"reasoning\":\"r\",\"chart\":\"pie\",\"transformation_code\":\"SELECT 1\"}\n```";
        let plan = parse_plan(content).unwrap();
        assert_eq!(plan.chart, ChartKind::Pie);
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_plan("I cannot answer that.").unwrap_err();
        assert!(matches!(err, AnalysisError::ModelResponseInvalid(_)));
    }

    #[test]
    fn missing_chart_defaults_to_bar() {
        let plan = parse_plan(
            r#"{"intent":"t","reasoning":"r","transformation_code":"SELECT 1"}"#,
        )
        .unwrap();
        assert_eq!(plan.chart, ChartKind::Bar);
    }

    #[test]
    fn used_columns_matches_by_substring() {
        let columns = vec!["region".to_string(), "revenue".to_string(), "id".to_string()];
        let used = used_columns(
            &columns,
            "CREATE TABLE result AS SELECT region, SUM(revenue) FROM df GROUP BY region",
        );
        assert_eq!(used, vec!["region".to_string(), "revenue".to_string()]);
    }

    #[test]
    fn missing_column_errors_list_alternatives() {
        let columns = vec!["region".to_string()];
        let enriched = enrich_execution_error(
            AnalysisError::ExecutionFailed("column 'regon' not found".to_string()),
            &columns,
        );
        match enriched {
            AnalysisError::ExecutionFailed(detail) => {
                assert!(detail.contains("Available columns"));
                assert!(detail.contains("region"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
