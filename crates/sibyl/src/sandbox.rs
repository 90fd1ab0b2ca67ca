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

//! Executes vetted statements against an isolated query context. The
//! context only ever sees a private copy of the uploaded dataset under
//! the name `df`, so generated code cannot mutate caller state or
//! reach other tables.

use plan_contracts::AnalysisError;
use polars::prelude::*;
use polars::sql::SQLContext;
use sqlparser::ast::Statement;
use std::time::Duration;
use tokio::task;
use tracing::debug;

const RESULT_TABLE: &str = "result";
const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SandboxedExecutor {
    time_limit: Duration,
}

impl Default for SandboxedExecutor {
    fn default() -> Self {
        Self {
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }
}

impl SandboxedExecutor {
    pub fn new(time_limit: Duration) -> Self {
        Self { time_limit }
    }

    /// Runs the statements on a blocking worker under a wall-clock
    /// limit and returns the `result` table the final statement is
    /// required to create.
    pub async fn run(
        &self,
        df: &DataFrame,
        statements: &[Statement],
    ) -> Result<DataFrame, AnalysisError> {
        let df = df.clone();
        let sql: Vec<String> = statements.iter().map(|s| s.to_string()).collect();
        let limit = self.time_limit;

        let handle = task::spawn_blocking(move || run_statements(df, &sql));
        match tokio::time::timeout(limit, handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => Err(AnalysisError::ExecutionFailed(format!(
                "execution worker failed: {join_error}"
            ))),
            Err(_) => Err(AnalysisError::ExecutionFailed(format!(
                "execution exceeded the {}s time limit",
                limit.as_secs()
            ))),
        }
    }
}

fn run_statements(df: DataFrame, sql: &[String]) -> Result<DataFrame, AnalysisError> {
    let mut ctx = SQLContext::new();
    ctx.register("df", df.lazy());

    for statement in sql {
        debug!(statement = %statement, "executing");
        let frame = ctx
            .execute(statement)
            .map_err(|e| AnalysisError::ExecutionFailed(e.to_string()))?;
        // Collect eagerly so missing columns and type errors surface on
        // the statement that caused them rather than at the end.
        frame
            .collect()
            .map_err(|e| AnalysisError::ExecutionFailed(e.to_string()))?;
    }

    if !ctx.get_tables().iter().any(|name| name == RESULT_TABLE) {
        return Err(AnalysisError::ExecutionFailed(
            "generated code did not set 'result'".to_string(),
        ));
    }

    ctx.execute(&format!("SELECT * FROM {RESULT_TABLE}"))
        .and_then(|frame| frame.collect())
        .map_err(|e| AnalysisError::ExecutionFailed(e.to_string()))
}
