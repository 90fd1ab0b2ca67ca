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

//! Dataset KPI block attached to every successful analysis: top and
//! bottom groups, average and total over the first categorical/numeric
//! pair the generated code actually used.

use polars::prelude::*;
use serde::Serialize;
use tabula::profile::column_kind;
use tabula::ColumnKind;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct Summary {
    pub dataset: DatasetInfo,
    pub kpis: Vec<Kpi>,
    pub highlights: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DatasetInfo {
    pub rows: usize,
    pub cols_count: usize,
    pub columns: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Kpi {
    pub label: String,
    pub value: String,
    pub sub: String,
}

pub fn build(df: &DataFrame, used_columns: Option<&[String]>) -> Summary {
    let columns: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|name| (*name).to_string())
        .collect();
    let mut summary = Summary {
        dataset: DatasetInfo {
            rows: df.height(),
            cols_count: columns.len(),
            columns,
        },
        kpis: Vec::new(),
        highlights: Vec::new(),
    };

    let Some((group_col, value_col)) = pick_pair(df, used_columns.unwrap_or(&[])) else {
        return summary;
    };
    match grouped_kpis(df, &group_col, &value_col) {
        Ok((kpis, highlights)) => {
            summary.kpis = kpis;
            summary.highlights = highlights;
        }
        Err(e) => debug!("summary aggregation skipped: {e}"),
    }
    summary
}

/// First categorical and first numeric column among the columns the
/// generated code referenced.
fn pick_pair(df: &DataFrame, used: &[String]) -> Option<(String, String)> {
    let mut group_col = None;
    let mut value_col = None;
    for name in used {
        let Ok(column) = df.column(name) else {
            continue;
        };
        match column_kind(column.dtype()) {
            ColumnKind::Numeric if value_col.is_none() => value_col = Some(name.clone()),
            ColumnKind::Categorical if group_col.is_none() => group_col = Some(name.clone()),
            _ => {}
        }
    }
    Some((group_col?, value_col?))
}

fn grouped_kpis(
    df: &DataFrame,
    group_col: &str,
    value_col: &str,
) -> PolarsResult<(Vec<Kpi>, Vec<String>)> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([col(group_col)])
        .agg([col(value_col).sum().alias("total")])
        .sort(
            ["total"],
            SortMultipleOptions::default().with_order_descending(true),
        )
        .collect()?;
    if grouped.height() == 0 {
        return Ok((Vec::new(), Vec::new()));
    }

    let labels = grouped
        .column(group_col)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let labels = labels.str()?;
    let totals = grouped
        .column("total")?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let totals = totals.f64()?;

    let last = grouped.height() - 1;
    let top_label = labels.get(0).unwrap_or("").to_string();
    let top_value = totals.get(0).unwrap_or(0.0);
    let bottom_label = labels.get(last).unwrap_or("").to_string();
    let bottom_value = totals.get(last).unwrap_or(0.0);
    let total_value: f64 = totals.into_iter().flatten().sum();
    let avg_value = df
        .column(value_col)?
        .as_materialized_series()
        .cast(&DataType::Float64)?
        .f64()?
        .mean()
        .unwrap_or(0.0);

    let kpis = vec![
        Kpi {
            label: "Top".to_string(),
            value: top_label.clone(),
            sub: format!("{value_col}: {top_value:.2}"),
        },
        Kpi {
            label: "Low".to_string(),
            value: bottom_label.clone(),
            sub: format!("{value_col}: {bottom_value:.2}"),
        },
        Kpi {
            label: "Average".to_string(),
            value: format!("{avg_value:.2}"),
            sub: value_col.to_string(),
        },
        Kpi {
            label: "Total".to_string(),
            value: format!("{total_value:.2}"),
            sub: value_col.to_string(),
        },
    ];
    let highlights = vec![
        format!("Dominant: {top_label} ({top_value:.2})"),
        format!("Weakest: {bottom_label} ({bottom_value:.2})"),
    ];
    Ok((kpis, highlights))
}
