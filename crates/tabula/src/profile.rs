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

use crate::error::Result;
use polars::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Categorical,
}

/// Classification is by dtype only; heuristic sniffing already happened
/// during date inference at ingestion.
pub fn column_kind(dtype: &DataType) -> ColumnKind {
    match dtype {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => ColumnKind::Numeric,
        DataType::Date | DataType::Datetime(_, _) => ColumnKind::Temporal,
        _ => ColumnKind::Categorical,
    }
}

/// Compact textual profile of a dataset, suitable for grounding a
/// code-generating model: shape, column lists by kind, per-column
/// detail and a three-row sample.
pub fn profile(df: &DataFrame) -> Result<String> {
    let mut numeric_cols: Vec<&str> = Vec::new();
    let mut date_cols: Vec<&str> = Vec::new();
    let mut categorical_cols: Vec<&str> = Vec::new();
    let mut details: Vec<String> = Vec::new();

    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let name = series.name().as_str();
        match column_kind(series.dtype()) {
            ColumnKind::Numeric => {
                numeric_cols.push(name);
                let floats = series.cast(&DataType::Float64)?;
                let chunked = floats.f64()?;
                match (chunked.min(), chunked.max()) {
                    (Some(min), Some(max)) => {
                        details.push(format!("{name}(numeric: {min:.2} to {max:.2})"));
                    }
                    _ => details.push(format!("{name}(numeric: all NaN)")),
                }
            }
            ColumnKind::Temporal => {
                date_cols.push(name);
                let millis = series
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                    .cast(&DataType::Int64)?;
                let chunked = millis.i64()?;
                match (chunked.min(), chunked.max()) {
                    (Some(min), Some(max)) => {
                        details.push(format!(
                            "{name}(datetime: from {} to {})",
                            format_timestamp(min),
                            format_timestamp(max)
                        ));
                    }
                    _ => details.push(format!("{name}(datetime: all NaN)")),
                }
            }
            ColumnKind::Categorical => {
                categorical_cols.push(name);
                let unique = series.n_unique()?;
                details.push(format!("{name}(categorical: {unique} unique)"));
            }
        }
    }

    let mut parts = vec![
        format!("Shape: {} rows x {} columns", df.height(), df.width()),
        String::new(),
        "AVAILABLE COLUMNS (use these exact names in your code):".to_string(),
        format!("All columns: {:?}", df.get_column_names_str()),
    ];
    if !numeric_cols.is_empty() {
        parts.push(format!("Numeric columns: {numeric_cols:?}"));
    }
    if !date_cols.is_empty() {
        parts.push(format!("Date columns: {date_cols:?}"));
    }
    if !categorical_cols.is_empty() {
        parts.push(format!("Categorical columns: {categorical_cols:?}"));
    }
    parts.push(String::new());
    parts.push(format!("Column details: {}", details.join(", ")));
    parts.push(String::new());

    let sample = sample_records(df, 3)?;
    let rendered: Vec<String> = sample
        .iter()
        .map(|record| {
            let fields: Vec<String> = record
                .iter()
                .map(|(name, value)| format!("{name}: {value:?}"))
                .collect();
            format!("{{{}}}", fields.join(", "))
        })
        .collect();
    parts.push(format!("Sample data (first 3 rows): [{}]", rendered.join(", ")));

    Ok(parts.join("\n"))
}

/// First categorical and first numeric column name, empty strings when
/// the dataset has none of that kind.
pub fn pick_example_columns(df: &DataFrame) -> (String, String) {
    let mut categorical = String::new();
    let mut numeric = String::new();
    for column in df.get_columns() {
        match column_kind(column.dtype()) {
            ColumnKind::Numeric if numeric.is_empty() => {
                numeric = column.name().to_string();
            }
            ColumnKind::Categorical if categorical.is_empty() => {
                categorical = column.name().to_string();
            }
            _ => {}
        }
    }
    (categorical, numeric)
}

/// First `n` rows as ordered (column, value) pairs with nulls rendered
/// as empty strings.
pub fn sample_records(df: &DataFrame, n: usize) -> Result<Vec<Vec<(String, String)>>> {
    let head = df.head(Some(n));
    let mut rendered_columns = Vec::with_capacity(head.width());
    for column in head.get_columns() {
        let strings = column
            .as_materialized_series()
            .cast(&DataType::String)?;
        let chunked = strings.str()?.clone();
        rendered_columns.push((column.name().to_string(), chunked));
    }
    let mut records = Vec::with_capacity(head.height());
    for row in 0..head.height() {
        let record = rendered_columns
            .iter()
            .map(|(name, chunked)| {
                (
                    name.clone(),
                    chunked.get(row).unwrap_or_default().to_string(),
                )
            })
            .collect();
        records.push(record);
    }
    Ok(records)
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map_or_else(|| millis.to_string(), |dt| dt.naive_utc().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_dtypes() {
        assert_eq!(column_kind(&DataType::Float64), ColumnKind::Numeric);
        assert_eq!(
            column_kind(&DataType::Datetime(TimeUnit::Milliseconds, None)),
            ColumnKind::Temporal
        );
        assert_eq!(column_kind(&DataType::String), ColumnKind::Categorical);
        assert_eq!(column_kind(&DataType::Boolean), ColumnKind::Categorical);
    }
}
