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

use crate::dates::{infer_dates, parse_datetime};
use crate::error::{Result, TabularError};
use calamine::{Data, Reader, Xlsx};
use polars::prelude::*;
use std::io::Cursor;
use tracing::debug;

/// Parses raw upload bytes into a cleaned dataset. Dispatch is by file
/// extension with a csv -> excel -> json probing fallback when the
/// extension is absent or unrecognised. Date inference, duplicate
/// column removal and empty-row removal always apply; an empty result
/// is an error.
pub fn read_table(raw: &[u8], filename: &str) -> Result<DataFrame> {
    let lower = filename.to_lowercase();
    let df = if lower.ends_with(".csv") {
        read_csv(raw)?
    } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        read_excel(raw)?
    } else if lower.ends_with(".json") {
        read_json(raw)?
    } else if lower.ends_with(".parquet") {
        read_parquet(raw)?
    } else {
        probe(raw, filename)?
    };
    let df = infer_dates(df)?;
    clean(df)
}

fn read_csv(raw: &[u8]) -> Result<DataFrame> {
    Ok(CsvReader::new(Cursor::new(raw.to_vec())).finish()?)
}

fn read_json(raw: &[u8]) -> Result<DataFrame> {
    Ok(JsonReader::new(Cursor::new(raw.to_vec())).finish()?)
}

fn read_parquet(raw: &[u8]) -> Result<DataFrame> {
    Ok(ParquetReader::new(Cursor::new(raw.to_vec())).finish()?)
}

fn probe(raw: &[u8], filename: &str) -> Result<DataFrame> {
    if let Ok(df) = read_csv(raw) {
        if df.width() > 0 {
            return Ok(df);
        }
    }
    if let Ok(df) = read_excel(raw) {
        return Ok(df);
    }
    read_json(raw).map_err(|e| TabularError::UndetectableFormat {
        filename: filename.to_string(),
        reason: e.to_string(),
    })
}

fn clean(mut df: DataFrame) -> Result<DataFrame> {
    // Polars renames later duplicate headers with a _duplicated_ marker;
    // drop those copies so only the first occurrence survives. A column
    // the user genuinely named with that marker has no base column to
    // collide with and is kept.
    let names: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|name| (*name).to_string())
        .collect();
    let duplicates: Vec<String> = names
        .iter()
        .filter(|name| {
            name.find("_duplicated_")
                .is_some_and(|at| names.iter().any(|other| other == &name[..at]))
        })
        .cloned()
        .collect();
    for name in duplicates {
        debug!("dropping duplicate column '{name}'");
        df.drop_in_place(&name)?;
    }

    if df.width() > 0 && df.height() > 0 {
        let mut any_valid = df.get_columns()[0].as_materialized_series().is_not_null();
        for column in df.get_columns().iter().skip(1) {
            any_valid = &any_valid | &column.as_materialized_series().is_not_null();
        }
        df = df.filter(&any_valid)?;
    }

    if df.height() == 0 {
        return Err(TabularError::EmptyDataset);
    }
    Ok(df)
}

fn read_excel(raw: &[u8]) -> Result<DataFrame> {
    let mut workbook = Xlsx::new(Cursor::new(raw.to_vec()))
        .map_err(|e| TabularError::Excel(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TabularError::Excel("workbook has no sheets".to_string()))?
        .map_err(|e| TabularError::Excel(e.to_string()))?;
    range_to_dataframe(&range)
}

fn range_to_dataframe(range: &calamine::Range<Data>) -> Result<DataFrame> {
    let mut rows = range.rows();
    let header_row = rows.next().ok_or(TabularError::EmptyDataset)?;
    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(index, cell)| match cell {
            Data::String(text) if !text.trim().is_empty() => text.trim().to_string(),
            Data::Empty => format!("column_{index}"),
            other => other.to_string(),
        })
        .collect();
    let body: Vec<&[Data]> = rows.collect();
    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
    for (index, name) in headers.iter().enumerate() {
        let cells: Vec<Option<&Data>> = body.iter().map(|row| row.get(index)).collect();
        columns.push(build_column(name, &cells)?);
    }
    Ok(DataFrame::new(columns)?)
}

fn build_column(name: &str, cells: &[Option<&Data>]) -> Result<Column> {
    let mut has_datetime = false;
    let mut has_number = false;
    let mut has_text = false;
    for cell in cells.iter().flatten() {
        match cell {
            Data::DateTime(_) | Data::DateTimeIso(_) => has_datetime = true,
            Data::Float(_) | Data::Int(_) => has_number = true,
            Data::String(text) if !text.trim().is_empty() => has_text = true,
            Data::Bool(_) => has_text = true,
            _ => {}
        }
    }

    let series = if has_datetime && !has_number && !has_text {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::DateTime(dt)) => dt
                    .as_datetime()
                    .map(|naive| naive.and_utc().timestamp_millis()),
                Some(Data::DateTimeIso(text)) => {
                    parse_datetime(text).map(|naive| naive.and_utc().timestamp_millis())
                }
                _ => None,
            })
            .collect();
        Series::new(name.into(), values)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
    } else if has_number && !has_text {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Float(value)) => Some(*value),
                Some(Data::Int(value)) => Some(*value as f64),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values)
    } else {
        let values: Vec<Option<String>> = cells
            .iter()
            .map(|cell| match cell {
                None | Some(Data::Empty) => None,
                Some(Data::String(text)) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        Some(trimmed.to_string())
                    }
                }
                Some(other) => Some(other.to_string()),
            })
            .collect();
        Series::new(name.into(), values)
    };
    Ok(series.into_column())
}
