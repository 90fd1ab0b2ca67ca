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
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

const SAMPLE_SIZE: usize = 10;
const PARSE_THRESHOLD: f64 = 0.5;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const TEMPORAL_FORMATS: [&str; 12] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%Y%m%d",
];

/// Cheap pre-filter before any parse attempt: separators, clock
/// colons, or a month-name substring.
pub fn looks_datelike(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    if value.contains('-') && value.split('-').count() >= 2 {
        return true;
    }
    if value.contains('/') && value.split('/').count() >= 2 {
        return true;
    }
    let colons = value.matches(':').count();
    if (1..=2).contains(&colons) {
        return true;
    }
    let lower = value.to_lowercase();
    MONTH_NAMES.iter().any(|month| lower.contains(month))
}

pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in TEMPORAL_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Detects string columns that actually hold dates and converts them to
/// a millisecond datetime type, coercing unparseable entries to null.
///
/// A column converts when at least half of a sample of up to ten
/// non-null values parses. Already-typed datetime columns are left
/// untouched, so re-running is a no-op.
pub fn infer_dates(mut df: DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|name| (*name).to_string())
        .collect();
    for name in names {
        if !matches!(df.column(&name)?.dtype(), DataType::String) {
            continue;
        }
        let series = df.column(&name)?.as_materialized_series().clone();
        let chunked = series.str()?;
        let samples: Vec<&str> = chunked.into_iter().flatten().take(SAMPLE_SIZE).collect();
        if samples.is_empty() {
            continue;
        }
        let hits = samples
            .iter()
            .filter(|value| looks_datelike(value) && parse_datetime(value).is_some())
            .count();
        if (hits as f64) / (samples.len() as f64) < PARSE_THRESHOLD {
            continue;
        }
        let millis: Vec<Option<i64>> = chunked
            .into_iter()
            .map(|opt| {
                opt.and_then(parse_datetime)
                    .map(|dt| dt.and_utc().timestamp_millis())
            })
            .collect();
        let converted = Series::new(name.as_str().into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        df.with_column(converted)?;
        debug!("converted column '{name}' to datetime");
    }
    Ok(df)
}
