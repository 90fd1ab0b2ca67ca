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

use polars::prelude::*;
use tabula::{pick_example_columns, profile, sample_records};

fn sales() -> DataFrame {
    df!(
        "region" => ["north", "south", "north"],
        "revenue" => [100.5, 40.0, 60.25],
    )
    .unwrap()
}

#[test]
fn profile_lists_shape_and_exact_names() {
    let text = profile(&sales()).unwrap();
    assert!(text.contains("Shape: 3 rows x 2 columns"));
    assert!(text.contains("use these exact names"));
    assert!(text.contains("\"region\""));
    assert!(text.contains("\"revenue\""));
    assert!(text.contains("Numeric columns"));
    assert!(text.contains("Categorical columns"));
}

#[test]
fn profile_details_carry_ranges_and_cardinality() {
    let text = profile(&sales()).unwrap();
    assert!(text.contains("revenue(numeric: 40.00 to 100.50)"));
    assert!(text.contains("region(categorical: 2 unique)"));
    assert!(text.contains("Sample data (first 3 rows)"));
}

#[test]
fn profile_omits_kind_lists_the_dataset_lacks() {
    let df = df!("note" => ["a", "b"]).unwrap();
    let text = profile(&df).unwrap();
    assert!(!text.contains("Numeric columns"));
    assert!(!text.contains("Date columns"));
}

#[test]
fn example_columns_pick_first_of_each_kind() {
    let (categorical, numeric) = pick_example_columns(&sales());
    assert_eq!(categorical, "region");
    assert_eq!(numeric, "revenue");

    let numbers_only = df!("x" => [1, 2]).unwrap();
    let (categorical, numeric) = pick_example_columns(&numbers_only);
    assert!(categorical.is_empty());
    assert_eq!(numeric, "x");
}

#[test]
fn sample_records_render_nulls_as_empty_strings() {
    let df = df!(
        "a" => [Some("x"), None],
        "b" => [Some(1), Some(2)],
    )
    .unwrap();
    let records = sample_records(&df, 5).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1][0], ("a".to_string(), String::new()));
    assert_eq!(records[1][1], ("b".to_string(), "2".to_string()));
}
