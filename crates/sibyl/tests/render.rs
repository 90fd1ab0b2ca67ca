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

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use plan_contracts::{AnalysisError, ChartKind, ChartSpec};
use polars::prelude::*;
use sibyl::render;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn decode(encoded: &str) -> Vec<u8> {
    STANDARD.decode(encoded).expect("valid base64")
}

fn sales() -> DataFrame {
    df!(
        "region" => ["north", "south", "west"],
        "revenue" => [100.0, 40.0, 60.0],
    )
    .unwrap()
}

#[test]
fn bar_line_hist_and_table_produce_png() {
    let df = sales();
    for kind in [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Hist,
        ChartKind::Table,
    ] {
        let spec = ChartSpec {
            kind,
            title: Some("Revenue by region".to_string()),
            colorbar_label: None,
        };
        let png = decode(&render(&df, &spec).unwrap());
        assert_eq!(&png[..8], &PNG_MAGIC, "{kind} did not produce a PNG");
    }
}

#[test]
fn pie_renders_positive_shares() {
    let png = decode(&render(&sales(), &ChartSpec::for_kind(ChartKind::Pie)).unwrap());
    assert_eq!(&png[..8], &PNG_MAGIC);
}

#[test]
fn pie_rejects_negative_values() {
    let df = df!(
        "region" => ["north", "south"],
        "delta" => [5.0, -3.0],
    )
    .unwrap();
    let err = render(&df, &ChartSpec::for_kind(ChartKind::Pie)).unwrap_err();
    assert!(matches!(err, AnalysisError::ChartTypeMismatch(_)));
}

#[test]
fn bar_requires_a_numeric_column() {
    let df = df!("note" => ["a", "b"]).unwrap();
    let err = render(&df, &ChartSpec::for_kind(ChartKind::Bar)).unwrap_err();
    assert!(matches!(err, AnalysisError::ChartTypeMismatch(_)));
}

#[test]
fn heatmap_renders_a_numeric_matrix() {
    let df = df!(
        "month" => ["jan", "feb", "mar"],
        "north" => [1.0, 2.0, 3.0],
        "south" => [4.0, 5.0, 6.0],
    )
    .unwrap();
    let spec = ChartSpec {
        kind: ChartKind::Heatmap,
        title: None,
        colorbar_label: Some("revenue".to_string()),
    };
    let png = decode(&render(&df, &spec).unwrap());
    assert_eq!(&png[..8], &PNG_MAGIC);
}

#[test]
fn heatmap_coerces_text_cells_to_zero() {
    let df = df!(
        "month" => ["jan", "feb"],
        "north" => ["high", "7"],
    )
    .unwrap();
    let png = decode(&render(&df, &ChartSpec::for_kind(ChartKind::Heatmap)).unwrap());
    assert_eq!(&png[..8], &PNG_MAGIC);
}

#[test]
fn heatmap_rejects_non_tabular_values() {
    let df = df!("only" => [1.0, 2.0]).unwrap();
    let err = render(&df, &ChartSpec::for_kind(ChartKind::Heatmap)).unwrap_err();
    assert!(matches!(err, AnalysisError::ChartTypeMismatch(_)));
}

#[test]
fn message_panel_truncates_long_text() {
    let text = "word ".repeat(2000);
    let png = decode(&render::render_message(&text).unwrap());
    assert_eq!(&png[..8], &PNG_MAGIC);
}
