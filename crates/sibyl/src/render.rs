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

//! Renders the `result` table to a PNG, returned base64-encoded.
//! Drawing is done in software on a fixed-size RGB canvas; shape
//! problems (a pie chart over negative values, a heatmap without a
//! matrix) surface as `ChartTypeMismatch` so the caller can fall back
//! to a plain table.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use plan_contracts::{AnalysisError, ChartKind, ChartSpec};
use polars::prelude::*;
use std::io::Cursor;
use tabula::profile::column_kind;
use tabula::ColumnKind;

const WIDTH: u32 = 960;
const HEIGHT: u32 = 600;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([40, 40, 40]);
const GRID: Rgb<u8> = Rgb([220, 220, 220]);
const AXIS: Rgb<u8> = Rgb([110, 110, 110]);

const PALETTE: [Rgb<u8>; 8] = [
    Rgb([68, 114, 196]),
    Rgb([237, 125, 49]),
    Rgb([112, 173, 71]),
    Rgb([255, 192, 0]),
    Rgb([91, 155, 213]),
    Rgb([165, 165, 165]),
    Rgb([158, 72, 14]),
    Rgb([99, 99, 99]),
];

const VIRIDIS: [[u8; 3]; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];

const MAX_CATEGORIES: usize = 40;
const MAX_TABLE_ROWS: usize = 20;
const MAX_TABLE_COLS: usize = 8;
const MAX_PANEL_CHARS: usize = 2000;

/// Plot area shared by the axis-based charts.
struct Frame {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl Frame {
    fn standard() -> Self {
        Self {
            left: 80.0,
            top: 60.0,
            right: f64::from(WIDTH) - 40.0,
            bottom: f64::from(HEIGHT) - 70.0,
        }
    }

    fn width(&self) -> f64 {
        self.right - self.left
    }

    fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

pub fn render(df: &DataFrame, spec: &ChartSpec) -> Result<String, AnalysisError> {
    let image = match spec.kind {
        ChartKind::Bar => draw_bar(df, spec)?,
        ChartKind::Line => draw_line(df, spec)?,
        ChartKind::Hist => draw_hist(df, spec)?,
        ChartKind::Pie => draw_pie(df, spec)?,
        ChartKind::Table => draw_table(df, spec)?,
        ChartKind::Heatmap => draw_heatmap(df, spec)?,
    };
    encode(&image)
}

/// Plain text on the canvas, for answers that have no tabular shape.
pub fn render_message(text: &str) -> Result<String, AnalysisError> {
    let mut image = blank();
    let truncated: String = if text.chars().count() > MAX_PANEL_CHARS {
        let mut cut: String = text.chars().take(MAX_PANEL_CHARS).collect();
        cut.push('…');
        cut
    } else {
        text.to_string()
    };

    let mut y = 40;
    for line in wrap_text(&truncated, 110) {
        if y > HEIGHT as i32 - 30 {
            break;
        }
        draw_text(&mut image, &line, 40, y, 1, INK);
        y += 14;
    }
    encode(&image)
}

fn encode(image: &RgbImage) -> Result<String, AnalysisError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| AnalysisError::ChartTypeMismatch(format!("PNG encoding failed: {e}")))?;
    Ok(STANDARD.encode(buffer.into_inner()))
}

fn blank() -> RgbImage {
    RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND)
}

// ---------------------------------------------------------------------------
// chart drawing

fn draw_bar(df: &DataFrame, spec: &ChartSpec) -> Result<RgbImage, AnalysisError> {
    let (labels, values) = category_series(df, "bar")?;
    let mut image = blank();
    draw_title(&mut image, spec);

    let frame = Frame::standard();
    let (low, high) = value_range(&values, true);
    draw_value_axis(&mut image, &frame, low, high);

    let n = values.len() as f64;
    let slot = frame.width() / n;
    let bar_width = (slot * 0.7).max(1.0);
    for (index, value) in values.iter().enumerate() {
        if !value.is_finite() {
            continue;
        }
        let x = frame.left + slot * index as f64 + (slot - bar_width) / 2.0;
        let y_value = project(*value, low, high, &frame);
        let y_zero = project(0.0_f64.clamp(low, high), low, high, &frame);
        let (top, bottom) = if y_value <= y_zero {
            (y_value, y_zero)
        } else {
            (y_zero, y_value)
        };
        let height = ((bottom - top).round() as u32).max(1);
        draw_filled_rect_mut(
            &mut image,
            Rect::at(x.round() as i32, top.round() as i32)
                .of_size(bar_width.round().max(1.0) as u32, height),
            PALETTE[0],
        );
        draw_category_label(&mut image, &frame, &labels[index], x + bar_width / 2.0, slot);
    }
    draw_axes(&mut image, &frame);
    Ok(image)
}

fn draw_line(df: &DataFrame, spec: &ChartSpec) -> Result<RgbImage, AnalysisError> {
    let (labels, values) = category_series(df, "line")?;
    let mut image = blank();
    draw_title(&mut image, spec);

    let frame = Frame::standard();
    let (low, high) = value_range(&values, false);
    draw_value_axis(&mut image, &frame, low, high);

    let n = values.len();
    let step = if n > 1 {
        frame.width() / (n as f64 - 1.0)
    } else {
        0.0
    };
    let mut previous: Option<(f32, f32)> = None;
    for (index, value) in values.iter().enumerate() {
        if !value.is_finite() {
            previous = None;
            continue;
        }
        let x = frame.left + step * index as f64;
        let y = project(*value, low, high, &frame);
        let point = (x as f32, y as f32);
        if let Some(last) = previous {
            draw_line_segment_mut(&mut image, last, point, PALETTE[0]);
        }
        // small square marker
        draw_filled_rect_mut(
            &mut image,
            Rect::at(x.round() as i32 - 2, y.round() as i32 - 2).of_size(5, 5),
            PALETTE[0],
        );
        draw_category_label(&mut image, &frame, &labels[index], x, step.max(30.0));
        previous = Some(point);
    }
    draw_axes(&mut image, &frame);
    Ok(image)
}

fn draw_hist(df: &DataFrame, spec: &ChartSpec) -> Result<RgbImage, AnalysisError> {
    let column = first_numeric_column(df).ok_or_else(|| {
        AnalysisError::ChartTypeMismatch("hist requires a numeric column".to_string())
    })?;
    let values: Vec<f64> = column_as_f64(column)?
        .into_iter()
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return Err(AnalysisError::ChartTypeMismatch(
            "hist requires at least one numeric value".to_string(),
        ));
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bins = 20.min(values.len()).max(1);
    let span = if max > min { max - min } else { 1.0 };
    let mut counts = vec![0_usize; bins];
    for value in &values {
        let slot = (((value - min) / span) * bins as f64) as usize;
        counts[slot.min(bins - 1)] += 1;
    }

    let mut image = blank();
    draw_title(&mut image, spec);
    let frame = Frame::standard();
    let peak = *counts.iter().max().unwrap_or(&1) as f64;
    draw_value_axis(&mut image, &frame, 0.0, peak.max(1.0));

    let slot_width = frame.width() / bins as f64;
    for (index, count) in counts.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let x = frame.left + slot_width * index as f64;
        let y = project(*count as f64, 0.0, peak.max(1.0), &frame);
        draw_filled_rect_mut(
            &mut image,
            Rect::at(x.round() as i32 + 1, y.round() as i32).of_size(
                (slot_width - 2.0).max(1.0) as u32,
                ((frame.bottom - y).round() as u32).max(1),
            ),
            PALETTE[0],
        );
    }
    // edge labels only; per-bin labels would overlap
    draw_text(
        &mut image,
        &format_number(min),
        frame.left as i32,
        frame.bottom as i32 + 8,
        1,
        INK,
    );
    let max_label = format_number(max);
    draw_text(
        &mut image,
        &max_label,
        frame.right as i32 - (max_label.len() as i32 * 8),
        frame.bottom as i32 + 8,
        1,
        INK,
    );
    draw_axes(&mut image, &frame);
    Ok(image)
}

fn draw_pie(df: &DataFrame, spec: &ChartSpec) -> Result<RgbImage, AnalysisError> {
    let (labels, values) = category_series(df, "pie")?;
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(AnalysisError::ChartTypeMismatch(
            "pie requires non-negative values".to_string(),
        ));
    }
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Err(AnalysisError::ChartTypeMismatch(
            "pie requires a positive total".to_string(),
        ));
    }

    let mut image = blank();
    draw_title(&mut image, spec);

    let mut boundaries = Vec::with_capacity(values.len() + 1);
    let mut running = 0.0;
    boundaries.push(0.0);
    for value in &values {
        running += value / total;
        boundaries.push(running);
    }

    let centre_x = 330.0_f64;
    let centre_y = 330.0_f64;
    let radius = 210.0_f64;
    for py in 0..HEIGHT {
        for px in 0..WIDTH {
            let dx = f64::from(px) - centre_x;
            let dy = f64::from(py) - centre_y;
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            // clockwise from twelve o'clock
            let fraction =
                (dx.atan2(-dy)).rem_euclid(std::f64::consts::TAU) / std::f64::consts::TAU;
            let slice = boundaries
                .windows(2)
                .position(|pair| fraction >= pair[0] && fraction < pair[1])
                .unwrap_or(values.len() - 1);
            image.put_pixel(px, py, PALETTE[slice % PALETTE.len()]);
        }
    }

    let legend_x = 620;
    let mut legend_y = 120;
    for (index, label) in labels.iter().enumerate() {
        if legend_y > HEIGHT as i32 - 30 {
            break;
        }
        draw_filled_rect_mut(
            &mut image,
            Rect::at(legend_x, legend_y).of_size(12, 12),
            PALETTE[index % PALETTE.len()],
        );
        let percent = values[index] / total * 100.0;
        let text = format!("{} ({percent:.1}%)", truncate_label(label, 24));
        draw_text(&mut image, &text, legend_x + 20, legend_y + 2, 1, INK);
        legend_y += 22;
    }
    Ok(image)
}

fn draw_heatmap(df: &DataFrame, spec: &ChartSpec) -> Result<RgbImage, AnalysisError> {
    let columns = df.get_columns();
    if columns.len() < 2 || df.height() == 0 {
        return Err(AnalysisError::ChartTypeMismatch(
            "heatmap requires row labels plus at least one numeric column".to_string(),
        ));
    }
    let row_labels = column_as_strings(&columns[0])?;
    let mut matrix: Vec<Vec<f64>> = Vec::with_capacity(columns.len() - 1);
    let mut column_labels = Vec::with_capacity(columns.len() - 1);
    for column in &columns[1..] {
        column_labels.push(column.name().to_string());
        // non-numeric cells coerce to zero rather than failing the chart
        let values = column_as_f64(column)?
            .into_iter()
            .map(|v| if v.is_finite() { v } else { 0.0 })
            .collect();
        matrix.push(values);
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in matrix.iter().flatten() {
        min = min.min(*value);
        max = max.max(*value);
    }
    let span = if max > min { max - min } else { 1.0 };

    let mut image = blank();
    draw_title(&mut image, spec);

    let frame = Frame {
        left: 140.0,
        top: 80.0,
        right: f64::from(WIDTH) - 120.0,
        bottom: f64::from(HEIGHT) - 60.0,
    };
    let rows = df.height();
    let cols = matrix.len();
    let cell_w = frame.width() / cols as f64;
    let cell_h = frame.height() / rows as f64;

    for (col, values) in matrix.iter().enumerate() {
        for (row, value) in values.iter().enumerate() {
            let colour = viridis((value - min) / span);
            let x = frame.left + cell_w * col as f64;
            let y = frame.top + cell_h * row as f64;
            draw_filled_rect_mut(
                &mut image,
                Rect::at(x.round() as i32, y.round() as i32)
                    .of_size(cell_w.ceil().max(1.0) as u32, cell_h.ceil().max(1.0) as u32),
                colour,
            );
        }
    }

    for (col, label) in column_labels.iter().enumerate() {
        let x = frame.left + cell_w * (col as f64 + 0.5);
        let text = truncate_label(label, (cell_w / 8.0) as usize);
        draw_text(
            &mut image,
            &text,
            (x - text.len() as f64 * 4.0) as i32,
            frame.top as i32 - 14,
            1,
            INK,
        );
    }
    for (row, label) in row_labels.iter().enumerate().take(rows) {
        let y = frame.top + cell_h * (row as f64 + 0.5);
        let text = truncate_label(label, 15);
        draw_text(&mut image, &text, 10, (y - 4.0) as i32, 1, INK);
    }

    // colourbar
    let bar_x = WIDTH as i32 - 90;
    let bar_top = frame.top as i32;
    let bar_height = frame.height() as i32;
    for offset in 0..bar_height {
        let t = 1.0 - f64::from(offset) / f64::from(bar_height);
        let colour = viridis(t);
        draw_filled_rect_mut(
            &mut image,
            Rect::at(bar_x, bar_top + offset).of_size(18, 1),
            colour,
        );
    }
    draw_text(
        &mut image,
        &format_number(max),
        bar_x + 24,
        bar_top,
        1,
        INK,
    );
    draw_text(
        &mut image,
        &format_number(min),
        bar_x + 24,
        bar_top + bar_height - 8,
        1,
        INK,
    );
    if let Some(label) = &spec.colorbar_label {
        let text = truncate_label(label, 12);
        draw_text(&mut image, &text, bar_x - 10, bar_top - 18, 1, INK);
    }
    Ok(image)
}

fn draw_table(df: &DataFrame, spec: &ChartSpec) -> Result<RgbImage, AnalysisError> {
    let records = tabula::sample_records(df, MAX_TABLE_ROWS)
        .map_err(|e| AnalysisError::ChartTypeMismatch(e.to_string()))?;
    let headers: Vec<String> = df
        .get_column_names_str()
        .iter()
        .take(MAX_TABLE_COLS)
        .map(|name| (*name).to_string())
        .collect();
    if headers.is_empty() {
        return Err(AnalysisError::ChartTypeMismatch(
            "table requires at least one column".to_string(),
        ));
    }

    let mut image = blank();
    draw_title(&mut image, spec);

    let left = 20_i32;
    let top = 60_i32;
    let col_width = ((WIDTH as i32 - 40) / headers.len() as i32).max(40);
    let row_height = 24_i32;
    let table_width = col_width * headers.len() as i32;
    let visible_rows = records.len();

    draw_filled_rect_mut(
        &mut image,
        Rect::at(left, top).of_size(table_width as u32, row_height as u32),
        Rgb([230, 236, 245]),
    );
    for (col, header) in headers.iter().enumerate() {
        let text = truncate_label(header, (col_width / 8 - 1) as usize);
        draw_text(
            &mut image,
            &text,
            left + col_width * col as i32 + 6,
            top + 8,
            1,
            INK,
        );
    }

    for (row, record) in records.iter().enumerate() {
        let y = top + row_height * (row as i32 + 1);
        if row % 2 == 1 {
            draw_filled_rect_mut(
                &mut image,
                Rect::at(left, y).of_size(table_width as u32, row_height as u32),
                Rgb([247, 247, 247]),
            );
        }
        for (col, (_, value)) in record.iter().take(MAX_TABLE_COLS).enumerate() {
            let text = truncate_label(&round_cell(value), (col_width / 8 - 1) as usize);
            draw_text(
                &mut image,
                &text,
                left + col_width * col as i32 + 6,
                y + 8,
                1,
                INK,
            );
        }
    }

    let table_height = row_height * (visible_rows as i32 + 1);
    for row in 0..=(visible_rows as i32 + 1) {
        let y = (top + row_height * row) as f32;
        draw_line_segment_mut(
            &mut image,
            (left as f32, y),
            ((left + table_width) as f32, y),
            GRID,
        );
    }
    for col in 0..=headers.len() as i32 {
        let x = (left + col_width * col) as f32;
        draw_line_segment_mut(
            &mut image,
            (x, top as f32),
            (x, (top + table_height) as f32),
            GRID,
        );
    }

    if df.height() > visible_rows {
        let note = format!("... {} more rows", df.height() - visible_rows);
        draw_text(&mut image, &note, left, top + table_height + 10, 1, AXIS);
    }
    Ok(image)
}

// ---------------------------------------------------------------------------
// data extraction

/// Labels from the first non-numeric column (row numbers when there is
/// none) paired with the first numeric column, capped at
/// `MAX_CATEGORIES` entries.
fn category_series(df: &DataFrame, chart: &str) -> Result<(Vec<String>, Vec<f64>), AnalysisError> {
    let numeric = first_numeric_column(df).ok_or_else(|| {
        AnalysisError::ChartTypeMismatch(format!("{chart} requires a numeric column"))
    })?;
    let values = column_as_f64(numeric)?;
    if values.is_empty() {
        return Err(AnalysisError::ChartTypeMismatch(format!(
            "{chart} requires at least one row"
        )));
    }

    let label_column = df
        .get_columns()
        .iter()
        .find(|column| column_kind(column.dtype()) != ColumnKind::Numeric);
    let labels = match label_column {
        Some(column) => column_as_strings(column)?,
        None => (1..=values.len()).map(|i| i.to_string()).collect(),
    };

    let take = values.len().min(MAX_CATEGORIES);
    Ok((
        labels.into_iter().take(take).collect(),
        values.into_iter().take(take).collect(),
    ))
}

fn first_numeric_column(df: &DataFrame) -> Option<&Column> {
    df.get_columns()
        .iter()
        .find(|column| column_kind(column.dtype()) == ColumnKind::Numeric)
}

fn column_as_f64(column: &Column) -> Result<Vec<f64>, AnalysisError> {
    let floats = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| AnalysisError::ChartTypeMismatch(e.to_string()))?;
    let chunked = floats
        .f64()
        .map_err(|e| AnalysisError::ChartTypeMismatch(e.to_string()))?;
    Ok(chunked
        .into_iter()
        .map(|value| value.unwrap_or(f64::NAN))
        .collect())
}

fn column_as_strings(column: &Column) -> Result<Vec<String>, AnalysisError> {
    let strings = column
        .as_materialized_series()
        .cast(&DataType::String)
        .map_err(|e| AnalysisError::ChartTypeMismatch(e.to_string()))?;
    let chunked = strings
        .str()
        .map_err(|e| AnalysisError::ChartTypeMismatch(e.to_string()))?;
    Ok(chunked
        .into_iter()
        .map(|value| value.unwrap_or("").to_string())
        .collect())
}

// ---------------------------------------------------------------------------
// drawing primitives

fn value_range(values: &[f64], include_zero: bool) -> (f64, f64) {
    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for value in values.iter().filter(|v| v.is_finite()) {
        low = low.min(*value);
        high = high.max(*value);
    }
    if !low.is_finite() {
        return (0.0, 1.0);
    }
    if include_zero {
        low = low.min(0.0);
        high = high.max(0.0);
    }
    if (high - low).abs() < f64::EPSILON {
        high = low + 1.0;
    }
    (low, high)
}

fn project(value: f64, low: f64, high: f64, frame: &Frame) -> f64 {
    frame.bottom - (value - low) / (high - low) * frame.height()
}

fn draw_axes(image: &mut RgbImage, frame: &Frame) {
    draw_line_segment_mut(
        image,
        (frame.left as f32, frame.top as f32),
        (frame.left as f32, frame.bottom as f32),
        AXIS,
    );
    draw_line_segment_mut(
        image,
        (frame.left as f32, frame.bottom as f32),
        (frame.right as f32, frame.bottom as f32),
        AXIS,
    );
}

fn draw_value_axis(image: &mut RgbImage, frame: &Frame, low: f64, high: f64) {
    for tick in 0..=4 {
        let value = low + (high - low) * f64::from(tick) / 4.0;
        let y = project(value, low, high, frame);
        draw_line_segment_mut(
            image,
            (frame.left as f32, y as f32),
            (frame.right as f32, y as f32),
            GRID,
        );
        let label = format_number(value);
        draw_text(
            image,
            &label,
            frame.left as i32 - label.len() as i32 * 8 - 6,
            y as i32 - 4,
            1,
            INK,
        );
    }
}

fn draw_category_label(image: &mut RgbImage, frame: &Frame, label: &str, centre_x: f64, slot: f64) {
    let text = truncate_label(label, ((slot / 8.0) as usize).max(3));
    let x = centre_x - text.len() as f64 * 4.0;
    draw_text(image, &text, x as i32, frame.bottom as i32 + 8, 1, INK);
}

fn draw_title(image: &mut RgbImage, spec: &ChartSpec) {
    if let Some(title) = &spec.title {
        let text = truncate_label(title, 56);
        let x = (WIDTH as i32 - text.len() as i32 * 16) / 2;
        draw_text(image, &text, x.max(10), 20, 2, INK);
    }
}

fn viridis(t: f64) -> Rgb<u8> {
    let clamped = t.clamp(0.0, 1.0);
    let position = clamped * (VIRIDIS.len() - 1) as f64;
    let index = (position.floor() as usize).min(VIRIDIS.len() - 2);
    let fraction = position - index as f64;
    let a = VIRIDIS[index];
    let b = VIRIDIS[index + 1];
    let mix = |lo: u8, hi: u8| {
        (f64::from(lo) + (f64::from(hi) - f64::from(lo)) * fraction).round() as u8
    };
    Rgb([mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])])
}

/// Blits an 8x8 bitmap glyph per character at an integer scale.
fn draw_text(image: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, colour: Rgb<u8>) {
    let mut cursor_x = x;
    for ch in text.chars() {
        if let Some(glyph) = BASIC_FONTS.get(ch) {
            for (row, bits) in glyph.iter().enumerate() {
                for bit in 0..8_u32 {
                    if (*bits >> bit) & 1 == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = cursor_x + (bit * scale + dx) as i32;
                            let py = y + (row as u32 * scale + dy) as i32;
                            if px >= 0
                                && py >= 0
                                && (px as u32) < image.width()
                                && (py as u32) < image.height()
                            {
                                image.put_pixel(px as u32, py as u32, colour);
                            }
                        }
                    }
                }
            }
        }
        cursor_x += (8 * scale) as i32;
    }
}

/// Table cells show numbers rounded to three decimals.
fn round_cell(value: &str) -> String {
    match value.parse::<f64>() {
        Ok(number) if value.contains('.') => {
            let rounded = (number * 1000.0).round() / 1000.0;
            format!("{rounded}")
        }
        _ => value.to_string(),
    }
}

fn truncate_label(label: &str, max_chars: usize) -> String {
    let max = max_chars.max(1);
    if label.chars().count() <= max {
        label.to_string()
    } else {
        let mut cut: String = label.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > max_chars
            {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    if value.abs() >= 1000.0 {
        format!("{value:.0}")
    } else if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viridis_hits_anchor_colours() {
        assert_eq!(viridis(0.0), Rgb([68, 1, 84]));
        assert_eq!(viridis(1.0), Rgb([253, 231, 37]));
    }

    #[test]
    fn numbers_format_compactly() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(3.14159), "3.14");
        assert_eq!(format_number(12345.6), "12346");
    }

    #[test]
    fn wrapping_respects_width() {
        let lines = wrap_text("one two three four five", 9);
        assert!(lines.iter().all(|line| line.chars().count() <= 9));
        assert_eq!(lines.join(" "), "one two three four five");
    }
}
