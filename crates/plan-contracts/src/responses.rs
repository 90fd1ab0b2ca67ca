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

use crate::plan::ChartKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Final immutable output of one pipeline run. Constructed and returned
/// per request; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub question: String,
    pub intent: String,
    pub reasoning: String,
    pub chart: ChartKind,
    pub chart_png_base64: String,
    pub preview_rows: usize,
    pub preview_cols: usize,
    #[serde(default)]
    pub used_columns: Option<Vec<String>>,
    pub transformation_code: String,
    #[serde(default)]
    pub answer_hint: Option<String>,
    pub generated_at: DateTime<Utc>,
}
