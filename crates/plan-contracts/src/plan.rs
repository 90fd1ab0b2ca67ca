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

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Hist,
    Pie,
    Table,
    Heatmap,
}

impl Default for ChartKind {
    fn default() -> Self {
        Self::Bar
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Hist => "hist",
            Self::Pie => "pie",
            Self::Table => "table",
            Self::Heatmap => "heatmap",
        };
        write!(f, "{name}")
    }
}

/// Structured output of the code-generating model. Produced once per
/// question and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub intent: String,
    pub reasoning: String,
    #[serde(default)]
    pub chart: ChartKind,
    pub transformation_code: String,
    #[serde(default)]
    pub answer_hint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub colorbar_label: Option<String>,
}

impl ChartSpec {
    pub fn for_kind(kind: ChartKind) -> Self {
        Self {
            kind,
            title: None,
            colorbar_label: None,
        }
    }
}
