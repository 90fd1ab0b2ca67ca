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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Unreadable file: {0}")]
    UnreadableFile(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invalid model response: {0}")]
    ModelResponseInvalid(String),

    #[error("Syntax error in generated code: {0}")]
    SyntaxError(String),

    #[error("Unsafe generated code: {category}")]
    UnsafeCode { category: String },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Chart type mismatch: {0}")]
    ChartTypeMismatch(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl AnalysisError {
    /// The classified, user-safe message. The `Display` form may carry
    /// internal diagnostics and belongs in logs only.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnreadableFile(detail) => format!("Error reading file: {detail}"),
            Self::ModelUnavailable(_) => {
                "The analysis model is unavailable or not configured.".to_string()
            }
            Self::ModelResponseInvalid(_) => {
                "The model returned a response that could not be parsed into a plan.".to_string()
            }
            Self::SyntaxError(detail) => format!("Generated code failed to parse: {detail}"),
            Self::UnsafeCode { category } => {
                format!("Generated code uses prohibited operations: {category}")
            }
            Self::ExecutionFailed(detail) => format!("Analysis failed: {detail}"),
            Self::ChartTypeMismatch(detail) => format!("Chart rendering failed: {detail}"),
        }
    }

    /// Chart rendering is best effort; everything else aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ChartTypeMismatch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_chart_mismatch_is_recoverable() {
        assert!(!AnalysisError::ChartTypeMismatch("pie needs positives".into()).is_fatal());
        assert!(AnalysisError::ExecutionFailed("engine".into()).is_fatal());
        assert!(AnalysisError::ModelUnavailable("down".into()).is_fatal());
        assert!(AnalysisError::UnsafeCode {
            category: "disallowed statement 'DROP'".into()
        }
        .is_fatal());
    }
}
