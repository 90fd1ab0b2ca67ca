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
use uuid::Uuid;

/// A fully assembled request for the code-generating model: fixed rule
/// block in `system_prompt`, dataset profile and question in `prompt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub id: Uuid,
    pub system_prompt: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl PlanRequest {
    pub fn new(system_prompt: String, prompt: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            system_prompt,
            prompt,
            temperature: 0.0,
            max_tokens: None,
        }
    }
}
