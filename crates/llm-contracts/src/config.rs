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

/// Model and sampling settings for one kind of completion call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationProfile {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    1500
}

impl Default for GenerationProfile {
    fn default() -> Self {
        Self::chart_plans()
    }
}

impl GenerationProfile {
    /// Batch chart recommendation call.
    pub fn chart_plans() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Single-chart insight refresh; lower temperature and a shorter budget.
    pub fn insight_refresh() -> Self {
        Self {
            model: default_model(),
            temperature: 0.3,
            max_tokens: 600,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model name must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than zero".to_string());
        }
        Ok(())
    }
}
