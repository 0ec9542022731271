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

use crate::error::ConfigError;
use crate::llm::retry::RetryPolicy;
use llm_contracts::GenerationProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MIN_CHART_COUNT: usize = 1;
pub const MAX_CHART_COUNT: usize = 10;
pub const DEFAULT_CHART_COUNT: usize = 5;
pub const DEFAULT_CHART_COLOR: &str = "#1f77b4";
pub const OPENAI_CHAT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Application settings, layered as defaults < `rekha.toml` < `REKHA__*` environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub retry: RetrySettings,
    pub charts: ChartSettings,
    pub render: RenderSettings,
    pub feedback: FeedbackSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    /// Rows of the filtered dataset shown to the model.
    pub sample_rows: usize,
    pub plans: GenerationProfile,
    #[serde(default = "GenerationProfile::insight_refresh")]
    pub insights: GenerationProfile,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: OPENAI_CHAT_ENDPOINT.to_string(),
            api_key: None,
            timeout_seconds: 30,
            sample_rows: 100,
            plans: GenerationProfile::chart_plans(),
            insights: GenerationProfile::insight_refresh(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_seconds: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_seconds: 5,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.delay_seconds))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartSettings {
    pub default_count: usize,
    pub default_color: String,
    /// Text columns with fewer distinct values than this get a per-chart filter.
    pub filter_max_cardinality: usize,
    pub global_filter_columns: Vec<String>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            default_count: DEFAULT_CHART_COUNT,
            default_color: DEFAULT_CHART_COLOR.to_string(),
            filter_max_cardinality: 20,
            global_filter_columns: vec![
                "Date".to_string(),
                "Region".to_string(),
                "Category".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub preview_rows: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            preview_rows: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedbackSettings {
    pub path: PathBuf,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("feedback.csv"),
        }
    }
}

impl AppConfig {
    /// Loads settings from an optional file plus `REKHA__SECTION__KEY` variables.
    ///
    /// The API key is read from `OPENAI_API_KEY` (a `.env` file is honoured)
    /// when the layered sources do not set `llm.api_key`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut builder = ::config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(::config::File::from(path).required(true)),
            None => builder.add_source(::config::File::with_name("rekha").required(false)),
        };
        builder = builder.add_source(
            ::config::Environment::with_prefix("REKHA")
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: AppConfig = builder.build()?.try_deserialize()?;
        if settings.llm.api_key.is_none() {
            settings.llm.api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty());
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: String| ConfigError::InvalidValue {
            field: field.to_string(),
            reason,
        };
        self.llm
            .plans
            .validate()
            .map_err(|reason| invalid("llm.plans", reason))?;
        self.llm
            .insights
            .validate()
            .map_err(|reason| invalid("llm.insights", reason))?;
        if self.llm.endpoint.trim().is_empty() {
            return Err(invalid("llm.endpoint", "must not be empty".to_string()));
        }
        if self.llm.timeout_seconds == 0 {
            return Err(invalid("llm.timeout_seconds", "must be positive".to_string()));
        }
        if self.llm.sample_rows == 0 {
            return Err(invalid("llm.sample_rows", "must be positive".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1".to_string()));
        }
        check_chart_count(self.charts.default_count)?;
        crate::plan::Rgb::parse_hex(&self.charts.default_color)?;
        if self.charts.filter_max_cardinality < 2 {
            return Err(invalid(
                "charts.filter_max_cardinality",
                "must be at least 2".to_string(),
            ));
        }
        if self.render.width < 200 || self.render.height < 150 {
            return Err(invalid(
                "render",
                format!(
                    "{}x{} is too small to draw a chart",
                    self.render.width, self.render.height
                ),
            ));
        }
        Ok(())
    }

    /// The plan and insight calls both need a key; loading and previewing do not.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.llm
            .api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "OPENAI_API_KEY".to_string(),
            })
    }
}

pub fn check_chart_count(value: usize) -> Result<usize, ConfigError> {
    if (MIN_CHART_COUNT..=MAX_CHART_COUNT).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::ChartCount {
            value,
            min: MIN_CHART_COUNT,
            max: MAX_CHART_COUNT,
        })
    }
}
