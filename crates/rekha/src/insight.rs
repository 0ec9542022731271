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

use crate::data::Dataset;
use crate::error::RegenerationError;
use crate::llm::{clean_response, ApiClient};
use crate::notice::Notifications;
use crate::plan::prompts::{insight_user_message, SYSTEM_PROMPT};
use crate::plan::ResolvedChartConfig;
use llm_contracts::{GenerationProfile, Message, ProviderRequest};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

const DEFAULT_SAMPLE_ROWS: usize = 100;

/// Asks the AI service for a fresh insight on one chart. Makes a single attempt.
pub struct InsightRegenerator {
    client: Arc<dyn ApiClient>,
    profile: GenerationProfile,
    sample_rows: usize,
}

impl InsightRegenerator {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self {
            client,
            profile: GenerationProfile::insight_refresh(),
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }

    pub fn with_profile(mut self, profile: GenerationProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = rows.max(1);
        self
    }

    #[instrument(skip(self, config, slice), fields(kind = %config.chart_type, x = %config.x))]
    pub async fn regenerate(
        &self,
        config: &ResolvedChartConfig,
        slice: &Dataset,
    ) -> Result<String, RegenerationError> {
        let sample = slice
            .head(self.sample_rows)
            .to_csv()
            .map_err(|e| RegenerationError::Sample {
                reason: e.to_string(),
            })?;
        let request = ProviderRequest::from_profile(&self.profile)
            .with_message(Message::system(SYSTEM_PROMPT))
            .with_message(Message::user(insight_user_message(config, &sample)));
        let response = self
            .client
            .send_request(request)
            .await
            .map_err(RegenerationError::from_llm)?;
        let insight = parse_insight_response(&response.content)?;
        info!(chars = insight.len(), "insight regenerated");
        Ok(insight)
    }

    /// Returns the new insight, or `previous` with a warning when regeneration fails.
    pub async fn regenerate_or_keep(
        &self,
        chart_number: usize,
        config: &ResolvedChartConfig,
        slice: &Dataset,
        previous: &str,
        notices: &mut Notifications,
    ) -> String {
        match self.regenerate(config, slice).await {
            Ok(insight) => insight,
            Err(err) => {
                notices.warn(format!(
                    "Insight regeneration for Chart {chart_number} failed: {err}. Keeping previous insight."
                ));
                previous.to_string()
            }
        }
    }
}

/// Extracts the `insight` string from a `{"insight": ...}` reply.
pub fn parse_insight_response(content: &str) -> Result<String, RegenerationError> {
    let value: Value = serde_json::from_str(&clean_response(content))?;
    match value.get("insight") {
        Some(Value::String(text)) => Ok(text.clone()),
        _ => Err(RegenerationError::MissingInsight),
    }
}
