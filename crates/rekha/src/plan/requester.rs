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

use crate::data::{Dataset, COUNT_COLUMN};
use crate::error::PlanError;
use crate::llm::{clean_response, ApiClient, RetryPolicy};
use crate::notice::Notifications;
use crate::plan::prompts::{batch_user_message, SYSTEM_PROMPT};
use crate::plan::{PlanBatch, PlanSource, RawChartPlan, FALLBACK_INSIGHT};
use llm_contracts::{GenerationProfile, Message, ProviderRequest};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

const DEFAULT_SAMPLE_ROWS: usize = 100;

/// Asks the AI service for chart plans, degrading to fallback plans on failure.
pub struct PlanRequester {
    client: Arc<dyn ApiClient>,
    profile: GenerationProfile,
    retry: RetryPolicy,
    sample_rows: usize,
}

impl PlanRequester {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self {
            client,
            profile: GenerationProfile::chart_plans(),
            retry: RetryPolicy::default(),
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }

    pub fn with_profile(mut self, profile: GenerationProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = rows.max(1);
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// CSV of the first rows of `dataset`, as shown to the model.
    pub fn sample_csv(&self, dataset: &Dataset) -> Result<String, PlanError> {
        dataset
            .head(self.sample_rows)
            .to_csv()
            .map_err(|e| PlanError::Sample {
                reason: e.to_string(),
            })
    }

    /// Samples `dataset` and requests plans; a sampling failure falls back immediately.
    pub async fn request_for(
        &self,
        dataset: &Dataset,
        chart_count: usize,
        notices: &mut Notifications,
    ) -> PlanBatch {
        match self.sample_csv(dataset) {
            Ok(sample) => self.request(dataset, &sample, chart_count, notices).await,
            Err(err) => {
                notices.error(format!("{err}. Using default charts."));
                PlanBatch::new(fallback_plans(dataset, chart_count), PlanSource::Fallback)
            }
        }
    }

    /// Never fails: every outcome is either the model's plans or `chart_count` fallback plans.
    #[instrument(skip(self, dataset, sample_csv, notices), fields(provider = self.client.provider_name()))]
    pub async fn request(
        &self,
        dataset: &Dataset,
        sample_csv: &str,
        chart_count: usize,
        notices: &mut Notifications,
    ) -> PlanBatch {
        let request = ProviderRequest::from_profile(&self.profile)
            .with_message(Message::system(SYSTEM_PROMPT))
            .with_message(Message::user(batch_user_message(sample_csv, chart_count)));
        let max_attempts = self.retry.max_attempts();
        let delay = self.retry.delay();

        let outcome = self
            .retry
            .run(
                |_| self.attempt(request.clone()),
                PlanError::is_retryable,
                |attempt, err, will_retry| {
                    let mut message = format!(
                        "Attempt {attempt}/{max_attempts} failed ({}): {err}.",
                        error_kind(err)
                    );
                    if will_retry {
                        message.push_str(&format!(" Retrying in {}s...", delay.as_secs()));
                    }
                    notices.warn(message);
                },
            )
            .await;

        match outcome {
            Ok(plans) => {
                info!(requested = chart_count, received = plans.len(), "chart plans received");
                PlanBatch::new(plans, PlanSource::Ai)
            }
            Err(failure) => {
                notices.error(format!(
                    "Failed to generate chart recommendations after {} attempt(s): {}. Using default charts.",
                    failure.attempts, failure.error
                ));
                PlanBatch::new(fallback_plans(dataset, chart_count), PlanSource::Fallback)
            }
        }
    }

    async fn attempt(&self, request: ProviderRequest) -> Result<Vec<RawChartPlan>, PlanError> {
        let response = self
            .client
            .send_request(request)
            .await
            .map_err(PlanError::from_llm)?;
        parse_plan_response(&response.content)
    }
}

fn error_kind(err: &PlanError) -> &'static str {
    match err {
        PlanError::Parse { .. } => "PlanParseError",
        PlanError::Transport(_) => "TransportError",
        PlanError::Provider(_) => "ProviderError",
        PlanError::Sample { .. } => "SampleError",
    }
}

/// Parses a model reply into plans. The list is accepted at whatever length it has.
///
/// A bare JSON array is expected; an object wrapping exactly one array is unwrapped.
pub fn parse_plan_response(content: &str) -> Result<Vec<RawChartPlan>, PlanError> {
    let cleaned = clean_response(content);
    let value: Value = serde_json::from_str(&cleaned).map_err(|e| PlanError::Parse {
        reason: e.to_string(),
    })?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            let mut arrays = map.into_iter().filter_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            });
            match (arrays.next(), arrays.next()) {
                (Some(items), None) => items,
                _ => {
                    return Err(PlanError::Parse {
                        reason: "expected a JSON list of chart plans".to_string(),
                    })
                }
            }
        }
        _ => {
            return Err(PlanError::Parse {
                reason: "expected a JSON list of chart plans".to_string(),
            })
        }
    };
    Ok(items.iter().map(RawChartPlan::from_value).collect())
}

/// `chart_count` copies of a bar chart of the first column against the count column.
pub fn fallback_plans(dataset: &Dataset, chart_count: usize) -> Vec<RawChartPlan> {
    let plan = RawChartPlan {
        chart_type: Some("Bar".to_string()),
        x: dataset.first_column().map(str::to_string),
        y: Some(dataset.count_column().unwrap_or(COUNT_COLUMN).to_string()),
        insight: Some(FALLBACK_INSIGHT.to_string()),
    };
    vec![plan; chart_count]
}
