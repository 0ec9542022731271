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

use async_trait::async_trait;
use llm_contracts::{LLMError, LLMResult, ProviderRequest, ProviderResponse, Usage};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::ApiClient;
use crate::settings::OPENAI_CHAT_ENDPOINT;

/// Chat-completions client. Each call is a single attempt; callers own retries.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl OpenAIClient {
    pub fn new(
        api_key: String,
        endpoint: Option<String>,
        timeout_seconds: Option<u64>,
    ) -> LLMResult<Self> {
        let timeout = Duration::from_secs(timeout_seconds.unwrap_or(30));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LLMError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.unwrap_or_else(|| OPENAI_CHAT_ENDPOINT.to_string()),
            timeout,
        })
    }

    fn build_openai_payload(&self, request: &ProviderRequest) -> Value {
        let mut payload = json!({
            "model": request.model,
            "messages": request.messages.iter().map(|msg| {
                json!({
                    "role": msg.role,
                    "content": msg.content
                })
            }).collect::<Vec<_>>()
        });

        if let Some(max_tokens) = request.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let Some(top_p) = request.top_p {
            payload["top_p"] = json!(top_p);
        }
        if let Some(stop) = &request.stop_sequences {
            payload["stop"] = json!(stop);
        }

        for (key, value) in &request.provider_specific {
            payload[key] = value.clone();
        }

        payload
    }

    fn parse_openai_response(response_data: Value, model: String) -> LLMResult<ProviderResponse> {
        let content = response_data["choices"][0]["message"]["content"]
            .as_str()
            .filter(|text| !text.trim().is_empty())
            .ok_or(LLMError::EmptyResponse)?;

        let usage = response_data.get("usage").map_or_else(Usage::default, |usage_data| Usage {
            prompt_tokens: token_count(&usage_data["prompt_tokens"]),
            completion_tokens: token_count(&usage_data["completion_tokens"]),
            total_tokens: token_count(&usage_data["total_tokens"]),
        });

        let finish_reason = response_data["choices"][0]["finish_reason"]
            .as_str()
            .map(ToString::to_string);

        Ok(ProviderResponse {
            content: content.to_string(),
            model: response_data["model"]
                .as_str()
                .map_or(model, ToString::to_string),
            usage,
            finish_reason,
            raw_response: response_data,
        })
    }

    async fn execute_request(&self, payload: &Value) -> LLMResult<Value> {
        let sent = tokio::time::timeout(
            self.timeout,
            self.client
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(payload)
                .send(),
        )
        .await;

        let response = match sent {
            Err(_) => return Err(LLMError::Timeout),
            Ok(Err(e)) if e.is_timeout() => return Err(LLMError::Timeout),
            Ok(Err(e)) => return Err(LLMError::Network(format!("Request failed: {e}"))),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| LLMError::Serialisation(format!("Failed to parse response: {e}")));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(classify_status(status, body))
    }
}

fn token_count(value: &Value) -> u32 {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn classify_status(status: StatusCode, body: String) -> LLMError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LLMError::Authentication(format!("OpenAI API error {status}: {body}"))
        }
        StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimit,
        _ => LLMError::Provider {
            status: Some(status.as_u16()),
            message: body,
        },
    }
}

#[async_trait]
impl ApiClient for OpenAIClient {
    async fn send_request(&self, request: ProviderRequest) -> LLMResult<ProviderResponse> {
        let payload = self.build_openai_payload(&request);
        debug!(model = %request.model, messages = request.messages.len(), "sending chat completion");
        let response_data = self.execute_request(&payload).await?;
        Self::parse_openai_response(response_data, request.model)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
