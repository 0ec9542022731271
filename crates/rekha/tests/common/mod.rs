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

#![allow(dead_code)]

use async_trait::async_trait;
use llm_contracts::{LLMError, LLMResult, ProviderRequest, ProviderResponse};
use rekha::ApiClient;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SALES_CSV: &str = "Category,Date,Sales\n\
Furniture,2024-01-01,100\n\
Office,2024-01-01,50\n\
Tech,2024-01-02,200\n\
Furniture,2024-01-02,80\n\
Office,2024-01-03,30\n\
Tech,2024-01-03,120\n";

/// Replays queued replies in order; an exhausted queue answers with a provider error.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<LLMResult<ProviderResponse>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, content: &str) -> Self {
        self.push(Ok(ProviderResponse::text(content, "scripted")))
    }

    pub fn fail(self, error: LLMError) -> Self {
        self.push(Err(error))
    }

    fn push(self, reply: LLMResult<ProviderResponse>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_user_message(&self) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|request| request.last_user_message().map(str::to_string))
    }
}

#[async_trait]
impl ApiClient for ScriptedClient {
    async fn send_request(&self, request: ProviderRequest) -> LLMResult<ProviderResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LLMError::Provider {
                    status: Some(400),
                    message: "no scripted reply left".to_string(),
                })
            })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn plan_reply(plans: &[(&str, &str, Option<&str>, &str)]) -> String {
    let items: Vec<serde_json::Value> = plans
        .iter()
        .map(|(kind, x, y, insight)| {
            serde_json::json!({"chart_type": kind, "x": x, "y": y, "insight": insight})
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}
