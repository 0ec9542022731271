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

pub mod openai;
pub mod response;
pub mod retry;

use async_trait::async_trait;
use llm_contracts::{LLMResult, ProviderRequest, ProviderResponse};
use std::sync::Arc;

#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn send_request(&self, request: ProviderRequest) -> LLMResult<ProviderResponse>;

    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl<T: ApiClient + ?Sized> ApiClient for Arc<T> {
    async fn send_request(&self, request: ProviderRequest) -> LLMResult<ProviderResponse> {
        (**self).send_request(request).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}

pub use openai::OpenAIClient;
pub use response::clean_response;
pub use retry::{RetryError, RetryPolicy};
