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
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LLMError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error (status {status:?}): {message}")]
    Provider { status: Option<u16>, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialisation error: {0}")]
    Serialisation(String),

    #[error("Provider returned an empty completion")]
    EmptyResponse,

    #[error("Timeout error")]
    Timeout,
}

pub type LLMResult<T> = Result<T, LLMError>;

impl LLMError {
    /// Failures where repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LLMError::Network(_) | LLMError::Timeout | LLMError::RateLimit => true,
            LLMError::Provider { status, .. } => status.is_some_and(|code| code >= 500),
            LLMError::Configuration(_)
            | LLMError::Authentication(_)
            | LLMError::Serialisation(_)
            | LLMError::EmptyResponse => false,
        }
    }

    /// The provider answered but the payload could not be used.
    pub fn is_malformed_payload(&self) -> bool {
        matches!(self, LLMError::Serialisation(_) | LLMError::EmptyResponse)
    }
}
