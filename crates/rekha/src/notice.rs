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

//! User-facing notices collected while a session works.
//!
//! Every recoverable failure (a retried AI call, a skipped chart, a chart that
//! fell back to a bar count) lands here as well as in the tracing log, so the
//! presentation layer can show what happened without parsing logs.

use crate::error::{ErrorSeverity, RekhaError};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: ErrorSeverity,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity.as_str(), self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Notifications {
    notices: Vec<Notice>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.push(ErrorSeverity::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.push(ErrorSeverity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.push(ErrorSeverity::Error, message);
    }

    /// Records an error with its own severity and user-facing wording.
    pub fn report(&mut self, err: &RekhaError) {
        let severity = err.severity();
        let message = err.user_message();
        match severity {
            ErrorSeverity::Info => tracing::info!(category = err.category(), "{message}"),
            ErrorSeverity::Warning => tracing::warn!(category = err.category(), "{message}"),
            ErrorSeverity::Error | ErrorSeverity::Critical => {
                tracing::error!(category = err.category(), "{message}");
            }
        }
        self.push(severity, message);
    }

    fn push(&mut self, severity: ErrorSeverity, message: String) {
        self.notices.push(Notice { severity, message });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn count(&self, severity: ErrorSeverity) -> usize {
        self.notices.iter().filter(|n| n.severity == severity).count()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn extend(&mut self, other: Notifications) {
        self.notices.extend(other.notices);
    }
}
