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

use crate::error::FeedbackError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Chart Count")]
    pub chart_count: usize,
    #[serde(rename = "Feedback")]
    pub feedback: String,
}

impl FeedbackRecord {
    /// Stamps a record with the current local time. The email is required.
    pub fn new(email: &str, chart_count: usize, feedback: Option<&str>) -> Result<Self, FeedbackError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(FeedbackError::MissingEmail);
        }
        Ok(Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            email: email.to_string(),
            chart_count,
            feedback: feedback.unwrap_or_default().trim().to_string(),
        })
    }
}

/// Destination for feedback records.
pub trait FeedbackSink: Send + Sync {
    fn append(&self, record: &FeedbackRecord) -> Result<(), FeedbackError>;
}

/// Appends records to a CSV file, writing the header when the file is new or empty.
#[derive(Debug)]
pub struct CsvFeedbackStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvFeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        reader
            .deserialize()
            .map(|row| row.map_err(FeedbackError::from))
            .collect()
    }
}

impl FeedbackSink for CsvFeedbackStore {
    fn append(&self, record: &FeedbackRecord) -> Result<(), FeedbackError> {
        let _guard = self.lock.lock().map_err(|_| FeedbackError::LockPoisoned)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        info!(path = %self.path.display(), "feedback recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_required() {
        assert!(matches!(
            FeedbackRecord::new("  ", 3, Some("nice")),
            Err(FeedbackError::MissingEmail)
        ));
        let record = FeedbackRecord::new("a@b.c", 3, None).unwrap();
        assert_eq!(record.feedback, "");
        assert_eq!(record.timestamp.len(), 19);
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvFeedbackStore::new(dir.path().join("feedback.csv"));
        store.append(&FeedbackRecord::new("a@b.c", 2, Some("ok")).unwrap()).unwrap();
        store.append(&FeedbackRecord::new("d@e.f", 5, None).unwrap()).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.matches("Timestamp,Email,Chart Count,Feedback").count(), 1);
        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].chart_count, 5);
    }
}
