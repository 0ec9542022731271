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

use rekha::feedback::TIMESTAMP_FORMAT;
use rekha::{CsvFeedbackStore, FeedbackError, FeedbackRecord, FeedbackSink};
use std::sync::Arc;
use std::thread;

#[test]
fn test_email_is_required() {
    let err = FeedbackRecord::new("   ", 3, Some("nice")).unwrap_err();
    assert!(matches!(err, FeedbackError::MissingEmail));
}

#[test]
fn test_record_fields() {
    let record = FeedbackRecord::new(" ana@example.com ", 4, None).unwrap();
    assert_eq!(record.email, "ana@example.com");
    assert_eq!(record.chart_count, 4);
    assert_eq!(record.feedback, "");
    assert!(chrono::NaiveDateTime::parse_from_str(&record.timestamp, TIMESTAMP_FORMAT).is_ok());
}

#[test]
fn test_header_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvFeedbackStore::new(dir.path().join("feedback.csv"));
    store
        .append(&FeedbackRecord::new("a@example.com", 2, Some("Charts, \"great\"")).unwrap())
        .unwrap();
    store
        .append(&FeedbackRecord::new("b@example.com", 5, Some("More pies")).unwrap())
        .unwrap();

    let text = std::fs::read_to_string(store.path()).unwrap();
    assert!(text.starts_with("Timestamp,Email,Chart Count,Feedback\n"));
    assert_eq!(text.matches("Timestamp,Email").count(), 1);

    let records = store.read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].feedback, "Charts, \"great\"");
    assert_eq!(records[1].chart_count, 5);
}

#[test]
fn test_concurrent_appends_are_not_interleaved() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CsvFeedbackStore::new(dir.path().join("feedback.csv")));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for j in 0..10 {
                    let email = format!("user{i}@example.com");
                    let note = format!("note {i}-{j} with a longer body to widen each write");
                    store
                        .append(&FeedbackRecord::new(&email, 3, Some(&note)).unwrap())
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let records = store.read_all().unwrap();
    assert_eq!(records.len(), 80);
    assert!(records.iter().all(|r| r.chart_count == 3 && r.email.starts_with("user")));
}

#[test]
fn test_missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvFeedbackStore::new(dir.path().join("absent.csv"));
    assert!(store.read_all().unwrap().is_empty());
}
