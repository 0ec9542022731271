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

mod common;

use common::ScriptedClient;
use llm_contracts::LLMError;
use rekha::error::ErrorSeverity;
use rekha::{
    DataFormat, Dataset, DatasetNormalizer, InsightRegenerator, Notifications, PlanValidator,
    RawChartPlan, RegenerationError, ResolvedChartConfig,
};
use std::sync::Arc;

fn setup() -> (Dataset, ResolvedChartConfig) {
    let ds = DatasetNormalizer::new()
        .load(common::SALES_CSV.as_bytes(), DataFormat::Csv)
        .unwrap();
    let config = PlanValidator::new(&ds).resolve(&RawChartPlan {
        chart_type: Some("Bar".into()),
        x: Some("Category".into()),
        y: Some("Sales".into()),
        insight: None,
    });
    (ds, config)
}

#[tokio::test]
async fn test_regenerated_insight_is_returned() {
    let client = Arc::new(
        ScriptedClient::new().reply("{\"insight\": \"- **Key Observation:** Tech sells most.\"}"),
    );
    let (ds, config) = setup();
    let insight = InsightRegenerator::new(client.clone())
        .regenerate(&config, &ds)
        .await
        .unwrap();
    assert_eq!(insight, "- **Key Observation:** Tech sells most.");

    let prompt = client.last_user_message().unwrap();
    assert!(prompt.contains("x=Category, y=Sales, type=Bar"));
    assert!(prompt.contains("Tech,2024-01-02,200"));
}

#[tokio::test]
async fn test_sample_comes_from_the_filtered_slice() {
    let client = Arc::new(ScriptedClient::new().reply("{\"insight\": \"- ok\"}"));
    let (ds, mut config) = setup();
    config.filters.select("Category", ["Office"]);
    let slice = config.filters.apply(&ds);
    InsightRegenerator::new(client.clone())
        .regenerate(&config, &slice)
        .await
        .unwrap();
    let prompt = client.last_user_message().unwrap();
    assert!(prompt.contains("Office,2024-01-03,30"));
    assert!(!prompt.contains("Furniture"));
}

#[tokio::test]
async fn test_failure_keeps_previous_insight_after_one_attempt() {
    let client = Arc::new(
        ScriptedClient::new()
            .fail(LLMError::Timeout)
            .reply("{\"insight\": \"- never requested\"}"),
    );
    let (ds, config) = setup();
    let mut notices = Notifications::new();
    let insight = InsightRegenerator::new(client.clone())
        .regenerate_or_keep(2, &config, &ds, "- previous", &mut notices)
        .await;

    assert_eq!(insight, "- previous");
    assert_eq!(client.calls(), 1);
    assert_eq!(notices.count(ErrorSeverity::Warning), 1);
    let message = &notices.iter().next().unwrap().message;
    assert!(message.starts_with("Insight regeneration for Chart 2 failed"));
    assert!(message.ends_with("Keeping previous insight."));
}

#[tokio::test]
async fn test_reply_without_insight_key_is_rejected() {
    let client = Arc::new(ScriptedClient::new().reply("[\"- a\", \"- b\"]"));
    let (ds, config) = setup();
    let err = InsightRegenerator::new(client)
        .regenerate(&config, &ds)
        .await
        .unwrap_err();
    assert!(matches!(err, RegenerationError::MissingInsight));
}
