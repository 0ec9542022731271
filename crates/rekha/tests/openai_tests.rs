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

use llm_contracts::{GenerationProfile, LLMError, Message, ProviderRequest};
use rekha::{ApiClient, OpenAIClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> ProviderRequest {
    ProviderRequest::from_profile(&GenerationProfile::chart_plans())
        .with_message(Message::system("rules"))
        .with_message(Message::user("sample"))
}

async fn client_for(server: &MockServer) -> OpenAIClient {
    OpenAIClient::new(
        "sk-test".to_string(),
        Some(format!("{}/v1/chat/completions", server.uri())),
        Some(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_completion_content_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"messages": [{"role": "system", "content": "rules"}, {"role": "user", "content": "sample"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-3.5-turbo-0125",
            "choices": [{"message": {"role": "assistant", "content": "[]"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server).await.send_request(request()).await.unwrap();
    assert_eq!(response.content, "[]");
    assert_eq!(response.model, "gpt-3.5-turbo-0125");
    assert_eq!(response.usage.total_tokens, 13);
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_status_codes_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let auth = client.send_request(request()).await.unwrap_err();
    assert!(matches!(auth, LLMError::Authentication(_)));
    assert!(!auth.is_transient());

    let limited = client.send_request(request()).await.unwrap_err();
    assert_eq!(limited, LLMError::RateLimit);

    let unavailable = client.send_request(request()).await.unwrap_err();
    assert_eq!(
        unavailable,
        LLMError::Provider {
            status: Some(503),
            message: "overloaded".to_string()
        }
    );
    assert!(unavailable.is_transient());
}

#[tokio::test]
async fn test_blank_completion_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "   "}}]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).await.send_request(request()).await.unwrap_err();
    assert_eq!(err, LLMError::EmptyResponse);
    assert!(err.is_malformed_payload());
}
