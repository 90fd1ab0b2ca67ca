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

use plan_contracts::{AnalysisError, PlanRequest};
use serde_json::json;
use sibyl::{HttpModelClient, ModelClient, ModelSettings};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(api_base: String) -> ModelSettings {
    ModelSettings {
        api_key: "test-key".to_string(),
        api_base,
        model: "test-model".to_string(),
        timeout_seconds: 5,
        max_retries: 1,
    }
}

#[tokio::test]
async fn posts_chat_completions_and_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "test-model" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "content": "{\"intent\":\"x\"}" } } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpModelClient::new(settings(server.uri())).unwrap();
    let request = PlanRequest::new("rules".to_string(), "question".to_string());
    let content = client.complete(&request).await.unwrap();
    assert_eq!(content, "{\"intent\":\"x\"}");
}

#[tokio::test]
async fn server_errors_surface_as_model_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = HttpModelClient::new(settings(server.uri())).unwrap();
    let request = PlanRequest::new("rules".to_string(), "question".to_string());
    let err = client.complete(&request).await.unwrap_err();
    assert!(matches!(err, AnalysisError::ModelUnavailable(_)));
}

#[tokio::test]
async fn slow_responses_time_out_as_model_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_secs(5))
                .set_body_json(json!({
                    "choices": [ { "message": { "content": "too late" } } ]
                })),
        )
        .mount(&server)
        .await;

    let mut slow = settings(server.uri());
    slow.timeout_seconds = 1;
    let client = HttpModelClient::new(slow).unwrap();
    let request = PlanRequest::new("rules".to_string(), "question".to_string());
    let err = client.complete(&request).await.unwrap_err();
    match err {
        AnalysisError::ModelUnavailable(detail) => {
            assert!(
                detail.to_lowercase().contains("timed out"),
                "no timeout mention in: {detail}"
            );
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn contentless_responses_are_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = HttpModelClient::new(settings(server.uri())).unwrap();
    let request = PlanRequest::new("rules".to_string(), "question".to_string());
    let err = client.complete(&request).await.unwrap_err();
    assert!(matches!(err, AnalysisError::ModelResponseInvalid(_)));
}
