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
use once_cell::sync::OnceCell;
use plan_contracts::{AnalysisError, PlanRequest};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Seam for the code-generating model so the pipeline can be exercised
/// with a scripted stand-in.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: &PlanRequest) -> Result<String, AnalysisError>;
}

/// Connection settings for an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl ModelSettings {
    /// Reads `SIBYL_API_KEY` (required), `SIBYL_API_BASE` and
    /// `SIBYL_MODEL` from the environment.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let api_key = std::env::var("SIBYL_API_KEY").map_err(|_| {
            AnalysisError::ModelUnavailable("SIBYL_API_KEY is not set".to_string())
        })?;
        let api_base = std::env::var("SIBYL_API_BASE")
            .unwrap_or_else(|_| "https://api.deepseek.com".to_string());
        let model =
            std::env::var("SIBYL_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string());
        Ok(Self {
            api_key,
            api_base,
            model,
            timeout_seconds: 90,
            max_retries: 3,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpModelClient {
    client: Client,
    settings: ModelSettings,
    endpoint: String,
    timeout: Duration,
}

impl HttpModelClient {
    pub fn new(settings: ModelSettings) -> Result<Self, AnalysisError> {
        let timeout = Duration::from_secs(settings.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::ModelUnavailable(e.to_string()))?;
        let endpoint = format!("{}/chat/completions", settings.api_base.trim_end_matches('/'));
        Ok(Self {
            client,
            settings,
            endpoint,
            timeout,
        })
    }

    fn build_payload(&self, request: &PlanRequest) -> Value {
        let mut payload = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.prompt }
            ],
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }
        payload
    }

    async fn execute_with_retry(&self, payload: Value) -> Result<Value, AnalysisError> {
        let mut last_error = None;

        for attempt in 0..self.settings.max_retries {
            match tokio::time::timeout(
                self.timeout,
                self.client
                    .post(&self.endpoint)
                    .header("Authorization", format!("Bearer {}", self.settings.api_key))
                    .header("Content-Type", "application/json")
                    .json(&payload)
                    .send(),
            )
            .await
            {
                Ok(Ok(response)) => match response.status() {
                    status if status.is_success() => {
                        return response.json().await.map_err(|e| {
                            AnalysisError::ModelResponseInvalid(format!(
                                "Failed to parse response body: {e}"
                            ))
                        });
                    }
                    status => {
                        let body = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        last_error = Some(AnalysisError::ModelUnavailable(format!(
                            "API error {status}: {body}"
                        )));

                        if status.is_client_error() && status != 429 {
                            break;
                        }
                    }
                },
                Ok(Err(e)) => {
                    last_error =
                        Some(AnalysisError::ModelUnavailable(format!("Request failed: {e}")));
                }
                Err(_) => {
                    last_error = Some(AnalysisError::ModelUnavailable(format!(
                        "Request timed out after {}s",
                        self.timeout.as_secs()
                    )));
                }
            }

            if attempt + 1 < self.settings.max_retries {
                let wait = Duration::from_secs(2_u64.pow(attempt.min(3)));
                warn!(attempt, "model request failed, retrying in {}s", wait.as_secs());
                tokio::time::sleep(wait).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| AnalysisError::ModelUnavailable("Unknown error".to_string())))
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(&self, request: &PlanRequest) -> Result<String, AnalysisError> {
        debug!(request_id = %request.id, model = %self.settings.model, "sending plan request");
        let payload = self.build_payload(request);
        let response = self.execute_with_retry(payload).await?;
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                AnalysisError::ModelResponseInvalid(
                    "response has no message content".to_string(),
                )
            })?;
        Ok(content.to_string())
    }
}

static SHARED: OnceCell<Arc<HttpModelClient>> = OnceCell::new();

/// Process-wide client built from the environment on first use.
pub fn shared_client() -> Result<Arc<HttpModelClient>, AnalysisError> {
    SHARED
        .get_or_try_init(|| {
            let settings = ModelSettings::from_env()?;
            Ok(Arc::new(HttpModelClient::new(settings)?))
        })
        .cloned()
}
