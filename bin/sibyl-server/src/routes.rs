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

use crate::summary;
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use plan_contracts::AnalysisError;
use serde_json::{json, Value};
use sibyl::Pipeline;
use tower_http::cors::CorsLayer;
use tracing::error;

const UPLOAD_LIMIT_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router() -> Router {
    Router::new()
        .route("/", get(health))
        .route("/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Multipart upload: `file` carries the dataset, `question` the query.
/// An empty question returns a preview instead of running the pipeline.
async fn analyze(mut multipart: Multipart) -> Response {
    let mut raw: Option<Vec<u8>> = None;
    let mut filename = String::new();
    let mut question = String::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return failure(StatusCode::BAD_REQUEST, &format!("bad multipart body: {e}")),
        };
        match field.name() {
            Some("file") => {
                filename = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => raw = Some(bytes.to_vec()),
                    Err(e) => {
                        return failure(StatusCode::BAD_REQUEST, &format!("upload failed: {e}"))
                    }
                }
            }
            Some("question") => {
                question = field.text().await.unwrap_or_default();
            }
            _ => {}
        }
    }

    let Some(raw) = raw else {
        return failure(StatusCode::BAD_REQUEST, "missing 'file' field");
    };

    let parse = tokio::task::spawn_blocking(move || tabula::read_table(&raw, &filename)).await;
    let df = match parse {
        Ok(Ok(df)) => df,
        Ok(Err(e)) => {
            return failure(StatusCode::BAD_REQUEST, &format!("Error reading file: {e}"))
        }
        Err(e) => {
            return failure(StatusCode::INTERNAL_SERVER_ERROR, &format!("worker failed: {e}"))
        }
    };

    if question.trim().is_empty() {
        return preview(&df);
    }

    let client = match sibyl::shared_client() {
        Ok(client) => client,
        Err(e) => {
            error!("model client unavailable: {e}");
            return failure(StatusCode::SERVICE_UNAVAILABLE, &e.user_message());
        }
    };
    let pipeline = Pipeline::new(client);
    match pipeline.run(&df, question.trim()).await {
        Ok(response) => {
            let summary = summary::build(&df, response.used_columns.as_deref());
            let mut body = match serde_json::to_value(&response) {
                Ok(value) => value,
                Err(e) => {
                    return failure(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &format!("serialisation failed: {e}"),
                    )
                }
            };
            body["ok"] = json!(true);
            body["summary"] = serde_json::to_value(summary).unwrap_or(Value::Null);
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            error!("pipeline failed: {e}");
            failure(status_for(&e), &e.user_message())
        }
    }
}

fn preview(df: &polars::prelude::DataFrame) -> Response {
    let head = match tabula::sample_records(df, 5) {
        Ok(records) => records
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|(name, value)| (name, Value::String(value)))
                    .collect::<serde_json::Map<String, Value>>()
            })
            .collect::<Vec<_>>(),
        Err(e) => {
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("preview failed: {e}"),
            )
        }
    };
    let columns: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|name| (*name).to_string())
        .collect();
    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "message": "No question provided.",
            "rows": df.height(),
            "cols": columns,
            "head": head,
        })),
    )
        .into_response()
}

// Bad uploads are the caller's fault; everything past ingestion is a
// server-side (model or engine) failure and reports 500-class.
fn status_for(error: &AnalysisError) -> StatusCode {
    match error {
        AnalysisError::UnreadableFile(_) => StatusCode::BAD_REQUEST,
        AnalysisError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "ok": false, "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let response = build_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["status"], "ok");
    }

    fn multipart_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(
                "content-type",
                "multipart/form-data; boundary=xyzboundary",
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn analyze_without_file_is_a_bad_request() {
        let body = concat!(
            "--xyzboundary\r\n",
            "Content-Disposition: form-data; name=\"question\"\r\n\r\n",
            "total revenue?\r\n",
            "--xyzboundary--\r\n"
        )
        .to_string();
        let response = build_router().oneshot(multipart_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value = body_json(response).await;
        assert_eq!(value["ok"], false);
    }

    #[tokio::test]
    async fn empty_question_returns_a_preview() {
        let body = concat!(
            "--xyzboundary\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"sales.csv\"\r\n",
            "Content-Type: text/csv\r\n\r\n",
            "region,revenue\nnorth,100\nsouth,40\r\n",
            "--xyzboundary--\r\n"
        )
        .to_string();
        let response = build_router().oneshot(multipart_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["ok"], true);
        assert_eq!(value["rows"], 2);
        assert_eq!(value["cols"][0], "region");
    }

    #[test]
    fn pipeline_failures_report_server_side_statuses() {
        assert_eq!(
            status_for(&AnalysisError::UnreadableFile("bad bytes".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&AnalysisError::ModelUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&AnalysisError::ExecutionFailed("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&AnalysisError::UnsafeCode {
                category: "disallowed call 'read_csv'".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn unreadable_upload_is_a_bad_request() {
        let body = concat!(
            "--xyzboundary\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"empty.csv\"\r\n",
            "Content-Type: text/csv\r\n\r\n",
            "region,revenue\n\r\n",
            "--xyzboundary--\r\n"
        )
        .to_string();
        let response = build_router().oneshot(multipart_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value = body_json(response).await;
        assert!(value["error"]
            .as_str()
            .unwrap()
            .starts_with("Error reading file"));
    }
}
