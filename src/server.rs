// Copyright 2026 Marketscribe Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP submission API.
//!
//! Accepts structured run requests (brand → countries → products),
//! validates and normalizes them, and hands them to the single-worker run
//! queue. Exposes run/queue status alongside.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::model::Submission;
use crate::queue::{RunQueue, SubmitDisposition};

/// Shared server state.
pub struct AppState {
    pub queue: Arc<RunQueue>,
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/scraper-status", get(status))
        .route("/api/submissions", post(submit))
        .layer(cors)
        .with_state(state)
}

/// Serve on the given port until the process exits.
pub async fn start(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("submission API listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "running": state.queue.is_running(),
        "queue_size": state.queue.queue_size(),
    }))
}

async fn submit(
    State(state): State<Arc<AppState>>,
    Json(mut submission): Json<Submission>,
) -> impl IntoResponse {
    if submission.brands.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No brands provided");
    }
    let kept = submission.normalize();
    if kept == 0 {
        return error_response(StatusCode::BAD_REQUEST, "No valid countries found");
    }

    let payload = serde_json::to_value(&submission).unwrap_or(Value::Null);
    let message = match state.queue.submit(submission) {
        SubmitDisposition::Started => "Run started in the background",
        SubmitDisposition::Queued => {
            "Submission queued, will start once the current run finishes"
        }
    };
    tracing::info!(message, "submission accepted");
    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "message": message,
            "payload": payload,
        })),
    )
}

fn error_response(status: StatusCode, detail: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "ok": false, "detail": detail })))
}
