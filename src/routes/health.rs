use std::time::{Instant, SystemTime};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
        .route("/live", get(live))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoResponse {
    service: &'static str,
    version: String,
    start_time: String,
    uptime: u64,
    chat_model: String,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

async fn root(State(state): State<AppState>) -> Response {
    let store = state.services().store();
    let started = Instant::now();
    let result = store.ping().await;

    let (status_code, response) = match result {
        Ok(()) => (
            StatusCode::OK,
            HealthResponse {
                status: "ok",
                store: "connected",
                backend: store.backend_name(),
                latency_ms: Some(started.elapsed().as_millis() as u64),
                timestamp: now_iso(),
            },
        ),
        Err(err) => {
            tracing::warn!(error = %err, "store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthResponse {
                    status: "degraded",
                    store: "disconnected",
                    backend: store.backend_name(),
                    latency_ms: None,
                    timestamp: now_iso(),
                },
            )
        }
    };

    (status_code, Json(response)).into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let config = state.config();
    Json(InfoResponse {
        service: "wordsteacher-backend",
        version: config.app_version.clone(),
        start_time: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
        chat_model: config.llm_model.clone(),
    })
    .into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn system_time_iso(value: SystemTime) -> String {
    DateTime::<Utc>::from(value).to_rfc3339_opts(SecondsFormat::Millis, true)
}
