use axum::extract::{Extension, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::session::Session;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(history).post(send))
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    text: String,
}

async fn history(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    ok(state.chat().history(&session.user_id).await)
}

async fn send(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<SendRequest>,
) -> Response {
    match state.chat().send(&session.user_id, &body.text).await {
        Some(reply) => ok(reply),
        None => AppError::validation("message must not be empty").into_response(),
    }
}
