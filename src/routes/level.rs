use axum::extract::{Extension, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::{ok, ok_with_notices, AppError, Notice};
use crate::services::{leveling, levels};
use crate::session::Session;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(current))
        .route("/advance", post(advance))
}

async fn current(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    match levels::find_level(state.services(), &session).await {
        Ok(Some(level)) => ok(level),
        Ok(None) => AppError::not_found("level not found").into_response(),
        Err(err) => AppError::from_service(err, "Could not fetch level").into_response(),
    }
}

async fn advance(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    let services = state.services();
    let level = match levels::find_level(services, &session).await {
        Ok(Some(level)) => level,
        Ok(None) => return AppError::not_found("level not found").into_response(),
        Err(err) => return AppError::from_service(err, "Could not fetch level").into_response(),
    };

    match leveling::advance_level(services, &session, &level).await {
        Ok(outcome) => {
            let notices = Notice::achievements(&outcome.achievements);
            ok_with_notices(outcome, notices)
        }
        Err(err) => AppError::from_service(err, "Could not update level").into_response(),
    }
}
