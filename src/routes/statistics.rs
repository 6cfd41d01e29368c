use axum::extract::{Extension, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::response::{ok, AppError};
use crate::services::{achievements, statistics};
use crate::session::Session;
use crate::state::AppState;

pub fn statistics_router() -> Router<AppState> {
    Router::new().route("/", get(current))
}

pub fn achievements_router() -> Router<AppState> {
    Router::new().route("/", get(catalog))
}

async fn current(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    match statistics::find_statistics(state.services(), &session).await {
        Ok(Some(stats)) => ok(stats),
        Ok(None) => AppError::not_found("statistics not found").into_response(),
        Err(err) => AppError::from_service(err, "Could not fetch statistics").into_response(),
    }
}

/// The full catalog, marking what the session's language has unlocked.
async fn catalog(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    let stats = match session.language_id {
        Some(_) => match statistics::find_statistics(state.services(), &session).await {
            Ok(stats) => stats,
            Err(err) => {
                return AppError::from_service(err, "Could not fetch achievements").into_response()
            }
        },
        None => None,
    };
    ok(achievements::catalog(stats.as_ref()))
}
