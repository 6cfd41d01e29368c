mod chat;
mod dictionary;
mod health;
mod languages;
mod level;
mod statistics;
mod users;
mod words;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::middleware::auth::{require_identity, require_session};
use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let identity = middleware::from_fn_with_state(state.clone(), require_identity);
    let session = middleware::from_fn_with_state(state.clone(), require_session);

    let users = users::register_router()
        .layer(identity)
        .merge(users::router().layer(session.clone()));

    let api = Router::new()
        .nest("/languages", languages::router())
        .nest("/words", words::router())
        .nest("/dictionary", dictionary::router())
        .nest("/level", level::router())
        .nest("/statistics", statistics::statistics_router())
        .nest("/achievements", statistics::achievements_router())
        .nest("/chat", chat::router())
        .layer(session)
        .nest("/users", users);

    Router::new()
        .nest("/health", health::router())
        .nest("/api", api)
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}
