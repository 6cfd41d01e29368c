use axum::extract::{Extension, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::Identity;
use crate::response::{ok, AppError};
use crate::services::users::{self, UserProfile};
use crate::state::AppState;

/// Registration only needs a valid token; reading the profile needs a
/// registered user.
pub fn register_router() -> Router<AppState> {
    Router::new().route("/register", post(register))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(profile): Json<UserProfile>,
) -> Response {
    match users::register(state.services(), &identity.user_id, &profile).await {
        Ok(user) => ok(user),
        Err(err) => AppError::from_service(err, "Could not sign in").into_response(),
    }
}

async fn me(State(state): State<AppState>, Extension(identity): Extension<Identity>) -> Response {
    match users::find_user(state.services(), &identity.user_id).await {
        Ok(Some(user)) => ok(user),
        Ok(None) => AppError::not_found("user not found").into_response(),
        Err(err) => AppError::from_service(err, "Could not load the profile").into_response(),
    }
}
