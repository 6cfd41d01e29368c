use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::auth::{extract_token, verify_jwt_hs256, AuthError, Identity};
use crate::response::AppError;
use crate::services::users;
use crate::session::Session;
use crate::state::AppState;

pub const LANGUAGE_HEADER: &str = "x-language-id";

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, AppError> {
    let Some(secret) = state.config().jwt_secret.as_deref() else {
        tracing::warn!(error = %AuthError::MissingSecret, "rejecting authenticated request");
        return Err(AppError::service_unavailable("authentication is not configured"));
    };
    let token = extract_token(headers).ok_or_else(|| AppError::unauthorized("missing token"))?;

    verify_jwt_hs256(&token, secret, Utc::now()).map_err(|err| {
        tracing::debug!(error = %err, "token rejected");
        AppError::unauthorized("authentication failed, please sign in again")
    })
}

fn selected_language(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LANGUAGE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Accepts any valid token. Used by sign-in registration, which runs before
/// the user document exists.
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

/// Requires a valid token of a registered user and attaches the [`Session`],
/// including the language selected through the `X-Language-Id` header.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let identity = match authenticate(&state, req.headers()) {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    match users::is_registered(state.services(), &identity.user_id).await {
        Ok(true) => {}
        Ok(false) => return AppError::forbidden("user is not registered").into_response(),
        Err(err) => {
            return AppError::from_service(err, "Could not verify the user").into_response()
        }
    }

    let mut session = Session::new(identity.user_id.clone());
    if let Some(language_id) = selected_language(req.headers()) {
        session = session.with_language(language_id);
    }

    req.extensions_mut().insert(identity);
    req.extensions_mut().insert(session);
    next.run(req).await
}
