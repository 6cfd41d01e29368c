use axum::extract::{Extension, Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::models::{LanguageUpdate, NewLanguage};
use crate::response::{created, ok, AppError};
use crate::services::languages;
use crate::session::Session;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(add))
        .route("/:id", put(update).delete(remove))
}

async fn list(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    match languages::list_languages(state.services(), &session.user_id).await {
        Ok(list) => ok(list),
        Err(err) => AppError::from_service(err, "Could not load languages").into_response(),
    }
}

async fn add(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<NewLanguage>,
) -> Response {
    match languages::add_language(state.services(), &session.user_id, &body).await {
        Ok(language) => created(language, Vec::new()),
        Err(err) => AppError::from_service(err, "Could not add language").into_response(),
    }
}

async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<LanguageUpdate>,
) -> Response {
    match languages::update_language(state.services(), &session.user_id, &id, &body).await {
        Ok(language) => ok(language),
        Err(err) => AppError::from_service(err, "Could not update language").into_response(),
    }
}

async fn remove(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    match languages::delete_language(state.services(), &session.user_id, &id).await {
        Ok(()) => ok(serde_json::json!({ "id": id })),
        Err(err) => AppError::from_service(err, "Could not delete language").into_response(),
    }
}
