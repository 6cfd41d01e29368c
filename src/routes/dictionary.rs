use axum::extract::{Extension, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::services::dictionary::{self, EntryKey, EntryUpdate};
use crate::session::Session;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    original: EntryKey,
    update: EntryUpdate,
}

#[derive(Serialize)]
struct Deleted {
    deleted: bool,
}

async fn list(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    match dictionary::list_entries(state.services(), &session).await {
        Ok(entries) => ok(entries),
        Err(err) => AppError::from_service(err, "Could not fetch dictionary").into_response(),
    }
}

async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<UpdateRequest>,
) -> Response {
    match dictionary::update_entry(state.services(), &session, &body.original, &body.update).await
    {
        Ok(entry) => ok(entry),
        Err(err) => {
            AppError::from_service(err, "Could not update dictionary word").into_response()
        }
    }
}

async fn remove(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(key): Json<EntryKey>,
) -> Response {
    match dictionary::delete_entry(state.services(), &session, &key).await {
        Ok(deleted) => ok(Deleted { deleted }),
        Err(err) => {
            AppError::from_service(err, "Could not delete dictionary word").into_response()
        }
    }
}
