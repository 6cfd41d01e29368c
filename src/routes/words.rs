use std::collections::HashSet;

use axum::extract::{Extension, Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::models::{NewWord, WordCategory, WordUpdate};
use crate::response::{created, ok, ok_with_notices, AppError, Notice};
use crate::services::{leveling, words};
use crate::session::Session;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(add).delete(delete_all))
        .route("/drop", post(drop_words))
        .route("/reactivate", post(reactivate))
        .route("/:id", put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DropRequest {
    ids: Vec<String>,
    total: usize,
}

#[derive(Serialize)]
struct DeletedCount {
    deleted: usize,
}

#[derive(Serialize)]
struct Reactivated {
    reactivated: bool,
}

async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ListQuery>,
) -> Response {
    let category = match query.category.as_deref() {
        None => WordCategory::default(),
        Some(raw) => match WordCategory::parse(raw) {
            Some(category) => category,
            None => {
                return AppError::bad_request(format!("unknown category: {raw}")).into_response()
            }
        },
    };

    match words::list_words(state.services(), &session, category).await {
        Ok(list) => ok(list),
        Err(err) => AppError::from_service(err, "Could not fetch words").into_response(),
    }
}

async fn add(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<NewWord>,
) -> Response {
    match leveling::add_word(state.services(), &session, &body).await {
        Ok(outcome) => {
            let notices = Notice::achievements(&outcome.achievements);
            created(outcome, notices)
        }
        Err(err) => AppError::from_service(err, "Could not add word").into_response(),
    }
}

async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<WordUpdate>,
) -> Response {
    match words::update_word(state.services(), &session, &id, &body).await {
        Ok(word) => ok(word),
        Err(err) => AppError::from_service(err, "Could not update word").into_response(),
    }
}

async fn remove(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    match words::delete_word(state.services(), &session, &id).await {
        Ok(word) => ok(word),
        Err(err) => AppError::from_service(err, "Could not delete word").into_response(),
    }
}

async fn delete_all(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    match words::delete_all_active_words(state.services(), &session).await {
        Ok(deleted) => ok(DeletedCount { deleted }),
        Err(err) => AppError::from_service(err, "Could not delete all words").into_response(),
    }
}

async fn drop_words(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<DropRequest>,
) -> Response {
    let ids: HashSet<String> = body.ids.into_iter().collect();
    match leveling::drop_words(state.services(), &session, &ids, body.total).await {
        Ok(outcome) => {
            let notices = Notice::achievements(&outcome.achievements);
            ok_with_notices(outcome, notices)
        }
        Err(err) => AppError::from_service(err, "Could not drop words").into_response(),
    }
}

async fn reactivate(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    match words::reactivate_inactive_words(state.services(), &session).await {
        Ok(reactivated) => ok(Reactivated { reactivated }),
        Err(err) => {
            AppError::from_service(err, "Could not reactivate inactive words").into_response()
        }
    }
}
