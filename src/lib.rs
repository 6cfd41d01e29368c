pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::config::DbConfigError;
use crate::db::postgres::DbInitError;
use crate::db::{DocumentStore, MemoryStore, PgDocumentStore};
use crate::state::AppState;

/// Opens PostgreSQL when `DATABASE_URL` is set and falls back to the
/// in-memory store otherwise.
pub async fn open_store() -> Result<Arc<dyn DocumentStore>, DbInitError> {
    match PgDocumentStore::from_env().await {
        Ok(store) => Ok(store),
        Err(DbInitError::Config(DbConfigError::Missing { key })) => {
            tracing::info!(key, "no database configured, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        Err(err) => Err(err),
    }
}

pub fn build_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn create_app() -> axum::Router {
    let config = Config::from_env();
    let store = match open_store().await {
        Ok(store) => store,
        Err(err) => {
            tracing::warn!(error = %err, "database unavailable, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    build_app(AppState::new(config, store))
}
