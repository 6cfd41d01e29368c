#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use wordsteacher_backend::auth::sign_jwt_for_user;
use wordsteacher_backend::config::Config;
use wordsteacher_backend::db::{DocumentStore, MemoryStore, Query};
use wordsteacher_backend::services::clock::FixedClock;
use wordsteacher_backend::services::llm_provider::{ChatBackend, LLMError};
use wordsteacher_backend::state::AppState;

pub const SECRET: &str = "integration-secret";

/// Answers every prompt by echoing its last line.
pub struct EchoBackend;

#[async_trait]
impl ChatBackend for EchoBackend {
    async fn complete(&self, transcript: &str) -> Result<Option<String>, LLMError> {
        Ok(transcript.lines().last().map(|line| format!("echo {line}")))
    }
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
}

pub fn create_test_app() -> TestApp {
    let config = Config {
        jwt_secret: Some(SECRET.to_string()),
        ..Config::default()
    };
    create_test_app_with(config)
}

pub fn create_test_app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap(),
    ));
    let state = AppState::with_parts(config, store.clone(), clock.clone(), Arc::new(EchoBackend));

    TestApp {
        app: wordsteacher_backend::build_app(state),
        store,
        clock,
    }
}

pub fn token_for(user_id: &str) -> String {
    sign_jwt_for_user(user_id, SECRET, "1h", Utc::now()).unwrap()
}

pub struct Call<'a> {
    pub method: Method,
    pub uri: &'a str,
    pub user: Option<&'a str>,
    pub language: Option<&'a str>,
    pub body: Option<Value>,
}

impl<'a> Call<'a> {
    pub fn new(method: Method, uri: &'a str) -> Self {
        Self {
            method,
            uri,
            user: None,
            language: None,
            body: None,
        }
    }

    pub fn user(mut self, user: &'a str) -> Self {
        self.user = Some(user);
        self
    }

    pub fn language(mut self, language: &'a str) -> Self {
        self.language = Some(language);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl TestApp {
    pub async fn call(&self, call: Call<'_>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(call.method).uri(call.uri);
        if let Some(user) = call.user {
            builder = builder.header("Authorization", format!("Bearer {}", token_for(user)));
        }
        if let Some(language) = call.language {
            builder = builder.header("X-Language-Id", language);
        }
        let body = match call.body {
            Some(value) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Registers `user` and creates one language, returning its id.
    pub async fn onboard(&self, user: &str) -> String {
        let (status, _) = self
            .call(
                Call::new(Method::POST, "/api/users/register")
                    .user(user)
                    .json(serde_json::json!({ "email": format!("{user}@example.com") })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self
            .call(
                Call::new(Method::POST, "/api/languages")
                    .user(user)
                    .json(serde_json::json!({ "name": "German", "code": "de" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Overwrites one field of the only document in `collection` owned by the
    /// user/language pair.
    pub async fn patch_owned(
        &self,
        collection: &str,
        user: &str,
        language: &str,
        field: &str,
        value: Value,
    ) {
        let query = Query::collection(collection)
            .where_eq("user_id", user)
            .where_eq("language_id", language);
        let docs = self.store.query(&query).await.unwrap();
        assert_eq!(docs.len(), 1);
        let mut fields = serde_json::Map::new();
        fields.insert(field.to_string(), value);
        self.store.update(collection, &docs[0].id, fields).await.unwrap();
    }
}
