use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::config::Config;

const MAX_RETRIES: usize = 3;
const BASE_BACKOFF_MS: u64 = 200;

const TUTOR_PROMPT: &str = "You are a friendly language tutor inside a vocabulary app. \
Answer questions about words, grammar and usage. The conversation so far follows, \
one message per line, prefixed by its sender.";

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

impl LLMConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
            api_endpoint: normalize_endpoint(&config.llm_api_endpoint),
            timeout: config.llm_timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("LLM not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Something that turns a conversation transcript into an answer.
/// `Ok(None)` means the model replied without any text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, transcript: &str) -> Result<Option<String>, LLMError>;
}

/// OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct LLMProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LLMProvider {
    pub fn new(config: LLMConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn is_available(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|v| !v.trim().is_empty())
            && !self.config.model.trim().is_empty()
            && !self.config.api_endpoint.trim().is_empty()
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LLMError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(LLMError::NotConfigured("LLM_API_KEY"))?;

        let url = format!("{}/chat/completions", self.config.api_endpoint);
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false
        });

        self.post_with_retry(&url, api_key, &payload).await
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> Result<ChatResponse, LLMError> {
        let mut retry = 0;
        loop {
            let err = match self.client.post(url).bearer_auth(api_key).json(payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let bytes = resp.bytes().await?;
                    return serde_json::from_slice(&bytes).map_err(|e| {
                        tracing::error!(error = %e, "failed to parse LLM response");
                        LLMError::Json(e)
                    });
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    if !is_retryable(status) {
                        return Err(LLMError::HttpStatus { status, body });
                    }
                    LLMError::HttpStatus { status, body }
                }
                Err(e) => LLMError::Request(e),
            };

            if retry >= MAX_RETRIES {
                return Err(err);
            }
            warn!(retry, error = %err, "LLM request failed, retrying");
            sleep(backoff(retry)).await;
            retry += 1;
        }
    }
}

#[async_trait]
impl ChatBackend for LLMProvider {
    async fn complete(&self, transcript: &str) -> Result<Option<String>, LLMError> {
        let messages = [
            ChatMessage {
                role: "system".into(),
                content: Some(TUTOR_PROMPT.into()),
            },
            ChatMessage {
                role: "user".into(),
                content: Some(transcript.into()),
            },
        ];
        let response = self.chat(&messages).await?;
        Ok(response.first_content().map(str::to_string))
    }
}

fn backoff(retry: usize) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS * (1 << retry))
}

fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}
