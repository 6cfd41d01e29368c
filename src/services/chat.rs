//! Per-user conversations with the language assistant.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::db::new_document_id;
use crate::services::clock::Clock;
use crate::services::llm_provider::ChatBackend;

pub const BUSY_MESSAGE: &str = "Server is busy. Please try again later...";
pub const EMPTY_ANSWER: &str = "No response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    fn label(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationMessage {
    pub id: String,
    pub sender: Sender,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// Renders the history as the prompt body, one `sender: text` line per message.
pub fn transcript(history: &[ConversationMessage]) -> String {
    history
        .iter()
        .map(|message| format!("{}: {}", message.sender.label(), message.payload))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct ChatService {
    backend: Arc<dyn ChatBackend>,
    clock: Arc<dyn Clock>,
    conversations: RwLock<HashMap<String, Vec<ConversationMessage>>>,
}

impl ChatService {
    pub fn new(backend: Arc<dyn ChatBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    fn message(&self, sender: Sender, payload: String) -> ConversationMessage {
        ConversationMessage {
            id: new_document_id(),
            sender,
            payload,
            created_at: self.clock.now(),
        }
    }

    pub async fn history(&self, user_id: &str) -> Vec<ConversationMessage> {
        self.conversations
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Sends `text` and waits for the answer. Blank input is ignored and
    /// yields `None`. Provider failures become the busy message instead of
    /// an error.
    pub async fn send(&self, user_id: &str, text: &str) -> Option<ConversationMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let prompt = {
            let mut conversations = self.conversations.write().await;
            let history = conversations.entry(user_id.to_string()).or_default();
            history.push(self.message(Sender::User, text.to_string()));
            transcript(history)
        };

        let payload = match self.backend.complete(&prompt).await {
            Ok(Some(answer)) => answer,
            Ok(None) => EMPTY_ANSWER.to_string(),
            Err(err) => {
                tracing::warn!(user_id, error = %err, "chat completion failed");
                BUSY_MESSAGE.to_string()
            }
        };

        let reply = self.message(Sender::Assistant, payload);
        self.conversations
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(reply.clone());
        Some(reply)
    }
}
