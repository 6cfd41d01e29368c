use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::Config;
use crate::db::DocumentStore;
use crate::services::chat::ChatService;
use crate::services::clock::{Clock, SystemClock};
use crate::services::llm_provider::{ChatBackend, LLMConfig, LLMProvider};
use crate::services::ServiceContext;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    services: ServiceContext,
    chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let backend: Arc<dyn ChatBackend> =
            Arc::new(LLMProvider::new(LLMConfig::from_config(&config)));
        Self::with_parts(config, store, Arc::new(SystemClock), backend)
    }

    /// Builds the state from explicit collaborators; tests swap in a fixed
    /// clock and a scripted chat backend here.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        chat_backend: Arc<dyn ChatBackend>,
    ) -> Self {
        let services = ServiceContext::new(store)
            .with_clock(Arc::clone(&clock))
            .with_day_offset(config.streak_offset);
        let chat = Arc::new(ChatService::new(chat_backend, clock));

        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            config: Arc::new(config),
            services,
            chat,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn services(&self) -> &ServiceContext {
        &self.services
    }

    pub fn chat(&self) -> Arc<ChatService> {
        Arc::clone(&self.chat)
    }
}
