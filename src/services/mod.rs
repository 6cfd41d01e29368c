pub mod achievements;
pub mod chat;
pub mod clock;
pub mod dictionary;
pub mod languages;
pub mod leveling;
pub mod levels;
pub mod llm_provider;
pub mod statistics;
pub mod users;
pub mod words;

use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use thiserror::Error;

use crate::db::{DecodeError, DocumentStore, StoreError};
use crate::services::clock::{Clock, SystemClock};

/// Everything an operation needs besides the caller's session.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
    /// Offset used to find local midnight for day streaks.
    pub day_offset: FixedOffset,
}

impl ServiceContext {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            day_offset: utc_offset(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_day_offset(mut self, offset: FixedOffset) -> Self {
        self.day_offset = offset;
        self
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }
}

pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Validation(String),
    #[error("no language selected")]
    LanguageNotSelected,
    #[error("{what} not found")]
    NotFound { what: &'static str },
    #[error("{what} belongs to another user")]
    Forbidden { what: &'static str },
}

impl From<DecodeError> for ServiceError {
    fn from(err: DecodeError) -> Self {
        Self::Store(StoreError::Decode(err))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};

    use super::{ServiceContext, ServiceError};
    use crate::db::MemoryStore;
    use crate::models::WordCategory;
    use crate::services::clock::FixedClock;
    use crate::session::Session;

    pub struct Harness {
        pub store: Arc<MemoryStore>,
        pub clock: Arc<FixedClock>,
        pub ctx: ServiceContext,
        pub session: Session,
    }

    pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    pub async fn count_active_words(
        ctx: &ServiceContext,
        session: &Session,
    ) -> Result<usize, ServiceError> {
        let active = crate::services::words::list_words(ctx, session, WordCategory::Word).await?;
        Ok(active.len())
    }

    pub async fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(at(2024, 3, 10, 12)));
        let ctx = ServiceContext::new(store.clone()).with_clock(clock.clone());
        let session = Session::new("user-1").with_language("lang-de");
        crate::services::levels::ensure_level(&ctx, "user-1", "lang-de")
            .await
            .unwrap();
        crate::services::statistics::ensure_statistics(&ctx, "user-1", "lang-de")
            .await
            .unwrap();
        Harness {
            store,
            clock,
            ctx,
            session,
        }
    }
}
