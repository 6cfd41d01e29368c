use serde::Serialize;

use crate::services::ServiceError;

/// Who is calling and which language they are working in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: String,
    pub language_id: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            language_id: None,
        }
    }

    pub fn with_language(mut self, language_id: impl Into<String>) -> Self {
        self.language_id = Some(language_id.into());
        self
    }

    pub fn language(&self) -> Result<&str, ServiceError> {
        self.language_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ServiceError::LanguageNotSelected)
    }
}
