use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::StoreError;
use crate::services::achievements::{Achievement, LadderKind};
use crate::services::ServiceError;

pub const SUCCESS_LIFE_MS: u32 = 6000;
pub const ERROR_LIFE_MS: u32 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warn,
    Error,
}

/// A transient notification for the client to show and dismiss after `life` ms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    pub life: u32,
}

impl Notice {
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: "Error".to_string(),
            detail: detail.into(),
            life: ERROR_LIFE_MS,
        }
    }

    pub fn achievement(achievement: Achievement) -> Self {
        let summary = match achievement.ladder() {
            LadderKind::Cycles => "New cycles streak!",
            LadderKind::Words | LadderKind::Days => "Advancement made!",
        };
        Self {
            severity: Severity::Success,
            summary: summary.to_string(),
            detail: achievement.as_str().to_string(),
            life: SUCCESS_LIFE_MS,
        }
    }

    pub fn achievements(achievements: &[Achievement]) -> Vec<Self> {
        achievements.iter().copied().map(Self::achievement).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    ok_with_notices(data, Vec::new())
}

pub fn ok_with_notices<T: Serialize>(data: T, notices: Vec<Notice>) -> Response {
    Json(SuccessResponse {
        success: true,
        data,
        notices,
    })
    .into_response()
}

pub fn created<T: Serialize>(data: T, notices: Vec<Notice>) -> Response {
    (
        StatusCode::CREATED,
        Json(SuccessResponse {
            success: true,
            data,
            notices,
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    notice: Option<Notice>,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            notice: None,
            is_operational: false,
        }
    }

    /// Maps a failed operation to a response. Store failures are logged and
    /// carry an error notice with `detail` describing what could not be done.
    pub fn from_service(err: ServiceError, detail: &str) -> Self {
        match err {
            ServiceError::Validation(message) => Self::validation(message),
            ServiceError::LanguageNotSelected => Self::operational(
                StatusCode::BAD_REQUEST,
                "LANGUAGE_REQUIRED",
                "select a language first",
            ),
            ServiceError::NotFound { what } => Self::not_found(format!("{what} not found")),
            ServiceError::Forbidden { what } => {
                Self::forbidden(format!("{what} belongs to another user"))
            }
            ServiceError::Store(store_err) => {
                tracing::warn!(error = %store_err, detail, "store operation failed");
                let base = match store_err {
                    StoreError::Unavailable(_) => Self::service_unavailable(detail),
                    StoreError::NotFound { .. } => Self::not_found(detail),
                    StoreError::Decode(_) | StoreError::Sqlx(_) => Self::internal(detail),
                };
                base.with_notice(Notice::error(detail))
            }
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            notice: None,
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            "internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
            notices: self.notice.into_iter().collect(),
        };

        (self.status, Json(body)).into_response()
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError::operational(status, code, message)
}
