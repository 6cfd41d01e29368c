use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::{Fields, USERS};
use crate::models::{decode, AppUser};
use crate::services::{ServiceContext, ServiceError};

/// Profile fields reported by the identity provider at sign-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

impl UserProfile {
    fn fields(&self) -> Fields {
        let mut fields = Fields::new();
        let entries = [
            ("email", &self.email),
            ("display_name", &self.display_name),
            ("photo_url", &self.photo_url),
            ("provider", &self.provider),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                fields.insert(key.to_string(), json!(value));
            }
        }
        fields
    }
}

pub async fn find_user(ctx: &ServiceContext, uid: &str) -> Result<Option<AppUser>, ServiceError> {
    match ctx.store().get(USERS, uid).await? {
        Some(doc) => Ok(Some(decode(&doc)?)),
        None => Ok(None),
    }
}

pub async fn is_registered(ctx: &ServiceContext, uid: &str) -> Result<bool, ServiceError> {
    Ok(ctx.store().get(USERS, uid).await?.is_some())
}

/// Upserts the user document keyed by `uid`. Fields absent from `profile`
/// keep their stored values and the creation time is kept on re-registration.
pub async fn register(
    ctx: &ServiceContext,
    uid: &str,
    profile: &UserProfile,
) -> Result<AppUser, ServiceError> {
    if uid.trim().is_empty() {
        return Err(ServiceError::Validation("uid must not be empty".to_string()));
    }

    let mut fields = profile.fields();
    fields.insert("uid".to_string(), json!(uid));
    let first_time = !is_registered(ctx, uid).await?;
    if first_time {
        fields.insert("created_at".to_string(), json!(ctx.clock.now()));
    }
    ctx.store().set(USERS, uid, fields, true).await?;

    if first_time {
        tracing::info!(uid, "user registered");
    }
    find_user(ctx, uid)
        .await?
        .ok_or(ServiceError::NotFound { what: "user" })
}
