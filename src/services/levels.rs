use serde_json::json;

use crate::db::{Fields, Query, WriteBatch, LANGUAGE_ID_FIELD, LEVEL, USER_ID_FIELD};
use crate::models::{decode, Level, MAX_LEVEL, MIN_LEVEL};
use crate::services::{ServiceContext, ServiceError};
use crate::session::Session;

fn level_query(user_id: &str, language_id: &str) -> Query {
    Query::collection(LEVEL)
        .where_eq(USER_ID_FIELD, user_id)
        .where_eq(LANGUAGE_ID_FIELD, language_id)
}

async fn find_level_for(
    ctx: &ServiceContext,
    user_id: &str,
    language_id: &str,
) -> Result<Option<Level>, ServiceError> {
    let docs = ctx.store().query(&level_query(user_id, language_id)).await?;
    match docs.first() {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn find_level(
    ctx: &ServiceContext,
    session: &Session,
) -> Result<Option<Level>, ServiceError> {
    find_level_for(ctx, &session.user_id, session.language()?).await
}

/// Creates the level document at level 1 if the pair has none yet.
pub async fn ensure_level(
    ctx: &ServiceContext,
    user_id: &str,
    language_id: &str,
) -> Result<Level, ServiceError> {
    if let Some(level) = find_level_for(ctx, user_id, language_id).await? {
        return Ok(level);
    }

    let mut fields = Fields::new();
    fields.insert("level".to_string(), json!(MIN_LEVEL));
    fields.insert(USER_ID_FIELD.to_string(), json!(user_id));
    fields.insert(LANGUAGE_ID_FIELD.to_string(), json!(language_id));
    let doc = ctx.store().add(LEVEL, fields).await?;
    Ok(decode(&doc)?)
}

/// The level after `current`, wrapping from the last level back to the first.
pub fn next_level(current: u8) -> (u8, bool) {
    if current >= MAX_LEVEL {
        (MIN_LEVEL, true)
    } else {
        (current + 1, false)
    }
}

pub async fn set_level(ctx: &ServiceContext, level_id: &str, value: u8) -> Result<(), ServiceError> {
    let mut fields = Fields::new();
    fields.insert("level".to_string(), json!(value));
    ctx.store().update(LEVEL, level_id, fields).await?;
    Ok(())
}

pub async fn stage_language_deletion(
    ctx: &ServiceContext,
    batch: &mut WriteBatch,
    user_id: &str,
    language_id: &str,
) -> Result<(), ServiceError> {
    if let Some(level) = find_level_for(ctx, user_id, language_id).await? {
        batch.delete(LEVEL, &level.id);
    }
    Ok(())
}
