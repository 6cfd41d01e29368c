use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::{to_fields, Fields, Query, WriteBatch, DICTIONARY, LANGUAGE_ID_FIELD, USER_ID_FIELD};
use crate::models::{decode, decode_all, CefrLevel, DictionaryWord, NewWord};
use crate::services::{ServiceContext, ServiceError};
use crate::session::Session;

pub fn normalize_word(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Identifies a dictionary entry by the pair it was created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryKey {
    pub word: String,
    pub meaning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryUpdate {
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub level: Option<CefrLevel>,
}

fn dictionary_query(user_id: &str, language_id: &str) -> Query {
    Query::collection(DICTIONARY)
        .where_eq(USER_ID_FIELD, user_id)
        .where_eq(LANGUAGE_ID_FIELD, language_id)
}

pub async fn list_entries(
    ctx: &ServiceContext,
    session: &Session,
) -> Result<Vec<DictionaryWord>, ServiceError> {
    let docs = ctx
        .store()
        .query(&dictionary_query(&session.user_id, session.language()?))
        .await?;
    Ok(decode_all(&docs)?)
}

/// Creates a dictionary entry for `word` unless one with the same normalized
/// spelling already exists for this user and language.
pub async fn add_if_absent(
    ctx: &ServiceContext,
    session: &Session,
    word: &NewWord,
) -> Result<Option<DictionaryWord>, ServiceError> {
    let normalized = normalize_word(&word.word);
    let existing = list_entries(ctx, session).await?;
    if existing
        .iter()
        .any(|entry| normalize_word(&entry.word) == normalized)
    {
        return Ok(None);
    }

    let entry = DictionaryWord {
        id: String::new(),
        word: word.word.trim().to_string(),
        meaning: word.meaning.trim().to_string(),
        example: word.example.trim().to_string(),
        level: word.level,
        user_id: session.user_id.clone(),
        language_id: session.language()?.to_string(),
    };
    let doc = ctx.store().add(DICTIONARY, to_fields(&entry)?).await?;
    Ok(Some(decode(&doc)?))
}

async fn find_by_key(
    ctx: &ServiceContext,
    session: &Session,
    key: &EntryKey,
) -> Result<Option<DictionaryWord>, ServiceError> {
    let query = dictionary_query(&session.user_id, session.language()?)
        .where_eq("word", key.word.as_str())
        .where_eq("meaning", key.meaning.as_str());
    let docs = ctx.store().query(&query).await?;
    match docs.first() {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

/// Rewrites the entry created from `original`. No matching entry is a no-op.
pub async fn update_entry(
    ctx: &ServiceContext,
    session: &Session,
    original: &EntryKey,
    update: &EntryUpdate,
) -> Result<Option<DictionaryWord>, ServiceError> {
    if update.word.trim().is_empty() || update.meaning.trim().is_empty() {
        return Err(ServiceError::Validation(
            "word and meaning must not be empty".to_string(),
        ));
    }

    let Some(mut entry) = find_by_key(ctx, session, original).await? else {
        return Ok(None);
    };

    entry.word = update.word.trim().to_string();
    entry.meaning = update.meaning.trim().to_string();
    entry.example = update.example.trim().to_string();
    entry.level = update.level;

    let mut fields = Fields::new();
    fields.insert("word".to_string(), json!(entry.word));
    fields.insert("meaning".to_string(), json!(entry.meaning));
    fields.insert("example".to_string(), json!(entry.example));
    fields.insert("level".to_string(), json!(entry.level));
    ctx.store().update(DICTIONARY, &entry.id, fields).await?;
    Ok(Some(entry))
}

/// Deletes the entry matching `key`; returns whether one existed.
pub async fn delete_entry(
    ctx: &ServiceContext,
    session: &Session,
    key: &EntryKey,
) -> Result<bool, ServiceError> {
    let Some(entry) = find_by_key(ctx, session, key).await? else {
        return Ok(false);
    };
    ctx.store().delete(DICTIONARY, &entry.id).await?;
    Ok(true)
}

/// Queues a delete for every entry of the language; returns how many.
pub async fn stage_language_deletion(
    ctx: &ServiceContext,
    batch: &mut WriteBatch,
    user_id: &str,
    language_id: &str,
) -> Result<usize, ServiceError> {
    let docs = ctx
        .store()
        .query(&dictionary_query(user_id, language_id))
        .await?;
    for doc in &docs {
        batch.delete(DICTIONARY, &doc.id);
    }
    Ok(docs.len())
}
