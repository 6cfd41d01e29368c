use std::collections::HashSet;

use serde_json::Value;

use crate::db::{
    to_fields, Fields, Query, WriteBatch, ACTIVE_FIELD, LANGUAGE_ID_FIELD, USER_ID_FIELD,
    WORDS, WORD_TYPE_FIELD,
};
use crate::models::{decode, decode_all, NewWord, Word, WordCategory, WordType, WordUpdate};
use crate::services::{ServiceContext, ServiceError};
use crate::session::Session;

fn owned_words(user_id: &str, language_id: &str) -> Query {
    Query::collection(WORDS)
        .where_eq(USER_ID_FIELD, user_id)
        .where_eq(LANGUAGE_ID_FIELD, language_id)
}

pub fn category_query(user_id: &str, language_id: &str, category: WordCategory) -> Query {
    let base = owned_words(user_id, language_id);
    match category {
        WordCategory::Word | WordCategory::Dropped => base
            .where_eq(WORD_TYPE_FIELD, WordType::Word.as_str())
            .where_eq(ACTIVE_FIELD, category == WordCategory::Word),
        WordCategory::Irregular => base
            .where_eq(WORD_TYPE_FIELD, WordType::Irregular.as_str())
            .where_eq(ACTIVE_FIELD, true),
        WordCategory::Dictionary => base.where_eq(WORD_TYPE_FIELD, WordType::Dictionary.as_str()),
        WordCategory::All => base.where_eq(WORD_TYPE_FIELD, WordType::Word.as_str()),
    }
}

pub async fn list_words(
    ctx: &ServiceContext,
    session: &Session,
    category: WordCategory,
) -> Result<Vec<Word>, ServiceError> {
    let query = category_query(&session.user_id, session.language()?, category);
    let docs = ctx.store().query(&query).await?;
    Ok(decode_all(&docs)?)
}

/// Stores a new active word. Identical words are not merged.
pub async fn insert_word(
    ctx: &ServiceContext,
    session: &Session,
    new_word: &NewWord,
) -> Result<Word, ServiceError> {
    new_word.validate().map_err(ServiceError::Validation)?;
    let language_id = session.language()?;

    let word = Word {
        id: String::new(),
        word: new_word.word.trim().to_string(),
        meaning: new_word.meaning.trim().to_string(),
        example: new_word.example.trim().to_string(),
        word_type: new_word.word_type,
        active: true,
        user_id: session.user_id.clone(),
        language_id: language_id.to_string(),
    };

    let doc = ctx.store().add(WORDS, to_fields(&word)?).await?;
    Ok(decode(&doc)?)
}

async fn owned_word(
    ctx: &ServiceContext,
    session: &Session,
    id: &str,
) -> Result<Word, ServiceError> {
    let Some(doc) = ctx.store().get(WORDS, id).await? else {
        return Err(ServiceError::NotFound { what: "word" });
    };
    let word: Word = decode(&doc)?;
    if word.user_id != session.user_id {
        return Err(ServiceError::Forbidden { what: "word" });
    }
    Ok(word)
}

pub async fn update_word(
    ctx: &ServiceContext,
    session: &Session,
    id: &str,
    update: &WordUpdate,
) -> Result<Word, ServiceError> {
    update.validate().map_err(ServiceError::Validation)?;
    let mut word = owned_word(ctx, session, id).await?;

    update.apply_to(&mut word);
    ctx.store().update(WORDS, id, to_fields(update)?).await?;
    Ok(word)
}

/// Deletes a word and returns what was deleted.
pub async fn delete_word(
    ctx: &ServiceContext,
    session: &Session,
    id: &str,
) -> Result<Word, ServiceError> {
    let word = owned_word(ctx, session, id).await?;
    ctx.store().delete(WORDS, id).await?;
    Ok(word)
}

/// Removes every active ordinary word of the session's language in one batch.
pub async fn delete_all_active_words(
    ctx: &ServiceContext,
    session: &Session,
) -> Result<usize, ServiceError> {
    let query = category_query(&session.user_id, session.language()?, WordCategory::Word);
    let docs = ctx.store().query(&query).await?;
    if docs.is_empty() {
        return Ok(0);
    }

    let mut batch = WriteBatch::new();
    for doc in &docs {
        batch.delete(WORDS, &doc.id);
    }
    ctx.store().commit(batch).await?;

    tracing::info!(user_id = %session.user_id, deleted = docs.len(), "active words purged");
    Ok(docs.len())
}

fn active_flag(active: bool) -> Fields {
    let mut fields = Fields::new();
    fields.insert(ACTIVE_FIELD.to_string(), Value::Bool(active));
    fields
}

/// Marks every listed word inactive in one batch. Ids that are not the
/// caller's words abort the whole operation before anything is written.
pub async fn deactivate_words(
    ctx: &ServiceContext,
    session: &Session,
    ids: &HashSet<String>,
) -> Result<(), ServiceError> {
    if ids.is_empty() {
        return Ok(());
    }

    let docs = ctx
        .store()
        .query(&owned_words(&session.user_id, session.language()?))
        .await?;
    let owned: HashSet<&str> = docs.iter().map(|doc| doc.id.as_str()).collect();
    if ids.iter().any(|id| !owned.contains(id.as_str())) {
        return Err(ServiceError::NotFound { what: "word" });
    }

    let mut batch = WriteBatch::new();
    for id in ids {
        batch.update(WORDS, id, active_flag(false));
    }
    ctx.store().commit(batch).await?;
    Ok(())
}

/// Flips every inactive word of the session's language back to active.
/// Returns false when there was nothing to reactivate.
pub async fn reactivate_inactive_words(
    ctx: &ServiceContext,
    session: &Session,
) -> Result<bool, ServiceError> {
    let query = owned_words(&session.user_id, session.language()?).where_eq(ACTIVE_FIELD, false);
    let docs = ctx.store().query(&query).await?;
    if docs.is_empty() {
        return Ok(false);
    }

    let mut batch = WriteBatch::new();
    for doc in &docs {
        batch.update(WORDS, &doc.id, active_flag(true));
    }
    ctx.store().commit(batch).await?;

    tracing::debug!(user_id = %session.user_id, reactivated = docs.len(), "inactive words reactivated");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{count_active_words, harness};

    fn new_word(word: &str, word_type: WordType) -> NewWord {
        NewWord {
            word: word.to_string(),
            meaning: format!("{word}-meaning"),
            example: String::new(),
            word_type,
            level: None,
        }
    }

    #[tokio::test]
    async fn identical_words_are_stored_twice() {
        let h = harness().await;
        let form = new_word("Haus", WordType::Word);
        let a = insert_word(&h.ctx, &h.session, &form).await.unwrap();
        let b = insert_word(&h.ctx, &h.session, &form).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(count_active_words(&h.ctx, &h.session).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn categories_split_by_type_and_active_flag() {
        let h = harness().await;
        let keep = insert_word(&h.ctx, &h.session, &new_word("Baum", WordType::Word))
            .await
            .unwrap();
        let gone = insert_word(&h.ctx, &h.session, &new_word("Hund", WordType::Word))
            .await
            .unwrap();
        insert_word(&h.ctx, &h.session, &new_word("gehen", WordType::Irregular))
            .await
            .unwrap();
        insert_word(&h.ctx, &h.session, &new_word("Katze", WordType::Dictionary))
            .await
            .unwrap();

        let ids: HashSet<String> = [gone.id.clone()].into_iter().collect();
        deactivate_words(&h.ctx, &h.session, &ids).await.unwrap();

        let names = |words: Vec<Word>| words.into_iter().map(|w| w.word).collect::<Vec<_>>();
        let listed = |category| list_words(&h.ctx, &h.session, category);

        assert_eq!(names(listed(WordCategory::Word).await.unwrap()), vec![keep.word.clone()]);
        assert_eq!(names(listed(WordCategory::Dropped).await.unwrap()), vec!["Hund"]);
        assert_eq!(names(listed(WordCategory::Irregular).await.unwrap()), vec!["gehen"]);
        assert_eq!(names(listed(WordCategory::Dictionary).await.unwrap()), vec!["Katze"]);
        assert_eq!(names(listed(WordCategory::All).await.unwrap()), vec!["Baum", "Hund"]);
    }

    #[tokio::test]
    async fn words_are_scoped_to_language() {
        let h = harness().await;
        insert_word(&h.ctx, &h.session, &new_word("Haus", WordType::Word))
            .await
            .unwrap();
        let french = Session::new("user-1").with_language("lang-fr");
        assert!(list_words(&h.ctx, &french, WordCategory::Word)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn deactivating_foreign_id_writes_nothing() {
        let h = harness().await;
        let mine = insert_word(&h.ctx, &h.session, &new_word("Haus", WordType::Word))
            .await
            .unwrap();
        let ids: HashSet<String> = [mine.id.clone(), "not-mine".to_string()].into_iter().collect();
        let err = deactivate_words(&h.ctx, &h.session, &ids).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
        assert_eq!(count_active_words(&h.ctx, &h.session).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reactivate_without_inactive_words_reports_false() {
        let h = harness().await;
        insert_word(&h.ctx, &h.session, &new_word("Haus", WordType::Word))
            .await
            .unwrap();
        assert!(!reactivate_inactive_words(&h.ctx, &h.session).await.unwrap());
    }

    #[tokio::test]
    async fn delete_all_keeps_irregular_and_dropped_words() {
        let h = harness().await;
        insert_word(&h.ctx, &h.session, &new_word("Haus", WordType::Word))
            .await
            .unwrap();
        let dropped = insert_word(&h.ctx, &h.session, &new_word("Baum", WordType::Word))
            .await
            .unwrap();
        insert_word(&h.ctx, &h.session, &new_word("gehen", WordType::Irregular))
            .await
            .unwrap();
        let ids: HashSet<String> = [dropped.id].into_iter().collect();
        deactivate_words(&h.ctx, &h.session, &ids).await.unwrap();

        assert_eq!(delete_all_active_words(&h.ctx, &h.session).await.unwrap(), 1);
        assert_eq!(h.store.len(WORDS), 2);
    }

    #[tokio::test]
    async fn update_requires_ownership() {
        let h = harness().await;
        let word = insert_word(&h.ctx, &h.session, &new_word("Haus", WordType::Word))
            .await
            .unwrap();
        let intruder = Session::new("user-2").with_language("lang-de");
        let update = WordUpdate {
            meaning: Some("home".into()),
            ..Default::default()
        };
        let err = update_word(&h.ctx, &intruder, &word.id, &update)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        let updated = update_word(&h.ctx, &h.session, &word.id, &update)
            .await
            .unwrap();
        assert_eq!(updated.meaning, "home");
    }

    #[tokio::test]
    async fn missing_language_is_rejected() {
        let h = harness().await;
        let no_lang = Session::new("user-1");
        let err = list_words(&h.ctx, &no_lang, WordCategory::Word)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::LanguageNotSelected));
    }
}
