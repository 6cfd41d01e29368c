use serde_json::json;

use crate::db::{Fields, Query, WriteBatch, LANGUAGES, USER_ID_FIELD};
use crate::models::{decode, decode_all, Language, LanguageUpdate, NewLanguage};
use crate::services::{dictionary, levels, statistics, ServiceContext, ServiceError};

pub async fn list_languages(
    ctx: &ServiceContext,
    user_id: &str,
) -> Result<Vec<Language>, ServiceError> {
    let query = Query::collection(LANGUAGES).where_eq(USER_ID_FIELD, user_id);
    let docs = ctx.store().query(&query).await?;
    Ok(decode_all(&docs)?)
}

async fn owned_language(
    ctx: &ServiceContext,
    user_id: &str,
    id: &str,
) -> Result<Language, ServiceError> {
    let Some(doc) = ctx.store().get(LANGUAGES, id).await? else {
        return Err(ServiceError::NotFound { what: "language" });
    };
    let language: Language = decode(&doc)?;
    if language.user_id != user_id {
        return Err(ServiceError::Forbidden { what: "language" });
    }
    Ok(language)
}

/// Stores the language and provisions its level and statistics documents.
pub async fn add_language(
    ctx: &ServiceContext,
    user_id: &str,
    new_language: &NewLanguage,
) -> Result<Language, ServiceError> {
    new_language.validate().map_err(ServiceError::Validation)?;

    let mut fields = Fields::new();
    fields.insert("name".to_string(), json!(new_language.name.trim()));
    fields.insert("code".to_string(), json!(new_language.code.trim()));
    fields.insert(USER_ID_FIELD.to_string(), json!(user_id));
    let doc = ctx.store().add(LANGUAGES, fields).await?;
    let language: Language = decode(&doc)?;

    levels::ensure_level(ctx, user_id, &language.id).await?;
    statistics::ensure_statistics(ctx, user_id, &language.id).await?;

    tracing::info!(user_id, language_id = %language.id, "language added");
    Ok(language)
}

pub async fn update_language(
    ctx: &ServiceContext,
    user_id: &str,
    id: &str,
    update: &LanguageUpdate,
) -> Result<Language, ServiceError> {
    let mut language = owned_language(ctx, user_id, id).await?;

    let mut fields = Fields::new();
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "language name must not be empty".to_string(),
            ));
        }
        language.name = name.trim().to_string();
        fields.insert("name".to_string(), json!(language.name));
    }
    if let Some(code) = &update.code {
        language.code = code.trim().to_string();
        fields.insert("code".to_string(), json!(language.code));
    }
    if !fields.is_empty() {
        ctx.store().update(LANGUAGES, id, fields).await?;
    }
    Ok(language)
}

/// Removes the language together with its dictionary, level and statistics
/// in one batch. Words of the language are left in place.
pub async fn delete_language(
    ctx: &ServiceContext,
    user_id: &str,
    id: &str,
) -> Result<(), ServiceError> {
    owned_language(ctx, user_id, id).await?;

    let mut batch = WriteBatch::new();
    dictionary::stage_language_deletion(ctx, &mut batch, user_id, id).await?;
    levels::stage_language_deletion(ctx, &mut batch, user_id, id).await?;
    statistics::stage_language_deletion(ctx, &mut batch, user_id, id).await?;
    batch.delete(LANGUAGES, id);
    ctx.store().commit(batch).await?;

    tracing::info!(user_id, language_id = id, "language deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::db::{
        Document, DocumentStore, MemoryStore, StoreError, DICTIONARY, LEVEL, STATISTICS,
    };
    use crate::models::{NewWord, WordType};
    use crate::services::testing::harness;
    use crate::session::Session;

    /// Accepts writes only through `commit`.
    struct BatchOnlyStore(MemoryStore);

    #[async_trait]
    impl DocumentStore for BatchOnlyStore {
        async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
            self.0.query(query).await
        }

        async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
            self.0.get(collection, id).await
        }

        async fn add(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
            self.0.add(collection, fields).await
        }

        async fn set(
            &self,
            collection: &str,
            id: &str,
            fields: Fields,
            merge: bool,
        ) -> Result<(), StoreError> {
            self.0.set(collection, id, fields, merge).await
        }

        async fn update(
            &self,
            collection: &str,
            id: &str,
            fields: Fields,
        ) -> Result<(), StoreError> {
            self.0.update(collection, id, fields).await
        }

        async fn delete(&self, _collection: &str, _id: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("single deletes are disabled".to_string()))
        }

        async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
            self.0.commit(batch).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.0.ping().await
        }

        fn backend_name(&self) -> &'static str {
            "batch-only"
        }
    }

    fn german() -> NewLanguage {
        NewLanguage {
            name: " German ".into(),
            code: "de".into(),
        }
    }

    #[tokio::test]
    async fn adding_provisions_level_and_statistics() {
        let h = harness().await;
        let language = add_language(&h.ctx, "user-2", &german()).await.unwrap();
        assert_eq!(language.name, "German");

        let session = Session::new("user-2").with_language(language.id.clone());
        let level = levels::find_level(&h.ctx, &session).await.unwrap().unwrap();
        assert_eq!(level.level, 1);
        let stats = statistics::find_statistics(&h.ctx, &session)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.words_learned, 0);
        assert_eq!(list_languages(&h.ctx, "user-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_cascades_to_language_data() {
        let h = harness().await;
        let language = add_language(&h.ctx, "user-2", &german()).await.unwrap();
        let session = Session::new("user-2").with_language(language.id.clone());
        dictionary::add_if_absent(
            &h.ctx,
            &session,
            &NewWord {
                word: "Haus".into(),
                meaning: "house".into(),
                example: String::new(),
                word_type: WordType::Word,
                level: None,
            },
        )
        .await
        .unwrap();

        let (levels_before, stats_before) = (h.store.len(LEVEL), h.store.len(STATISTICS));
        delete_language(&h.ctx, "user-2", &language.id).await.unwrap();

        assert_eq!(h.store.len(DICTIONARY), 0);
        assert_eq!(h.store.len(LEVEL), levels_before - 1);
        assert_eq!(h.store.len(STATISTICS), stats_before - 1);
        assert!(list_languages(&h.ctx, "user-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_commits_a_single_batch() {
        let store = Arc::new(BatchOnlyStore(MemoryStore::new()));
        let ctx = ServiceContext::new(store.clone());
        let language = add_language(&ctx, "user-2", &german()).await.unwrap();

        delete_language(&ctx, "user-2", &language.id).await.unwrap();

        assert_eq!(store.0.len(LEVEL), 0);
        assert_eq!(store.0.len(STATISTICS), 0);
        assert_eq!(store.0.len(LANGUAGES), 0);
    }

    #[tokio::test]
    async fn other_users_cannot_touch_a_language() {
        let h = harness().await;
        let language = add_language(&h.ctx, "user-2", &german()).await.unwrap();
        let err = delete_language(&h.ctx, "user-3", &language.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        let update = LanguageUpdate {
            name: Some("Deutsch".into()),
            code: None,
        };
        let renamed = update_language(&h.ctx, "user-2", &language.id, &update)
            .await
            .unwrap();
        assert_eq!(renamed.name, "Deutsch");
        assert_eq!(renamed.code, "de");
    }
}
