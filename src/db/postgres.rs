use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use thiserror::Error;

use crate::db::config::{DbConfig, DbConfigError, HealthCheckConfig};
use crate::db::{
    new_document_id, BatchOp, DecodeError, Document, DocumentStore, Fields, Query, StoreError,
    WriteBatch,
};

const CREATE_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS "documents" (
    "collection" TEXT NOT NULL,
    "id" TEXT NOT NULL,
    "data" JSONB NOT NULL,
    "createdAt" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    "updatedAt" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY ("collection", "id")
)"#;

const CREATE_DATA_INDEX: &str =
    r#"CREATE INDEX IF NOT EXISTS "documents_data_idx" ON "documents" USING GIN ("data")"#;

/// Documents live in a single JSONB table keyed by (collection, id).
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    health_check: HealthCheckConfig,
}

impl PgDocumentStore {
    pub async fn from_env() -> Result<Arc<Self>, DbInitError> {
        let config = DbConfig::from_env()?;
        Self::connect(&config).await
    }

    pub async fn connect(config: &DbConfig) -> Result<Arc<Self>, DbInitError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool.max_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .connect(&config.primary_url)
            .await?;

        let store = Self {
            pool,
            health_check: config.health_check.clone(),
        };
        store.ensure_schema().await?;
        Ok(Arc::new(store))
    }

    async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_DOCUMENTS_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_DATA_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_document(row: &PgRow) -> Result<Document, StoreError> {
    let id: String = row.try_get("id")?;
    let Json(data): Json<Value> = row.try_get("data")?;
    match data {
        Value::Object(fields) => Ok(Document::new(id, fields)),
        other => Err(StoreError::Decode(DecodeError {
            id,
            reason: format!("stored data is not an object: {other}"),
        })),
    }
}

async fn apply_op(tx: &mut Transaction<'_, Postgres>, op: BatchOp) -> Result<(), StoreError> {
    match op {
        BatchOp::Update {
            collection,
            id,
            fields,
        } => {
            let result = sqlx::query(
                r#"UPDATE "documents" SET "data" = "data" || $3, "updatedAt" = NOW()
                   WHERE "collection" = $1 AND "id" = $2"#,
            )
            .bind(&collection)
            .bind(&id)
            .bind(Json(Value::Object(fields)))
            .execute(&mut **tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound { collection, id });
            }
        }
        BatchOp::Delete { collection, id } => {
            sqlx::query(r#"DELETE FROM "documents" WHERE "collection" = $1 AND "id" = $2"#)
                .bind(&collection)
                .bind(&id)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT "id","data" FROM "documents"
               WHERE "collection" = $1 AND "data" @> $2
               ORDER BY "createdAt" ASC, "id" ASC"#,
        )
        .bind(&query.collection)
        .bind(Json(query.filter_object()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(
            r#"SELECT "id","data" FROM "documents" WHERE "collection" = $1 AND "id" = $2"#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        let id = new_document_id();
        sqlx::query(r#"INSERT INTO "documents" ("collection","id","data") VALUES ($1,$2,$3)"#)
            .bind(collection)
            .bind(&id)
            .bind(Json(Value::Object(fields.clone())))
            .execute(&self.pool)
            .await?;
        Ok(Document::new(id, fields))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        let sql = if merge {
            r#"INSERT INTO "documents" ("collection","id","data")
               VALUES ($1,$2,$3)
               ON CONFLICT ("collection","id")
               DO UPDATE SET "data" = "documents"."data" || EXCLUDED."data", "updatedAt" = NOW()"#
        } else {
            r#"INSERT INTO "documents" ("collection","id","data")
               VALUES ($1,$2,$3)
               ON CONFLICT ("collection","id")
               DO UPDATE SET "data" = EXCLUDED."data", "updatedAt" = NOW()"#
        };
        sqlx::query(sql)
            .bind(collection)
            .bind(id)
            .bind(Json(Value::Object(fields)))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, fields);
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query(r#"DELETE FROM "documents" WHERE "collection" = $1 AND "id" = $2"#)
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for op in batch.into_ops() {
            // Dropping the transaction on error rolls it back.
            apply_op(&mut tx, op).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let timeout = self.health_check.timeout;
        match tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(&self.pool)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(StoreError::Sqlx(err)),
            Err(_) => Err(StoreError::Unavailable("timeout".to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Config(#[from] DbConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
