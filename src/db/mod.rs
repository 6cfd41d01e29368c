//! Document store abstraction.
//!
//! Every piece of persisted state lives in a named collection of JSON
//! documents. Operations are collection-scoped equality queries, single
//! document reads and writes, and atomic multi-document batches.

pub mod config;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

pub const WORDS: &str = "words";
pub const DICTIONARY: &str = "dictionary";
pub const LEVEL: &str = "level";
pub const STATISTICS: &str = "statistics";
pub const LANGUAGES: &str = "languages";
pub const USERS: &str = "users";

pub const USER_ID_FIELD: &str = "user_id";
pub const LANGUAGE_ID_FIELD: &str = "language_id";
pub const WORD_TYPE_FIELD: &str = "word_type";
pub const ACTIVE_FIELD: &str = "active";

pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Decodes the document into `T`, exposing the document id as the `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|source| DecodeError {
            id: self.id.clone(),
            reason: source.to_string(),
        })
    }
}

/// Serializes `value` into document fields. The `id` key is dropped since
/// ids live outside the document body.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, DecodeError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(mut fields)) => {
            fields.remove("id");
            Ok(fields)
        }
        Ok(other) => Err(DecodeError {
            id: String::new(),
            reason: format!("expected an object, got {other}"),
        }),
        Err(err) => Err(DecodeError {
            id: String::new(),
            reason: err.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(field, value));
        self
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|filter| filter.matches(fields))
    }

    /// Equality filters folded into one JSON object, usable as a containment probe.
    pub fn filter_object(&self) -> Value {
        let mut object = Map::new();
        for filter in &self.filters {
            object.insert(filter.field.clone(), filter.value.clone());
        }
        Value::Object(object)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
    Delete {
        collection: String,
        id: String,
    },
}

/// Writes applied all together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Fields) -> &mut Self {
        self.ops.push(BatchOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(BatchOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("document {id} could not be decoded: {reason}")]
pub struct DecodeError {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Creates a document under a freshly generated id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<Document, StoreError>;

    /// Creates or replaces a document. With `merge` the given fields are laid
    /// over an existing document instead of replacing it.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Merges fields into an existing document; a missing document is `NotFound`.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    fn backend_name(&self) -> &'static str;
}

pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
