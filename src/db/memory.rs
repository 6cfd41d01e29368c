use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::{
    new_document_id, BatchOp, Document, DocumentStore, Fields, Query, StoreError, WriteBatch,
};

#[derive(Debug, Clone)]
struct StoredDocument {
    seq: u64,
    fields: Fields,
}

type Collections = HashMap<String, HashMap<String, StoredDocument>>;

/// Process-local document store. Query results come back in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    next_seq: AtomicU64,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn apply(&self, collections: &mut Collections, op: BatchOp) {
        match op {
            BatchOp::Update {
                collection,
                id,
                fields,
            } => {
                if let Some(existing) = collections
                    .get_mut(&collection)
                    .and_then(|docs| docs.get_mut(&id))
                {
                    existing.fields.extend(fields);
                }
            }
            BatchOp::Delete { collection, id } => {
                if let Some(docs) = collections.get_mut(&collection) {
                    docs.remove(&id);
                }
            }
        }
    }
}

fn exists(collections: &Collections, collection: &str, id: &str) -> bool {
    collections
        .get(collection)
        .is_some_and(|docs| docs.contains_key(id))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        let collections = self.collections.read();
        let Some(docs) = collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<(&String, &StoredDocument)> = docs
            .iter()
            .filter(|(_, doc)| query.matches(&doc.fields))
            .collect();
        hits.sort_by_key(|(_, doc)| doc.seq);

        Ok(hits
            .into_iter()
            .map(|(id, doc)| Document::new(id.clone(), doc.fields.clone()))
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_online()?;
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| Document::new(id, doc.fields.clone())))
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        self.check_online()?;
        let id = new_document_id();
        let seq = self.seq();
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(
                id.clone(),
                StoredDocument {
                    seq,
                    fields: fields.clone(),
                },
            );
        Ok(Document::new(id, fields))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) if merge => existing.fields.extend(fields),
            Some(existing) => existing.fields = fields,
            None => {
                let seq = self.seq();
                docs.insert(id.to_string(), StoredDocument { seq, fields });
            }
        }
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, fields);
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_online()?;
        if let Some(docs) = self.collections.write().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.check_online()?;
        let mut collections = self.collections.write();

        for op in batch.ops() {
            if let BatchOp::Update { collection, id, .. } = op {
                if !exists(&collections, collection, id) {
                    return Err(StoreError::NotFound {
                        collection: collection.clone(),
                        id: id.clone(),
                    });
                }
            }
        }

        for op in batch.into_ops() {
            self.apply(&mut collections, op);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
