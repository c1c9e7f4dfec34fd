use super::{DocumentStore, StoreError, StoreResult};
use crate::document::{DocValue, Document};
use async_trait::async_trait;
use ehr_uuid::RecordId;
use indexmap::IndexMap;
use tokio::sync::RwLock;

/// In-memory document store.
///
/// Documents are kept in insertion order, which is the order `list` pages through. Deleting a
/// record keeps the relative order of the rest.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<IndexMap<RecordId, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, id: RecordId, doc: Document) -> StoreResult<()> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(&id) {
            return Err(StoreError::conflict(format!("record {id} already exists")));
        }
        docs.insert(id, doc);
        Ok(())
    }

    async fn get(&self, id: &RecordId) -> StoreResult<Option<Document>> {
        Ok(self.docs.read().await.get(id).cloned())
    }

    async fn find_one(&self, field: &str, value: &DocValue) -> StoreResult<Option<Document>> {
        let docs = self.docs.read().await;
        Ok(docs
            .values()
            .find(|doc| doc.get(field) == Some(value))
            .cloned())
    }

    async fn list(&self, skip: usize, limit: usize) -> StoreResult<Vec<Document>> {
        let docs = self.docs.read().await;
        Ok(docs.values().skip(skip).take(limit).cloned().collect())
    }

    async fn replace(&self, id: &RecordId, doc: Document) -> StoreResult<bool> {
        let mut docs = self.docs.write().await;
        match docs.get_mut(id) {
            Some(slot) => {
                *slot = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &RecordId) -> StoreResult<bool> {
        Ok(self.docs.write().await.shift_remove(id).is_some())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
