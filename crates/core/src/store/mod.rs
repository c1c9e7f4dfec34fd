//! Document storage backends.
//!
//! A [`DocumentStore`] persists patient documents keyed by their internal [`RecordId`]. Stores
//! are deliberately dumb: they enforce no uniqueness on any field and apply no business rules.
//! Those belong to [`crate::PatientService`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::document::{DocValue, Document};
use async_trait::async_trait;
use ehr_uuid::RecordId;
use std::path::{Path, PathBuf};

/// Failure inside a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt document at {path}: {reason}", path = path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Create an `Io` error for `path`.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a `Corrupt` error for `path`.
    pub fn corrupt(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create a `Conflict` error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for patient documents.
///
/// Every stored document carries its identifier under `_id`; implementations trust the caller
/// to keep that in sync with the `id` argument.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores a new document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if a document with `id` already exists.
    async fn insert(&self, id: RecordId, doc: Document) -> StoreResult<()>;

    /// Fetches a document by identifier.
    async fn get(&self, id: &RecordId) -> StoreResult<Option<Document>>;

    /// Returns the first document whose top-level `field` equals `value`.
    async fn find_one(&self, field: &str, value: &DocValue) -> StoreResult<Option<Document>>;

    /// Returns up to `limit` documents after skipping `skip`, in the backend's default order.
    async fn list(&self, skip: usize, limit: usize) -> StoreResult<Vec<Document>>;

    /// Replaces an existing document. Returns `false` if there was nothing to replace.
    async fn replace(&self, id: &RecordId, doc: Document) -> StoreResult<bool>;

    /// Removes a document. Returns `false` if it did not exist.
    async fn delete(&self, id: &RecordId) -> StoreResult<bool>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
