use super::{DocumentStore, StoreError, StoreResult};
use crate::constants::{CREATED_AT_KEY, ID_KEY, PATIENT_JSON_FILENAME};
use crate::document::{DocValue, Document};
use async_trait::async_trait;
use ehr_uuid::RecordId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// File-backed document store.
///
/// Each record lives in its own sharded directory:
/// `<root>/<s1>/<s2>/<uuid>/patient.json`, where `s1`/`s2` are the first four hex characters
/// of the identifier. Writes go to a temporary file that is renamed into place, so readers
/// never see a half-written document. Listing order is `created_at`, then `_id`.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store rooted at `root`. Nothing is touched on disk until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_file(&self, id: &RecordId) -> PathBuf {
        id.sharded_dir(&self.root).join(PATIENT_JSON_FILENAME)
    }

    async fn read_document(path: &Path) -> StoreResult<Option<Document>> {
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::corrupt(path, e.to_string()))
    }

    async fn write_document(path: &Path, doc: &Document) -> StoreResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::io(dir, e))?;
        }
        let json = serde_json::to_vec_pretty(doc)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    /// Reads every record under the root, sorted into listing order.
    ///
    /// With `skip_unreadable`, bad entries are logged and skipped so one file cannot hide the
    /// others from a listing. Lookups pass `false`: a record that cannot be read might be the
    /// match, so the error is returned instead.
    async fn load_all(&self, skip_unreadable: bool) -> StoreResult<Vec<Document>> {
        let mut docs = Vec::new();

        for s1 in subdirs(&self.root).await? {
            for s2 in subdirs(&s1).await? {
                for record_dir in subdirs(&s2).await? {
                    let path = record_dir.join(PATIENT_JSON_FILENAME);
                    match Self::read_document(&path).await {
                        Ok(Some(doc)) => docs.push(doc),
                        Ok(None) => {}
                        Err(e) if skip_unreadable => {
                            tracing::warn!("skipping unreadable patient record: {e}")
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        docs.sort_by(|a, b| {
            let created = |d: &Document| d.get(CREATED_AT_KEY).and_then(DocValue::as_utc);
            let id = |d: &Document| {
                d.get(ID_KEY)
                    .and_then(DocValue::as_str)
                    .map(str::to_owned)
                    .unwrap_or_default()
            };
            created(a)
                .cmp(&created(b))
                .then_with(|| id(a).cmp(&id(b)))
        });

        Ok(docs)
    }
}

/// Lists the directories directly under `dir`; a missing `dir` has none.
async fn subdirs(dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut dirs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StoreError::io(dir, e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        if is_dir {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn insert(&self, id: RecordId, doc: Document) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.record_file(&id);
        if fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?
        {
            return Err(StoreError::conflict(format!("record {id} already exists")));
        }
        Self::write_document(&path, &doc).await
    }

    async fn get(&self, id: &RecordId) -> StoreResult<Option<Document>> {
        Self::read_document(&self.record_file(id)).await
    }

    async fn find_one(&self, field: &str, value: &DocValue) -> StoreResult<Option<Document>> {
        Ok(self
            .load_all(false)
            .await?
            .into_iter()
            .find(|doc| doc.get(field) == Some(value)))
    }

    async fn list(&self, skip: usize, limit: usize) -> StoreResult<Vec<Document>> {
        Ok(self
            .load_all(true)
            .await?
            .into_iter()
            .skip(skip)
            .take(limit)
            .collect())
    }

    async fn replace(&self, id: &RecordId, doc: Document) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let path = self.record_file(id);
        if !fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?
        {
            return Ok(false);
        }
        Self::write_document(&path, &doc).await?;
        Ok(true)
    }

    async fn delete(&self, id: &RecordId) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let dir = id.sharded_dir(&self.root);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&dir, e)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
