//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{DEFAULT_PAGE_LIMIT, DEFAULT_PATIENT_DATA_DIR, PATIENTS_DIR_NAME};
use crate::store::{DocumentStore, FileStore, MemoryStore};
use crate::{PatientError, PatientResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Which [`DocumentStore`] implementation backs the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Process-local store; contents are lost on restart.
    #[default]
    Memory,
    /// One JSON document per record under the patient data directory.
    File,
}

impl FromStr for StorageBackend {
    type Err = PatientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(PatientError::InvalidInput(format!(
                "unknown storage backend '{other}' (expected 'memory' or 'file')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    patient_data_dir: PathBuf,
    storage: StorageBackend,
    default_page_limit: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            patient_data_dir: PathBuf::from(DEFAULT_PATIENT_DATA_DIR),
            storage: StorageBackend::Memory,
            default_page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::InvalidInput`] if `default_page_limit` is zero, since a zero
    /// limit is how callers ask for the default in the first place.
    pub fn new(
        patient_data_dir: PathBuf,
        storage: StorageBackend,
        default_page_limit: u32,
    ) -> PatientResult<Self> {
        if default_page_limit == 0 {
            return Err(PatientError::InvalidInput(
                "default page limit must be greater than zero".into(),
            ));
        }

        Ok(Self {
            patient_data_dir,
            storage,
            default_page_limit,
        })
    }

    /// Builds a config from raw environment values without reading the environment itself.
    ///
    /// Callers pass `std::env::var(..).ok()` for `PATIENT_DATA_DIR`, `EHR_STORAGE` and
    /// `EHR_DEFAULT_PAGE_LIMIT`; `None` selects the default for that setting.
    pub fn from_env_values(
        patient_data_dir: Option<String>,
        storage: Option<String>,
        default_page_limit: Option<String>,
    ) -> PatientResult<Self> {
        let patient_data_dir =
            PathBuf::from(patient_data_dir.unwrap_or_else(|| DEFAULT_PATIENT_DATA_DIR.into()));
        let storage = match storage {
            Some(value) => value.parse()?,
            None => StorageBackend::default(),
        };
        let default_page_limit = match default_page_limit {
            Some(value) => value.trim().parse::<u32>().map_err(|_| {
                PatientError::InvalidInput(format!(
                    "EHR_DEFAULT_PAGE_LIMIT must be a positive integer, got '{value}'"
                ))
            })?,
            None => DEFAULT_PAGE_LIMIT,
        };

        Self::new(patient_data_dir, storage, default_page_limit)
    }

    pub fn patient_data_dir(&self) -> &Path {
        &self.patient_data_dir
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.patient_data_dir.join(PATIENTS_DIR_NAME)
    }

    pub fn storage(&self) -> StorageBackend {
        self.storage
    }

    pub fn default_page_limit(&self) -> u32 {
        self.default_page_limit
    }

    /// Builds the document store selected by this configuration.
    pub fn build_store(&self) -> Arc<dyn DocumentStore> {
        match self.storage {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => Arc::new(FileStore::new(self.patients_dir())),
        }
    }
}
