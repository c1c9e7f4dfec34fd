use crate::store::StoreError;
use crate::translator::TranslateError;

/// Outcome of a failed patient operation.
///
/// The first three variants are caller errors and carry messages that are safe to return over
/// the wire. `Schema` and `Store` are internal failures; transports must log them and answer
/// with a generic message instead.
#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Patient with patient_id '{0}' already exists")]
    DuplicatePatientId(String),
    #[error("Patient not found: {0}")]
    NotFound(String),
    #[error("record translation failed: {0}")]
    Schema(#[from] TranslateError),
    #[error("document store failure: {0}")]
    Store(#[from] StoreError),
}

impl PatientError {
    /// True for failures caused by the server rather than the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Schema(_) | Self::Store(_))
    }
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;
