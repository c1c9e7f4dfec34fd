//! Record identifiers, sharded paths and record timestamps.
//!
//! Every patient record is keyed by a system-generated UUID. To keep lookups, URLs and on-disk
//! paths consistent, EHR uses a single *canonical* textual form for that identifier:
//! **the 36-character lowercase hyphenated form**.
//!
//! ## Canonical identifier form
//! - Length: 36
//! - Groups: `8-4-4-4-12` hex characters separated by `-`
//! - Characters: `0-9`, `a-f` and the four hyphens only
//! - Example: `550e8400-e29b-41d4-a716-446655440000`
//!
//! This is what `Uuid::new_v4().hyphenated().to_string()` produces. Externally supplied
//! identifiers (URL paths, gRPC requests, CLI arguments) must already be canonical; uppercase,
//! braced, URN or simple (unhyphenated) forms are rejected rather than normalised, so one record
//! never has two spellings.
//!
//! ## Sharded directory layout
//! For an identifier `u` with simple (unhyphenated) form `s`, file-backed storage places the
//! record under:
//! `parent_dir/<s[0..2]>/<s[2..4]>/<u>/`
//!
//! Example:
//! `patient_data/patients/55/0e/550e8400-e29b-41d4-a716-446655440000/`

mod service;

// Re-export public types
pub use service::{next_timestamp, RecordId, Uuid};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
