//! Internal implementation of record identifiers and timestamps.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Canonical internal identifier of a patient record (lowercase hyphenated UUID).
///
/// Once constructed, the contained UUID is guaranteed to display in canonical form, so it can
/// be used directly as a document key, a URL segment or a directory name.
///
/// # Construction
/// - [`RecordId::new`] generates a new random (v4) identifier.
/// - [`RecordId::parse`] validates an externally supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not a 36-character lowercase
    /// hyphenated UUID.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "record id must be a lowercase hyphenated UUID, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("invalid record id '{input}': {e}")))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// This is a purely syntactic check: 36 bytes, hyphens at offsets 8, 13, 18 and 23, and
    /// lowercase hex everywhere else.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 36
            && input.bytes().enumerate().all(|(i, b)| match i {
                8 | 13 | 18 | 23 => b == b'-',
                _ => matches!(b, b'0'..=b'9' | b'a'..=b'f'),
            })
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/` where `s1`/`s2` are the first four hex characters.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let simple = self.0.simple().to_string();
        let s1 = &simple[0..2];
        let s2 = &simple[2..4];
        parent_dir.join(s1).join(s2).join(self.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

/// Returns a record timestamp for "now", truncated to microseconds.
///
/// If `previous` is provided the result is strictly greater than it (by at least 1 µs), so a
/// record's `updated_at` advances on every mutation even when the wall clock has not moved or
/// has stepped backwards.
pub fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    let now = now
        .duration_trunc(Duration::microseconds(1))
        .unwrap_or(now);

    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = RecordId::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 36);
        assert!(RecordId::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_valid_canonical_id() {
        let canonical = "550e8400-e29b-41d4-a716-446655440000";
        let id = RecordId::parse(canonical).expect("canonical id");
        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_simple_form() {
        let simple = "550e8400e29b41d4a716446655440000";
        match RecordId::parse(simple) {
            Err(UuidError::InvalidInput(msg)) => {
                assert!(msg.contains("lowercase hyphenated UUID"));
            }
            other => panic!("Expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_uppercase() {
        assert!(RecordId::parse("550E8400-E29B-41D4-A716-446655440000").is_err());
    }

    #[test]
    fn test_parse_rejects_misplaced_hyphens_and_garbage() {
        assert!(RecordId::parse("550e8400e-29b-41d4-a716-446655440000").is_err());
        assert!(RecordId::parse("550e8400-e29b-41d4-a716-44665544zzzz").is_err());
        assert!(RecordId::parse("").is_err());
        assert!(RecordId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_sharded_dir_structure() {
        let id = RecordId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let dir = id.sharded_dir(Path::new("/patient_data/patients"));
        assert_eq!(
            dir,
            PathBuf::from("/patient_data/patients/55/0e/550e8400-e29b-41d4-a716-446655440000")
        );
    }

    #[test]
    fn test_from_str_matches_parse() {
        let id: RecordId = "00000000-0000-4000-8000-000000000001".parse().unwrap();
        assert_eq!(id.to_string(), "00000000-0000-4000-8000-000000000001");
    }

    #[test]
    fn test_next_timestamp_is_strictly_monotonic() {
        let far_future = Utc::now() + Duration::hours(1);
        let next = next_timestamp(Some(far_future));
        assert_eq!(next, far_future + Duration::microseconds(1));

        let first = next_timestamp(None);
        let second = next_timestamp(Some(first));
        assert!(second > first);
    }

    #[test]
    fn test_next_timestamp_has_microsecond_precision() {
        let ts = next_timestamp(None);
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000, 0);
    }
}
