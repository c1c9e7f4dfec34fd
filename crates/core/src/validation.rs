//! Input validation for patient documents.
//!
//! Translation only guarantees a document has the right *shape*. The functions here enforce the
//! field rules (required fields, lengths, positive measurements, known blood-type labels) and
//! return a normalised copy: names and identifiers are trimmed, and nothing else is altered.

use crate::constants::{
    ALLERGIES_KEY, BIRTH_DATE_KEY, BLOOD_TYPE_KEY, CONDITIONS_KEY, DIAGNOSIS_KEY, HEIGHT_KEY,
    IMMUTABLE_FIELDS, MAX_DIAGNOSIS_LEN, MAX_NAME_LEN, METADATA_KEY, MUTABLE_FIELDS, NAME_KEY,
    PATIENT_ID_KEY, WEIGHT_KEY,
};
use crate::document::{DocValue, Document};
use crate::pb::BloodType;
use crate::{PatientError, PatientResult, UpdateMode};
use api_shared::blood_type::{LABELS, UNSPECIFIED_LABEL};
use ehr_types::{check_max_len, NonEmptyText, TextError};

fn invalid(message: impl Into<String>) -> PatientError {
    PatientError::InvalidInput(message.into())
}

fn text_error(field: &str, err: TextError) -> PatientError {
    match err {
        TextError::Empty => invalid(format!("{field} cannot be empty")),
        TextError::TooLong { max } => {
            invalid(format!("{field} exceeds maximum length of {max} characters"))
        }
    }
}

/// Validates the fields of a record about to be created.
///
/// `patient_id`, `name` and `birth_date` are required. The service-owned keys (`_id`,
/// `created_at`, `updated_at`) must already have been stripped by the caller.
///
/// # Errors
///
/// Returns [`PatientError::InvalidInput`] naming the first offending field.
pub fn validate_new_record(doc: Document) -> PatientResult<Document> {
    let mut out = Document::new();

    for (key, value) in doc {
        let value = if key == PATIENT_ID_KEY {
            validate_patient_id(&value)?
        } else if MUTABLE_FIELDS.contains(&key.as_str()) {
            validate_field(&key, value)?
        } else {
            return Err(invalid(format!("unknown field '{key}'")));
        };
        if value != DocValue::Null {
            out.insert(key, value);
        }
    }

    for required in [PATIENT_ID_KEY, NAME_KEY, BIRTH_DATE_KEY] {
        if !out.contains_key(required) {
            return Err(invalid(format!("{required} is required")));
        }
    }

    Ok(out)
}

/// Validates a change set for an existing record.
///
/// In [`UpdateMode::Partial`] a `null` height or weight is kept as `Null` and means "clear".
/// In [`UpdateMode::Full`] `name` and `birth_date` are required and nulls are dropped, since an
/// absent optional field is reset anyway.
///
/// # Errors
///
/// Returns [`PatientError::InvalidInput`] for immutable or unknown keys and for field values
/// that break the field rules.
pub fn validate_changes(changes: Document, mode: UpdateMode) -> PatientResult<Document> {
    let mut out = Document::new();

    for (key, value) in changes {
        if IMMUTABLE_FIELDS.contains(&key.as_str()) {
            return Err(invalid(format!("{key} cannot be modified")));
        }
        if !MUTABLE_FIELDS.contains(&key.as_str()) {
            return Err(invalid(format!("unknown field '{key}'")));
        }
        let value = validate_field(&key, value)?;
        if value == DocValue::Null && mode == UpdateMode::Full {
            continue;
        }
        out.insert(key, value);
    }

    if mode == UpdateMode::Full {
        for required in [NAME_KEY, BIRTH_DATE_KEY] {
            if !out.contains_key(required) {
                return Err(invalid(format!(
                    "{required} is required when replacing a patient"
                )));
            }
        }
    }

    Ok(out)
}

/// Fills in defaults for optional fields that are absent.
///
/// `height` and `weight` have no default and stay absent.
pub fn apply_defaults(doc: &mut Document) {
    for key in MUTABLE_FIELDS {
        if doc.contains_key(key) {
            continue;
        }
        if let Some(value) = default_value(key) {
            doc.insert(key.to_owned(), value);
        }
    }
}

/// Default for an optional mutable field; `None` for fields without one.
pub fn default_value(key: &str) -> Option<DocValue> {
    match key {
        BLOOD_TYPE_KEY => Some(DocValue::String(UNSPECIFIED_LABEL.into())),
        DIAGNOSIS_KEY => Some(DocValue::String(String::new())),
        CONDITIONS_KEY | ALLERGIES_KEY => Some(DocValue::List(Vec::new())),
        METADATA_KEY => Some(DocValue::Map(Document::new())),
        _ => None,
    }
}

fn validate_patient_id(value: &DocValue) -> PatientResult<DocValue> {
    match value {
        DocValue::String(s) => NonEmptyText::new(s)
            .map(|t| DocValue::String(t.into_inner()))
            .map_err(|e| text_error(PATIENT_ID_KEY, e)),
        DocValue::Null => Err(invalid("patient_id is required")),
        other => Err(invalid(format!(
            "patient_id must be a string, got {}",
            other.kind_name()
        ))),
    }
}

/// Checks one mutable field. A `Null` height or weight passes through for the caller to interpret.
fn validate_field(key: &str, value: DocValue) -> PatientResult<DocValue> {
    match (key, value) {
        (HEIGHT_KEY | WEIGHT_KEY, DocValue::Null) => Ok(DocValue::Null),
        (_, DocValue::Null) => Err(invalid(format!("{key} cannot be null"))),

        (NAME_KEY, DocValue::String(s)) => NonEmptyText::bounded(&s, MAX_NAME_LEN)
            .map(|t| DocValue::String(t.into_inner()))
            .map_err(|e| text_error(NAME_KEY, e)),

        (BIRTH_DATE_KEY, v @ DocValue::Date(_)) => Ok(v),
        (BIRTH_DATE_KEY, _) => Err(invalid(
            "birth_date must be an ISO-8601 calendar date (YYYY-MM-DD)",
        )),

        (HEIGHT_KEY | WEIGHT_KEY, DocValue::Int(n)) => {
            if n <= 0 {
                Err(invalid(format!("{key} must be greater than 0")))
            } else if n > i64::from(i32::MAX) {
                Err(invalid(format!("{key} is out of range")))
            } else {
                Ok(DocValue::Int(n))
            }
        }
        (HEIGHT_KEY | WEIGHT_KEY, _) => Err(invalid(format!("{key} must be an integer"))),

        (BLOOD_TYPE_KEY, DocValue::String(label)) => match BloodType::from_label(&label) {
            Some(_) => Ok(DocValue::String(label)),
            None => Err(invalid(format!(
                "blood_type must be one of: {}",
                LABELS.join(", ")
            ))),
        },

        (DIAGNOSIS_KEY, DocValue::String(s)) => check_max_len(&s, MAX_DIAGNOSIS_LEN)
            .map(|()| DocValue::String(s))
            .map_err(|e| text_error(DIAGNOSIS_KEY, e)),

        (CONDITIONS_KEY | ALLERGIES_KEY, v) if v.is_list_of_maps() => Ok(v),
        (CONDITIONS_KEY | ALLERGIES_KEY, _) => {
            Err(invalid(format!("{key} must be a list of objects")))
        }

        (METADATA_KEY, v @ DocValue::Map(_)) => Ok(v),
        (METADATA_KEY, _) => Err(invalid("metadata must be an object")),

        (_, other) => Err(invalid(format!(
            "{key} has an invalid value of kind {}",
            other.kind_name()
        ))),
    }
}
