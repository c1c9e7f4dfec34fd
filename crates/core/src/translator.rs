//! Record translation between RPC messages and stored documents.
//!
//! Two wire schemas reach the service:
//! - the *flat* schema, [`pb::PatientMessage`], with typed fields and a blood-type ordinal;
//! - the *flexible* schema, a `google.protobuf.Struct` carrying the same field names with
//!   generic values and a blood-type label.
//!
//! Both translate into a [`Document`]; the flat direction also has an inverse, which is what
//! every RPC response is built from. For any representable record,
//! `from_document(&to_document(m)) == m` and
//! `document_to_struct(&struct_to_document(s)?) == s`.

use crate::constants::{
    ALLERGIES_KEY, BIRTH_DATE_KEY, BLOOD_TYPE_KEY, CONDITIONS_KEY, CREATED_AT_KEY, DIAGNOSIS_KEY,
    HEIGHT_KEY, ID_KEY, METADATA_KEY, NAME_KEY, PATIENT_ID_KEY, UPDATED_AT_KEY, WEIGHT_KEY,
};
use crate::document::{DocValue, Document};
use crate::pb::{self, BloodType};
use api_shared::json::MAX_SAFE_INTEGER;
use prost_types::value::Kind;
use prost_types::{ListValue, Struct, Value};

/// A document or struct whose shape does not match the patient schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslateError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' must be {expected}, found {found}")]
    WrongKind {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("field '{field}' value {value} is out of range")]
    OutOfRange { field: &'static str, value: i64 },
}

impl TranslateError {
    fn wrong_kind(field: impl Into<String>, expected: &'static str, found: &DocValue) -> Self {
        Self::WrongKind {
            field: field.into(),
            expected,
            found: found.kind_name(),
        }
    }
}

pub type TranslateResult<T> = Result<T, TranslateError>;

// ---------------------------------------------------------------------------------------------
// Flat schema
// ---------------------------------------------------------------------------------------------

/// Translates a flat patient message into a document.
///
/// Empty `id`, `created_at` and `updated_at` are treated as absent. `metadata` is only
/// written when the message carries one.
pub fn to_document(message: &pb::PatientMessage) -> Document {
    let mut doc = Document::new();

    if !message.id.is_empty() {
        doc.insert(ID_KEY.into(), DocValue::String(message.id.clone()));
    }
    doc.insert(
        PATIENT_ID_KEY.into(),
        DocValue::String(message.patient_id.clone()),
    );
    doc.insert(NAME_KEY.into(), DocValue::String(message.name.clone()));
    doc.insert(
        BIRTH_DATE_KEY.into(),
        DocValue::from_text(&message.birth_date),
    );
    if let Some(height) = message.height {
        doc.insert(HEIGHT_KEY.into(), DocValue::Int(height.into()));
    }
    if let Some(weight) = message.weight {
        doc.insert(WEIGHT_KEY.into(), DocValue::Int(weight.into()));
    }
    doc.insert(
        BLOOD_TYPE_KEY.into(),
        DocValue::String(BloodType::from_ordinal(message.blood_type).label().into()),
    );
    doc.insert(
        DIAGNOSIS_KEY.into(),
        DocValue::String(message.diagnosis.clone()),
    );
    doc.insert(CONDITIONS_KEY.into(), structs_to_list(&message.conditions));
    doc.insert(ALLERGIES_KEY.into(), structs_to_list(&message.allergies));
    if let Some(metadata) = &message.metadata {
        doc.insert(METADATA_KEY.into(), DocValue::Map(fields_to_document(metadata)));
    }
    if !message.created_at.is_empty() {
        doc.insert(
            CREATED_AT_KEY.into(),
            DocValue::from_text(&message.created_at),
        );
    }
    if !message.updated_at.is_empty() {
        doc.insert(
            UPDATED_AT_KEY.into(),
            DocValue::from_text(&message.updated_at),
        );
    }

    doc
}

/// Translates a document back into a flat patient message.
///
/// # Errors
///
/// Returns [`TranslateError`] if `patient_id`, `name` or `birth_date` is missing, or any field
/// holds a value of the wrong kind.
pub fn from_document(doc: &Document) -> TranslateResult<pb::PatientMessage> {
    Ok(pb::PatientMessage {
        id: optional_text(doc, ID_KEY)?.unwrap_or_default(),
        patient_id: required_text(doc, PATIENT_ID_KEY)?,
        name: required_text(doc, NAME_KEY)?,
        birth_date: required_text(doc, BIRTH_DATE_KEY)?,
        height: optional_int32(doc, HEIGHT_KEY)?,
        weight: optional_int32(doc, WEIGHT_KEY)?,
        blood_type: optional_text(doc, BLOOD_TYPE_KEY)?
            .map(|label| BloodType::from_label_or_unspecified(&label))
            .unwrap_or(BloodType::Unspecified) as i32,
        diagnosis: optional_text(doc, DIAGNOSIS_KEY)?.unwrap_or_default(),
        conditions: list_to_structs(doc, CONDITIONS_KEY)?,
        allergies: list_to_structs(doc, ALLERGIES_KEY)?,
        metadata: match doc.get(METADATA_KEY) {
            None => None,
            Some(DocValue::Map(m)) => Some(document_to_struct(m)),
            Some(other) => return Err(TranslateError::wrong_kind(METADATA_KEY, "a map", other)),
        },
        created_at: optional_text(doc, CREATED_AT_KEY)?.unwrap_or_default(),
        updated_at: optional_text(doc, UPDATED_AT_KEY)?.unwrap_or_default(),
    })
}

/// Translates a typed change set into a document holding only the fields that are present.
pub fn patch_to_document(patch: &pb::PatientPatch) -> Document {
    let mut doc = Document::new();

    if let Some(name) = &patch.name {
        doc.insert(NAME_KEY.into(), DocValue::String(name.clone()));
    }
    if let Some(birth_date) = &patch.birth_date {
        doc.insert(BIRTH_DATE_KEY.into(), DocValue::from_text(birth_date));
    }
    if let Some(height) = patch.height {
        doc.insert(HEIGHT_KEY.into(), DocValue::Int(height.into()));
    }
    if let Some(weight) = patch.weight {
        doc.insert(WEIGHT_KEY.into(), DocValue::Int(weight.into()));
    }
    if let Some(ordinal) = patch.blood_type {
        doc.insert(
            BLOOD_TYPE_KEY.into(),
            DocValue::String(BloodType::from_ordinal(ordinal).label().into()),
        );
    }
    if let Some(diagnosis) = &patch.diagnosis {
        doc.insert(DIAGNOSIS_KEY.into(), DocValue::String(diagnosis.clone()));
    }
    if let Some(conditions) = &patch.conditions {
        doc.insert(CONDITIONS_KEY.into(), structs_to_list(&conditions.entries));
    }
    if let Some(allergies) = &patch.allergies {
        doc.insert(ALLERGIES_KEY.into(), structs_to_list(&allergies.entries));
    }
    if let Some(metadata) = &patch.metadata {
        doc.insert(METADATA_KEY.into(), DocValue::Map(fields_to_document(metadata)));
    }

    doc
}

fn required_text(doc: &Document, key: &'static str) -> TranslateResult<String> {
    optional_text(doc, key)?.ok_or(TranslateError::MissingField(key))
}

/// Strings verbatim, dates and timestamps rendered to ISO-8601.
fn optional_text(doc: &Document, key: &'static str) -> TranslateResult<Option<String>> {
    match doc.get(key) {
        None => Ok(None),
        Some(DocValue::String(s)) => Ok(Some(s.clone())),
        Some(v @ (DocValue::Date(_) | DocValue::DateTime(_))) => Ok(v.render_temporal()),
        Some(other) => Err(TranslateError::wrong_kind(key, "a string", other)),
    }
}

fn optional_int32(doc: &Document, key: &'static str) -> TranslateResult<Option<i32>> {
    match doc.get(key) {
        None | Some(DocValue::Null) => Ok(None),
        Some(DocValue::Int(n)) => i32::try_from(*n)
            .map(Some)
            .map_err(|_| TranslateError::OutOfRange {
                field: key,
                value: *n,
            }),
        Some(other) => Err(TranslateError::wrong_kind(key, "an integer", other)),
    }
}

fn structs_to_list(structs: &[Struct]) -> DocValue {
    DocValue::List(
        structs
            .iter()
            .map(|s| DocValue::Map(fields_to_document(s)))
            .collect(),
    )
}

fn list_to_structs(doc: &Document, key: &'static str) -> TranslateResult<Vec<Struct>> {
    match doc.get(key) {
        None => Ok(Vec::new()),
        Some(DocValue::List(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                DocValue::Map(m) => Ok(document_to_struct(m)),
                other => Err(TranslateError::wrong_kind(format!("{key}[{i}]"), "a map", other)),
            })
            .collect(),
        Some(other) => Err(TranslateError::wrong_kind(key, "a list of maps", other)),
    }
}

// ---------------------------------------------------------------------------------------------
// Flexible schema
// ---------------------------------------------------------------------------------------------

/// Translates a generic struct into a document.
///
/// # Errors
///
/// Returns [`TranslateError::WrongKind`] if `conditions` or `allergies` is present but not a
/// list of maps, or `metadata` is present but not a map.
pub fn struct_to_document(s: &Struct) -> TranslateResult<Document> {
    let doc: Document = s
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), top_level_value(k, v)))
        .collect();

    for key in [CONDITIONS_KEY, ALLERGIES_KEY] {
        if let Some(value) = doc.get(key) {
            if !value.is_list_of_maps() {
                return Err(TranslateError::wrong_kind(key, "a list of maps", value));
            }
        }
    }
    if let Some(value) = doc.get(METADATA_KEY) {
        if !matches!(value, DocValue::Map(_)) {
            return Err(TranslateError::wrong_kind(METADATA_KEY, "a map", value));
        }
    }

    Ok(doc)
}

/// Inverse of [`struct_to_document`]; dates and timestamps become ISO-8601 strings.
pub fn document_to_struct(doc: &Document) -> Struct {
    Struct {
        fields: doc
            .iter()
            .map(|(k, v)| (k.clone(), doc_to_value(v)))
            .collect(),
    }
}

/// Top-level strings are kept verbatim except `birth_date`, so free text that happens to look
/// like a date stays text. Values nested in collections are promoted as usual.
fn top_level_value(key: &str, value: &Value) -> DocValue {
    match &value.kind {
        Some(Kind::StringValue(s)) if key != BIRTH_DATE_KEY => DocValue::String(s.clone()),
        _ => value_to_doc(value),
    }
}

fn fields_to_document(s: &Struct) -> Document {
    // prost maps are BTreeMaps, so field order here is key order.
    s.fields
        .iter()
        .map(|(k, v)| (k.clone(), value_to_doc(v)))
        .collect()
}

/// Converts a generic value. Integral numbers below 2^53 in magnitude become `Int`.
pub fn value_to_doc(value: &Value) -> DocValue {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => DocValue::Null,
        Some(Kind::BoolValue(b)) => DocValue::Bool(*b),
        Some(Kind::NumberValue(n)) => {
            if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
                DocValue::Int(*n as i64)
            } else {
                DocValue::Float(*n)
            }
        }
        Some(Kind::StringValue(s)) => DocValue::from_text(s),
        Some(Kind::ListValue(list)) => DocValue::List(list.values.iter().map(value_to_doc).collect()),
        Some(Kind::StructValue(s)) => DocValue::Map(fields_to_document(s)),
    }
}

/// Inverse of [`value_to_doc`].
pub fn doc_to_value(value: &DocValue) -> Value {
    let kind = match value {
        DocValue::Null => Kind::NullValue(0),
        DocValue::Bool(b) => Kind::BoolValue(*b),
        DocValue::Int(n) => Kind::NumberValue(*n as f64),
        DocValue::Float(n) => Kind::NumberValue(*n),
        DocValue::String(s) => Kind::StringValue(s.clone()),
        DocValue::Date(_) | DocValue::DateTime(_) => {
            Kind::StringValue(value.render_temporal().unwrap_or_default())
        }
        DocValue::List(items) => Kind::ListValue(ListValue {
            values: items.iter().map(doc_to_value).collect(),
        }),
        DocValue::Map(m) => Kind::StructValue(document_to_struct(m)),
    };
    Value { kind: Some(kind) }
}
