//! REST request and response bodies.
//!
//! Request bodies reject unknown fields and are checked by [`Validate`] before any RPC is made,
//! so malformed input never reaches the backend. Responses carry the blood type as its label
//! rather than the RPC ordinal.

use api_shared::json::{object_to_struct, struct_to_object};
use api_shared::pb::{self, BloodType};
use chrono::NaiveDate;
use ehr_types::{check_max_len, NonEmptyText, TextError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::error::GatewayError;

pub type JsonObject = Map<String, Value>;

const MAX_NAME_LEN: usize = 255;
const MAX_DIAGNOSIS_LEN: usize = 255;

/// Field rules checked at the gateway.
pub trait Validate {
    fn validate(&self) -> Result<(), GatewayError>;
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PatientCreate {
    #[schema(example = "P001")]
    pub patient_id: String,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "1990-01-15")]
    pub birth_date: String,
    /// Height in cm.
    #[schema(example = 175)]
    pub height: Option<i64>,
    /// Weight in kg.
    #[schema(example = 70)]
    pub weight: Option<i64>,
    #[schema(example = "A+")]
    pub blood_type: Option<String>,
    #[schema(example = "Healthy")]
    pub diagnosis: Option<String>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub conditions: Option<Vec<JsonObject>>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub allergies: Option<Vec<JsonObject>>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<JsonObject>,
}

impl Validate for PatientCreate {
    fn validate(&self) -> Result<(), GatewayError> {
        NonEmptyText::new(&self.patient_id).map_err(|e| text_error("patient_id", e))?;
        check_name(&self.name)?;
        check_birth_date(&self.birth_date)?;
        check_measurement("height", self.height)?;
        check_measurement("weight", self.weight)?;
        check_blood_type(self.blood_type.as_deref())?;
        check_diagnosis(self.diagnosis.as_deref())
    }
}

impl PatientCreate {
    /// Builds the flat RPC message. Call after [`Validate::validate`].
    pub fn into_message(self) -> pb::PatientMessage {
        pb::PatientMessage {
            patient_id: self.patient_id,
            name: self.name,
            birth_date: self.birth_date,
            height: self.height.and_then(|h| i32::try_from(h).ok()),
            weight: self.weight.and_then(|w| i32::try_from(w).ok()),
            blood_type: blood_ordinal(self.blood_type.as_deref()),
            diagnosis: self.diagnosis.unwrap_or_default(),
            conditions: to_structs(self.conditions),
            allergies: to_structs(self.allergies),
            metadata: self.metadata.as_ref().map(object_to_struct),
            ..Default::default()
        }
    }
}

/// Body of `PUT /patients/{uuid}`: the complete new state of the mutable fields.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PatientReplace {
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "1990-01-15")]
    pub birth_date: String,
    pub height: Option<i64>,
    pub weight: Option<i64>,
    pub blood_type: Option<String>,
    pub diagnosis: Option<String>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub conditions: Option<Vec<JsonObject>>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub allergies: Option<Vec<JsonObject>>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<JsonObject>,
}

impl Validate for PatientReplace {
    fn validate(&self) -> Result<(), GatewayError> {
        check_name(&self.name)?;
        check_birth_date(&self.birth_date)?;
        check_measurement("height", self.height)?;
        check_measurement("weight", self.weight)?;
        check_blood_type(self.blood_type.as_deref())?;
        check_diagnosis(self.diagnosis.as_deref())
    }
}

impl PatientReplace {
    /// Builds a typed patch; absent optional fields are reset by the backend in full mode.
    pub fn into_patch(self) -> pb::PatientPatch {
        pb::PatientPatch {
            name: Some(self.name),
            birth_date: Some(self.birth_date),
            height: self.height.and_then(|h| i32::try_from(h).ok()),
            weight: self.weight.and_then(|w| i32::try_from(w).ok()),
            blood_type: self
                .blood_type
                .as_deref()
                .map(|label| blood_ordinal(Some(label))),
            diagnosis: self.diagnosis,
            conditions: self.conditions.map(|entries| pb::ClinicalEntries {
                entries: to_structs(Some(entries)),
            }),
            allergies: self.allergies.map(|entries| pb::ClinicalEntries {
                entries: to_structs(Some(entries)),
            }),
            metadata: self.metadata.as_ref().map(object_to_struct),
        }
    }
}

/// Deserializes a field that distinguishes "absent" (`None`) from "null" (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `PATCH /patients/{uuid}`. Only present fields change; `null` clears height or weight.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PatientPatchBody {
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub birth_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>, nullable)]
    pub height: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>, nullable)]
    pub weight: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub blood_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub diagnosis: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub conditions: Option<Option<Vec<JsonObject>>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub allergies: Option<Option<Vec<JsonObject>>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Option<JsonObject>>,
}

fn non_null<'a, T>(field: &str, value: &'a Option<Option<T>>) -> Result<Option<&'a T>, GatewayError> {
    match value {
        None => Ok(None),
        Some(None) => Err(GatewayError::bad_request(format!("{field} cannot be null"))),
        Some(Some(v)) => Ok(Some(v)),
    }
}

impl Validate for PatientPatchBody {
    fn validate(&self) -> Result<(), GatewayError> {
        if let Some(name) = non_null("name", &self.name)? {
            check_name(name)?;
        }
        if let Some(birth_date) = non_null("birth_date", &self.birth_date)? {
            check_birth_date(birth_date)?;
        }
        check_measurement("height", self.height.flatten())?;
        check_measurement("weight", self.weight.flatten())?;
        check_blood_type(non_null("blood_type", &self.blood_type)?.map(String::as_str))?;
        check_diagnosis(non_null("diagnosis", &self.diagnosis)?.map(String::as_str))?;
        non_null("conditions", &self.conditions)?;
        non_null("allergies", &self.allergies)?;
        non_null("metadata", &self.metadata)?;
        Ok(())
    }
}

impl PatientPatchBody {
    /// Builds the flexible-schema change set; only present fields are included.
    pub fn into_struct(self) -> prost_types::Struct {
        let mut changes = JsonObject::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                changes.insert(key.to_owned(), value);
            }
        };

        put("name", self.name.map(Value::from));
        put("birth_date", self.birth_date.map(Value::from));
        put("height", self.height.map(Value::from));
        put("weight", self.weight.map(Value::from));
        put("blood_type", self.blood_type.map(Value::from));
        put("diagnosis", self.diagnosis.map(Value::from));
        put("conditions", self.conditions.map(list_value));
        put("allergies", self.allergies.map(list_value));
        put("metadata", self.metadata.map(|v| v.map(Value::Object).unwrap_or(Value::Null)));

        object_to_struct(&changes)
    }
}

fn list_value(entries: Option<Vec<JsonObject>>) -> Value {
    match entries {
        Some(entries) => Value::Array(entries.into_iter().map(Value::Object).collect()),
        None => Value::Null,
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Number of records to skip.
    #[param(default = 0, minimum = 0)]
    pub skip: Option<u64>,
    /// Maximum number of records to return.
    #[param(default = 100, minimum = 0)]
    pub limit: Option<u64>,
}

pub const DEFAULT_LIST_LIMIT: u32 = 100;

impl ListParams {
    /// Values past the RPC's `u32` range saturate rather than fail; there is no upper bound.
    pub fn skip(&self) -> u32 {
        self.skip.map(saturate).unwrap_or(0)
    }

    pub fn limit(&self) -> u32 {
        self.limit.map(saturate).unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[derive(Debug, Serialize, Deserialize, PartialEq, ToSchema)]
#[schema(example = json!({
    "id": "550e8400-e29b-41d4-a716-446655440000",
    "patient_id": "P001",
    "name": "John Doe",
    "birth_date": "1990-01-15",
    "height": 175,
    "weight": 70,
    "blood_type": "A+",
    "diagnosis": "Healthy",
    "conditions": [],
    "allergies": [],
    "metadata": {},
    "created_at": "2026-01-26T10:00:00Z",
    "updated_at": "2026-01-26T10:00:00Z"
}))]
pub struct PatientResponse {
    pub id: String,
    pub patient_id: String,
    pub name: String,
    pub birth_date: String,
    pub height: Option<i32>,
    pub weight: Option<i32>,
    pub blood_type: String,
    pub diagnosis: String,
    #[schema(value_type = Vec<Object>)]
    pub conditions: Vec<JsonObject>,
    #[schema(value_type = Vec<Object>)]
    pub allergies: Vec<JsonObject>,
    #[schema(value_type = Object)]
    pub metadata: JsonObject,
    pub created_at: String,
    pub updated_at: String,
}

impl From<pb::PatientMessage> for PatientResponse {
    fn from(message: pb::PatientMessage) -> Self {
        Self {
            blood_type: BloodType::from_ordinal(message.blood_type).label().to_owned(),
            conditions: message.conditions.iter().map(struct_to_object).collect(),
            allergies: message.allergies.iter().map(struct_to_object).collect(),
            metadata: message
                .metadata
                .as_ref()
                .map(struct_to_object)
                .unwrap_or_default(),
            id: message.id,
            patient_id: message.patient_id,
            name: message.name,
            birth_date: message.birth_date,
            height: message.height,
            weight: message.weight,
            diagnosis: message.diagnosis,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    #[schema(example = "Patient deleted successfully")]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    #[schema(example = "EHR API Gateway is running")]
    pub message: String,
    pub version: String,
    pub grpc_server: String,
}

fn text_error(field: &str, err: TextError) -> GatewayError {
    match err {
        TextError::Empty => GatewayError::bad_request(format!("{field} cannot be empty")),
        TextError::TooLong { max } => GatewayError::bad_request(format!(
            "{field} exceeds maximum length of {max} characters"
        )),
    }
}

fn check_name(name: &str) -> Result<(), GatewayError> {
    NonEmptyText::bounded(name, MAX_NAME_LEN)
        .map(|_| ())
        .map_err(|e| text_error("name", e))
}

fn check_birth_date(text: &str) -> Result<(), GatewayError> {
    let canonical = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string() == text)
        .unwrap_or(false);
    if canonical {
        Ok(())
    } else {
        Err(GatewayError::bad_request(format!(
            "birth_date must be a valid date in YYYY-MM-DD format, got '{text}'"
        )))
    }
}

fn check_measurement(field: &str, value: Option<i64>) -> Result<(), GatewayError> {
    match value {
        Some(v) if v <= 0 => Err(GatewayError::bad_request(format!(
            "{field} must be greater than 0"
        ))),
        Some(v) if v > i64::from(i32::MAX) => {
            Err(GatewayError::bad_request(format!("{field} is out of range")))
        }
        _ => Ok(()),
    }
}

fn check_blood_type(label: Option<&str>) -> Result<(), GatewayError> {
    match label {
        Some(label) if BloodType::from_label(label).is_none() => {
            Err(GatewayError::bad_request(format!(
                "blood_type must be one of: {}",
                api_shared::blood_type::LABELS.join(", ")
            )))
        }
        _ => Ok(()),
    }
}

fn check_diagnosis(diagnosis: Option<&str>) -> Result<(), GatewayError> {
    match diagnosis {
        Some(d) => check_max_len(d, MAX_DIAGNOSIS_LEN).map_err(|e| text_error("diagnosis", e)),
        None => Ok(()),
    }
}

fn blood_ordinal(label: Option<&str>) -> i32 {
    label
        .map(BloodType::from_label_or_unspecified)
        .unwrap_or(BloodType::Unspecified) as i32
}

fn to_structs(entries: Option<Vec<JsonObject>>) -> Vec<prost_types::Struct> {
    entries
        .unwrap_or_default()
        .iter()
        .map(object_to_struct)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_body(value: Value) -> Result<PatientCreate, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn create_body_validates_fields() {
        let ok = create_body(json!({
            "patient_id": "P001",
            "name": "John Doe",
            "birth_date": "1990-01-15",
            "height": 175,
            "blood_type": "A+"
        }))
        .unwrap();
        assert!(ok.validate().is_ok());

        let message = ok.into_message();
        assert_eq!(message.blood_type, BloodType::APositive as i32);
        assert_eq!(message.height, Some(175));
        assert_eq!(message.weight, None);

        for bad in [
            json!({"patient_id": "P1", "name": "", "birth_date": "1990-01-15"}),
            json!({"patient_id": "P1", "name": "A", "birth_date": "1990-13-01"}),
            json!({"patient_id": "P1", "name": "A", "birth_date": "1990-1-1"}),
            json!({"patient_id": "P1", "name": "A", "birth_date": "1990-01-15", "height": -1}),
            json!({"patient_id": "P1", "name": "A", "birth_date": "1990-01-15", "blood_type": "Q"}),
            json!({"patient_id": " ", "name": "A", "birth_date": "1990-01-15"}),
        ] {
            let body = create_body(bad.clone()).unwrap();
            assert!(body.validate().is_err(), "{bad}");
        }
    }

    #[test]
    fn create_body_rejects_unknown_fields() {
        let err = create_body(json!({
            "patient_id": "P1", "name": "A", "birth_date": "1990-01-15", "shoe_size": 9
        }))
        .unwrap_err();
        assert!(err.to_string().contains("shoe_size"));
    }

    #[test]
    fn replace_body_forbids_patient_id() {
        let err = serde_json::from_value::<PatientReplace>(json!({
            "patient_id": "P9", "name": "A", "birth_date": "1990-01-15"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("patient_id"));
    }

    #[test]
    fn patch_body_distinguishes_null_from_absent() {
        let body: PatientPatchBody =
            serde_json::from_value(json!({"height": null, "diagnosis": "Updated"})).unwrap();
        assert_eq!(body.height, Some(None));
        assert_eq!(body.weight, None);
        assert!(body.validate().is_ok());

        let changes = struct_to_object(&body.into_struct());
        assert_eq!(Value::Object(changes), json!({"height": null, "diagnosis": "Updated"}));

        let body: PatientPatchBody = serde_json::from_value(json!({"name": null})).unwrap();
        assert!(body.validate().is_err());

        let body: PatientPatchBody = serde_json::from_value(json!({})).unwrap();
        assert!(body.validate().is_ok());
        assert!(body.into_struct().fields.is_empty());
    }

    #[test]
    fn list_params_saturate_instead_of_failing() {
        let params = ListParams {
            skip: None,
            limit: Some(5_000_000_000),
        };
        assert_eq!(params.skip(), 0);
        assert_eq!(params.limit(), u32::MAX);

        let params = ListParams {
            skip: Some(3),
            limit: None,
        };
        assert_eq!(params.skip(), 3);
        assert_eq!(params.limit(), DEFAULT_LIST_LIMIT);
    }

    #[test]
    fn response_uses_blood_type_label() {
        let response = PatientResponse::from(pb::PatientMessage {
            id: "550e8400-e29b-41d4-a716-446655440000".into(),
            blood_type: BloodType::AbNegative as i32,
            ..Default::default()
        });
        assert_eq!(response.blood_type, "AB-");
        assert!(response.metadata.is_empty());
    }
}
