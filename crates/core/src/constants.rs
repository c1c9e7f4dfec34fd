//! Constants used throughout the EHR core crate.
//!
//! Document keys, field limits and storage path names live here so the translator, the
//! validator and the stores agree on them.

/// Default directory for patient data storage when no explicit directory is configured.
pub const DEFAULT_PATIENT_DATA_DIR: &str = "patient_data";

/// Directory (under the patient data dir) holding the sharded patient record tree.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Filename for patient JSON files.
pub const PATIENT_JSON_FILENAME: &str = "patient.json";

/// Page size used by `get_all` when the caller passes a limit of 0.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Maximum length of a patient name, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of the free-text diagnosis, in characters.
pub const MAX_DIAGNOSIS_LEN: usize = 255;

/// Document key of the internal identifier.
pub const ID_KEY: &str = "_id";
/// Alternative spelling of the internal identifier accepted (and rejected) in change sets.
pub const ID_ALIAS_KEY: &str = "id";
pub const PATIENT_ID_KEY: &str = "patient_id";
pub const NAME_KEY: &str = "name";
pub const BIRTH_DATE_KEY: &str = "birth_date";
pub const HEIGHT_KEY: &str = "height";
pub const WEIGHT_KEY: &str = "weight";
pub const BLOOD_TYPE_KEY: &str = "blood_type";
pub const DIAGNOSIS_KEY: &str = "diagnosis";
pub const CONDITIONS_KEY: &str = "conditions";
pub const ALLERGIES_KEY: &str = "allergies";
pub const METADATA_KEY: &str = "metadata";
pub const CREATED_AT_KEY: &str = "created_at";
pub const UPDATED_AT_KEY: &str = "updated_at";

/// Fields a caller may change after creation, in stored document order.
pub const MUTABLE_FIELDS: [&str; 9] = [
    NAME_KEY,
    BIRTH_DATE_KEY,
    HEIGHT_KEY,
    WEIGHT_KEY,
    BLOOD_TYPE_KEY,
    DIAGNOSIS_KEY,
    CONDITIONS_KEY,
    ALLERGIES_KEY,
    METADATA_KEY,
];

/// Fields owned by the service that no change set may touch.
pub const IMMUTABLE_FIELDS: [&str; 5] = [
    ID_KEY,
    ID_ALIAS_KEY,
    PATIENT_ID_KEY,
    CREATED_AT_KEY,
    UPDATED_AT_KEY,
];

/// Message returned by a successful delete.
pub const DELETE_SUCCESS_MESSAGE: &str = "Patient deleted successfully";
