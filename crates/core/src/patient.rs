//! Patient service and related types.
//!
//! [`PatientService`] owns the business rules of the record lifecycle: external-id uniqueness,
//! service-managed timestamps, immutable fields and the two update modes. Translation and field
//! validation are delegated to [`crate::translator`] and [`crate::validation`]; persistence to
//! a [`DocumentStore`].

use crate::constants::{
    CREATED_AT_KEY, DELETE_SUCCESS_MESSAGE, ID_ALIAS_KEY, ID_KEY, MUTABLE_FIELDS, PATIENT_ID_KEY,
    UPDATED_AT_KEY,
};
use crate::document::{DocValue, Document};
use crate::error::{PatientError, PatientResult};
use crate::store::DocumentStore;
use crate::translator::{self, TranslateError};
use crate::validation::{apply_defaults, validate_changes, validate_new_record};
use crate::{pb, CoreConfig};
use ehr_types::NonEmptyText;
use ehr_uuid::{next_timestamp, RecordId};
use prost_types::Struct;
use std::sync::Arc;
use tokio::sync::Mutex;

/// How an update applies its change set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Only the fields present in the change set are modified.
    #[default]
    Partial,
    /// Every mutable field is replaced; absent optional fields revert to their defaults.
    Full,
}

/// Input accepted by [`PatientService::create`].
#[derive(Clone, Debug)]
pub enum NewPatient {
    /// Flat schema. `id`, `created_at` and `updated_at` are ignored.
    Flat(pb::PatientMessage),
    /// Flexible schema: the same field names in a generic structure.
    Flexible(Struct),
}

/// Change set accepted by [`PatientService::update`].
#[derive(Clone, Debug)]
pub enum PatientChanges {
    Patch(pb::PatientPatch),
    Flexible(Struct),
}

/// Pure patient data operations - no API concerns
#[derive(Clone)]
pub struct PatientService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn DocumentStore>,
    // Serialises mutations so the duplicate check and insert are atomic and updated_at
    // strictly advances per record.
    write_lock: Arc<Mutex<()>>,
}

impl PatientService {
    /// Creates a service backed by the store selected in `cfg`.
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        let store = cfg.build_store();
        Self::with_store(cfg, store)
    }

    /// Creates a service over an explicit store.
    pub fn with_store(cfg: Arc<CoreConfig>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            cfg,
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Creates a patient record.
    ///
    /// # Errors
    ///
    /// - [`PatientError::InvalidInput`] if a field breaks the field rules.
    /// - [`PatientError::DuplicatePatientId`] if a record with the same `patient_id` exists.
    /// - [`PatientError::Schema`] if a flexible payload has misshapen collections.
    /// - [`PatientError::Store`] on backend failure.
    pub async fn create(&self, input: NewPatient) -> PatientResult<pb::PatientMessage> {
        let mut doc = match input {
            NewPatient::Flat(message) => translator::to_document(&message),
            NewPatient::Flexible(s) => translator::struct_to_document(&s)?,
        };
        for key in [ID_KEY, ID_ALIAS_KEY, CREATED_AT_KEY, UPDATED_AT_KEY] {
            doc.shift_remove(key);
        }

        let mut fields = validate_new_record(doc)?;
        let patient_id = fields
            .shift_remove(PATIENT_ID_KEY)
            .ok_or(TranslateError::MissingField(PATIENT_ID_KEY))?;

        let _guard = self.write_lock.lock().await;

        if self
            .store
            .find_one(PATIENT_ID_KEY, &patient_id)
            .await?
            .is_some()
        {
            let external = patient_id.as_str().unwrap_or_default().to_owned();
            tracing::info!("rejected duplicate patient_id {external}");
            return Err(PatientError::DuplicatePatientId(external));
        }

        let id = RecordId::new();
        let now = DocValue::timestamp(next_timestamp(None));
        let record = assemble(id, patient_id, fields, now.clone(), now);

        self.store.insert(id, record.clone()).await?;
        tracing::info!("created patient record {id}");

        Ok(translator::from_document(&record)?)
    }

    /// Fetches a record by its internal identifier.
    pub async fn get(&self, id: &str) -> PatientResult<pb::PatientMessage> {
        let id = parse_record_id(id)?;
        let doc = self
            .store
            .get(&id)
            .await?
            .ok_or_else(|| PatientError::NotFound(id.to_string()))?;
        Ok(translator::from_document(&doc)?)
    }

    /// Returns one page of records in the store's default order.
    ///
    /// A `limit` of 0 selects the configured default page size.
    pub async fn get_all(&self, skip: u32, limit: u32) -> PatientResult<Vec<pb::PatientMessage>> {
        let limit = if limit == 0 {
            self.cfg.default_page_limit()
        } else {
            limit
        };
        self.store
            .list(skip as usize, limit as usize)
            .await?
            .iter()
            .map(|doc| translator::from_document(doc).map_err(PatientError::from))
            .collect()
    }

    /// Fetches a record by its caller-supplied external identifier.
    pub async fn search_by_patient_id(
        &self,
        patient_id: &str,
    ) -> PatientResult<pb::PatientMessage> {
        let patient_id = NonEmptyText::new(patient_id)
            .map_err(|_| PatientError::InvalidInput("patient_id cannot be empty".into()))?;
        let doc = self
            .store
            .find_one(PATIENT_ID_KEY, &DocValue::String(patient_id.to_string()))
            .await?
            .ok_or_else(|| PatientError::NotFound(patient_id.to_string()))?;
        Ok(translator::from_document(&doc)?)
    }

    /// Applies a change set to an existing record.
    ///
    /// `updated_at` advances on every successful call, including one with an empty change set.
    pub async fn update(
        &self,
        id: &str,
        mode: UpdateMode,
        changes: PatientChanges,
    ) -> PatientResult<pb::PatientMessage> {
        let id = parse_record_id(id)?;
        let changes = match changes {
            PatientChanges::Patch(patch) => translator::patch_to_document(&patch),
            PatientChanges::Flexible(s) => translator::struct_to_document(&s)?,
        };
        let changes = validate_changes(changes, mode)?;

        let _guard = self.write_lock.lock().await;

        let current = self
            .store
            .get(&id)
            .await?
            .ok_or_else(|| PatientError::NotFound(id.to_string()))?;

        let patient_id = current
            .get(PATIENT_ID_KEY)
            .cloned()
            .ok_or(TranslateError::MissingField(PATIENT_ID_KEY))?;
        let created_at = current
            .get(CREATED_AT_KEY)
            .cloned()
            .ok_or(TranslateError::MissingField(CREATED_AT_KEY))?;
        let previous = current.get(UPDATED_AT_KEY).and_then(DocValue::as_utc);

        let fields = match mode {
            UpdateMode::Full => changes,
            UpdateMode::Partial => merge(current, changes),
        };
        let updated_at = DocValue::timestamp(next_timestamp(previous));
        let record = assemble(id, patient_id, fields, created_at, updated_at);

        if !self.store.replace(&id, record.clone()).await? {
            return Err(PatientError::NotFound(id.to_string()));
        }
        tracing::info!("updated patient record {id} ({mode:?})");

        Ok(translator::from_document(&record)?)
    }

    /// Permanently removes a record.
    pub async fn delete(&self, id: &str) -> PatientResult<(bool, String)> {
        let id = parse_record_id(id)?;

        let _guard = self.write_lock.lock().await;
        if !self.store.delete(&id).await? {
            return Err(PatientError::NotFound(id.to_string()));
        }
        tracing::info!("deleted patient record {id}");

        Ok((true, DELETE_SUCCESS_MESSAGE.to_owned()))
    }
}

fn parse_record_id(id: &str) -> PatientResult<RecordId> {
    RecordId::parse(id).map_err(|_| {
        PatientError::InvalidInput(format!(
            "invalid patient uuid '{id}': expected a lowercase hyphenated UUID"
        ))
    })
}

/// Overlays a partial change set on the mutable fields of `current`. `Null` removes a field.
fn merge(current: Document, changes: Document) -> Document {
    let mut fields: Document = current
        .into_iter()
        .filter(|(k, _)| MUTABLE_FIELDS.contains(&k.as_str()))
        .collect();
    for (key, value) in changes {
        if value == DocValue::Null {
            fields.shift_remove(&key);
        } else {
            fields.insert(key, value);
        }
    }
    fields
}

/// Builds a stored record in canonical key order, filling defaults for absent optional fields.
fn assemble(
    id: RecordId,
    patient_id: DocValue,
    mut fields: Document,
    created_at: DocValue,
    updated_at: DocValue,
) -> Document {
    apply_defaults(&mut fields);

    let mut record = Document::new();
    record.insert(ID_KEY.into(), DocValue::String(id.to_string()));
    record.insert(PATIENT_ID_KEY.into(), patient_id);
    for key in MUTABLE_FIELDS {
        if let Some(value) = fields.shift_remove(key) {
            record.insert(key.to_owned(), value);
        }
    }
    record.insert(CREATED_AT_KEY.into(), created_at);
    record.insert(UPDATED_AT_KEY.into(), updated_at);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use crate::pb::BloodType;
    use crate::store::{FileStore, MemoryStore, StoreError};
    use api_shared::json::object_to_struct;
    use serde_json::json;
    use tempfile::TempDir;

    fn service() -> PatientService {
        PatientService::with_store(Arc::new(CoreConfig::default()), Arc::new(MemoryStore::new()))
    }

    fn john() -> pb::PatientMessage {
        pb::PatientMessage {
            patient_id: "P001".into(),
            name: "John Doe".into(),
            birth_date: "1990-01-15".into(),
            height: Some(175),
            weight: Some(70),
            blood_type: BloodType::APositive as i32,
            diagnosis: "Hypertension".into(),
            ..Default::default()
        }
    }

    fn timestamp(text: &str) -> chrono::DateTime<chrono::FixedOffset> {
        chrono::DateTime::parse_from_rfc3339(text).unwrap()
    }

    fn flexible(value: serde_json::Value) -> Struct {
        object_to_struct(value.as_object().unwrap())
    }

    #[tokio::test]
    async fn create_assigns_id_and_equal_timestamps() {
        let svc = service();
        let created = svc.create(NewPatient::Flat(john())).await.unwrap();

        assert!(RecordId::is_canonical(&created.id));
        assert_eq!(created.patient_id, "P001");
        assert_eq!(created.blood_type, BloodType::APositive as i32);
        assert_eq!(created.created_at, created.updated_at);
        assert!(created.metadata.is_some());
        assert!(created.conditions.is_empty());

        let fetched = svc.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_ignores_client_supplied_id_and_timestamps() {
        let svc = service();
        let input = pb::PatientMessage {
            id: "00000000-0000-4000-8000-000000000000".into(),
            created_at: "2000-01-01T00:00:00Z".into(),
            ..john()
        };
        let created = svc.create(NewPatient::Flat(input)).await.unwrap();
        assert_ne!(created.id, "00000000-0000-4000-8000-000000000000");
        assert_ne!(created.created_at, "2000-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn duplicate_patient_id_is_rejected() {
        let svc = service();
        svc.create(NewPatient::Flat(john())).await.unwrap();

        let again = pb::PatientMessage {
            name: "Someone Else".into(),
            ..john()
        };
        let err = svc.create(NewPatient::Flat(again)).await.unwrap_err();
        assert!(matches!(err, PatientError::DuplicatePatientId(ref id) if id == "P001"));
        assert_eq!(svc.get_all(0, 0).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_admit_one_record_per_patient_id() {
        let svc = service();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.create(NewPatient::Flat(john())).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(PatientError::DuplicatePatientId(_)) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let svc = service();
        let bad = pb::PatientMessage {
            birth_date: "15/01/1990".into(),
            ..john()
        };
        assert!(matches!(
            svc.create(NewPatient::Flat(bad)).await,
            Err(PatientError::InvalidInput(_))
        ));

        let bad = pb::PatientMessage {
            height: Some(0),
            ..john()
        };
        assert!(matches!(
            svc.create(NewPatient::Flat(bad)).await,
            Err(PatientError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn create_from_flexible_struct() {
        let svc = service();
        let created = svc
            .create(NewPatient::Flexible(flexible(json!({
                "patient_id": "P010",
                "name": "Grace Hopper",
                "birth_date": "1906-12-09",
                "blood_type": "B-",
                "conditions": [{"name": "Asthma", "diagnosed": "1950-05-01"}],
                "metadata": {"ward": 7}
            }))))
            .await
            .unwrap();

        assert_eq!(created.blood_type, BloodType::BNegative as i32);
        assert_eq!(created.conditions.len(), 1);
        assert_eq!(created.height, None);

        let err = svc
            .create(NewPatient::Flexible(flexible(json!({
                "patient_id": "P011",
                "name": "X",
                "birth_date": "1906-12-09",
                "conditions": ["not a map"]
            }))))
            .await
            .unwrap_err();
        assert!(matches!(err, PatientError::Schema(_)));
        assert!(err.is_internal());
    }

    #[tokio::test]
    async fn partial_update_changes_only_given_fields() {
        let svc = service();
        let created = svc.create(NewPatient::Flat(john())).await.unwrap();

        let patch = pb::PatientPatch {
            diagnosis: Some("Updated".into()),
            weight: Some(72),
            ..Default::default()
        };
        let updated = svc
            .update(&created.id, UpdateMode::Partial, PatientChanges::Patch(patch))
            .await
            .unwrap();

        assert_eq!(updated.diagnosis, "Updated");
        assert_eq!(updated.weight, Some(72));
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.birth_date, created.birth_date);
        assert_eq!(updated.height, created.height);
        assert_eq!(updated.created_at, created.created_at);
        assert!(timestamp(&updated.updated_at) > timestamp(&created.updated_at));
    }

    #[tokio::test]
    async fn empty_partial_update_still_advances_updated_at() {
        let svc = service();
        let created = svc.create(NewPatient::Flat(john())).await.unwrap();

        let first = svc
            .update(
                &created.id,
                UpdateMode::Partial,
                PatientChanges::Patch(pb::PatientPatch::default()),
            )
            .await
            .unwrap();
        let second = svc
            .update(
                &created.id,
                UpdateMode::Partial,
                PatientChanges::Patch(pb::PatientPatch::default()),
            )
            .await
            .unwrap();

        assert!(timestamp(&first.updated_at) > timestamp(&created.updated_at));
        assert!(timestamp(&second.updated_at) > timestamp(&first.updated_at));
        assert_eq!(second.diagnosis, created.diagnosis);
    }

    #[tokio::test]
    async fn flexible_null_clears_measurements() {
        let svc = service();
        let created = svc.create(NewPatient::Flat(john())).await.unwrap();

        let updated = svc
            .update(
                &created.id,
                UpdateMode::Partial,
                PatientChanges::Flexible(flexible(json!({"height": null}))),
            )
            .await
            .unwrap();
        assert_eq!(updated.height, None);
        assert_eq!(updated.weight, Some(70));
    }

    #[tokio::test]
    async fn flexible_text_that_looks_like_a_date_is_kept() {
        let svc = service();
        let created = svc
            .create(NewPatient::Flexible(flexible(json!({
                "patient_id": "2024-05-01",
                "name": "2024-05-01T10:00:00Z",
                "birth_date": "1990-01-15",
            }))))
            .await
            .unwrap();
        assert_eq!(created.patient_id, "2024-05-01");
        assert_eq!(created.name, "2024-05-01T10:00:00Z");

        let updated = svc
            .update(
                &created.id,
                UpdateMode::Partial,
                PatientChanges::Flexible(flexible(json!({"diagnosis": "2024-05-01"}))),
            )
            .await
            .unwrap();
        assert_eq!(updated.diagnosis, "2024-05-01");

        let found = svc.search_by_patient_id("2024-05-01").await.unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn full_update_resets_absent_optional_fields() {
        let svc = service();
        let created = svc.create(NewPatient::Flat(john())).await.unwrap();

        let updated = svc
            .update(
                &created.id,
                UpdateMode::Full,
                PatientChanges::Flexible(flexible(json!({
                    "name": "John Q. Doe",
                    "birth_date": "1990-01-16"
                }))),
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "John Q. Doe");
        assert_eq!(updated.birth_date, "1990-01-16");
        assert_eq!(updated.height, None);
        assert_eq!(updated.weight, None);
        assert_eq!(updated.blood_type, BloodType::Unspecified as i32);
        assert_eq!(updated.diagnosis, "");
        assert_eq!(updated.patient_id, "P001");
        assert_eq!(updated.id, created.id);

        let err = svc
            .update(
                &created.id,
                UpdateMode::Full,
                PatientChanges::Flexible(flexible(json!({"name": "Only Name"}))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PatientError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_rejects_immutable_fields_and_unknown_ids() {
        let svc = service();
        let created = svc.create(NewPatient::Flat(john())).await.unwrap();

        let err = svc
            .update(
                &created.id,
                UpdateMode::Partial,
                PatientChanges::Flexible(flexible(json!({"patient_id": "P999"}))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PatientError::InvalidInput(_)));

        let missing = RecordId::new().to_string();
        let err = svc
            .update(
                &missing,
                UpdateMode::Partial,
                PatientChanges::Patch(pb::PatientPatch::default()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PatientError::NotFound(_)));
    }

    #[tokio::test]
    async fn search_by_patient_id_finds_the_record() {
        let svc = service();
        let created = svc.create(NewPatient::Flat(john())).await.unwrap();

        assert_eq!(svc.search_by_patient_id("P001").await.unwrap(), created);
        assert!(matches!(
            svc.search_by_patient_id("P404").await,
            Err(PatientError::NotFound(_))
        ));
        assert!(matches!(
            svc.search_by_patient_id("  ").await,
            Err(PatientError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let svc = service();
        let created = svc.create(NewPatient::Flat(john())).await.unwrap();

        let (success, message) = svc.delete(&created.id).await.unwrap();
        assert!(success);
        assert_eq!(message, "Patient deleted successfully");

        assert!(matches!(
            svc.get(&created.id).await,
            Err(PatientError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete(&created.id).await,
            Err(PatientError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn malformed_ids_are_invalid_input() {
        let svc = service();
        for id in ["not-a-uuid", "550E8400-E29B-41D4-A716-446655440000", ""] {
            assert!(matches!(svc.get(id).await, Err(PatientError::InvalidInput(_))));
            assert!(matches!(svc.delete(id).await, Err(PatientError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn get_all_pages_and_applies_default_limit() {
        let cfg = CoreConfig::new("unused".into(), StorageBackend::Memory, 3).unwrap();
        let svc = PatientService::with_store(Arc::new(cfg), Arc::new(MemoryStore::new()));
        for i in 0..5 {
            let message = pb::PatientMessage {
                patient_id: format!("P{i}"),
                ..john()
            };
            svc.create(NewPatient::Flat(message)).await.unwrap();
        }

        assert_eq!(svc.get_all(0, 0).await.unwrap().len(), 3);
        assert_eq!(svc.get_all(0, 10).await.unwrap().len(), 5);
        let page = svc.get_all(3, 10).await.unwrap();
        let ids: Vec<&str> = page.iter().map(|p| p.patient_id.as_str()).collect();
        assert_eq!(ids, vec!["P3", "P4"]);
        assert!(svc.get_all(10, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_backed_service_round_trips_records() {
        let tmp = TempDir::new().unwrap();
        let cfg = Arc::new(
            CoreConfig::new(tmp.path().to_path_buf(), StorageBackend::File, 100).unwrap(),
        );
        let svc = PatientService::new(cfg.clone());
        assert_eq!(svc.backend_name(), "file");

        let input = pb::PatientMessage {
            conditions: vec![flexible(json!({"name": "Hypertension", "since": "2019-06-01"}))],
            ..john()
        };
        let created = svc.create(NewPatient::Flat(input)).await.unwrap();

        let reopened =
            PatientService::with_store(cfg.clone(), Arc::new(FileStore::new(cfg.patients_dir())));
        assert_eq!(reopened.get(&created.id).await.unwrap(), created);
        assert_eq!(
            reopened.search_by_patient_id("P001").await.unwrap().id,
            created.id
        );
    }

    #[tokio::test]
    async fn unreadable_record_blocks_duplicate_check() {
        let tmp = TempDir::new().unwrap();
        let cfg = Arc::new(
            CoreConfig::new(tmp.path().to_path_buf(), StorageBackend::File, 100).unwrap(),
        );
        let svc = PatientService::new(cfg.clone());
        let created = svc.create(NewPatient::Flat(john())).await.unwrap();

        let id = RecordId::parse(&created.id).unwrap();
        let file = id
            .sharded_dir(&cfg.patients_dir())
            .join(crate::constants::PATIENT_JSON_FILENAME);
        std::fs::write(file, "{ not json").unwrap();

        let err = svc.create(NewPatient::Flat(john())).await.unwrap_err();
        assert!(matches!(err, PatientError::Store(StoreError::Corrupt { .. })));
    }
}
