// Re-export the proto module from the shared `api-shared` crate so callers
// can reference `api_grpc::pb`.
pub use api_shared::pb;

use api_shared::pb::{
    create_patient_request, ehr_server::Ehr, update_patient_request, CreatePatientRequest,
    DeletePatientRequest, DeletePatientResponse, GetAllPatientsRequest, GetAllPatientsResponse,
    GetPatientRequest, HealthRes, PatientResponse, SearchPatientByIdRequest,
    UpdatePatientRequest,
};
use api_shared::HealthService;
use ehr_core::{NewPatient, PatientChanges, PatientError, PatientService, UpdateMode};
use tonic::{Request, Response, Status};

/// Maps a core failure onto a gRPC status.
///
/// Caller errors keep their message. Internal failures are logged here and replaced with a
/// generic message so store paths and schema details never leave the server.
pub fn status_from_error(err: PatientError) -> Status {
    match err {
        PatientError::InvalidInput(msg) => Status::invalid_argument(msg),
        PatientError::DuplicatePatientId(_) => Status::already_exists(err.to_string()),
        PatientError::NotFound(_) => Status::not_found(err.to_string()),
        PatientError::Schema(_) | PatientError::Store(_) => {
            tracing::error!("internal error handling patient request: {err}");
            Status::internal("Internal error")
        }
    }
}

#[derive(Clone)]
pub struct EhrService {
    patients: PatientService,
}

impl EhrService {
    pub fn new(patients: PatientService) -> Self {
        Self { patients }
    }
}

fn patient_response(patient: pb::PatientMessage) -> Response<PatientResponse> {
    Response::new(PatientResponse {
        patient: Some(patient),
    })
}

#[tonic::async_trait]
impl Ehr for EhrService {
    async fn health(&self, _req: Request<()>) -> Result<Response<HealthRes>, Status> {
        Ok(Response::new(HealthService::check_health()))
    }

    async fn create_patient(
        &self,
        req: Request<CreatePatientRequest>,
    ) -> Result<Response<PatientResponse>, Status> {
        let input = match req.into_inner().payload {
            Some(create_patient_request::Payload::Patient(message)) => NewPatient::Flat(message),
            Some(create_patient_request::Payload::PatientData(data)) => NewPatient::Flexible(data),
            None => return Err(Status::invalid_argument("patient payload is required")),
        };

        self.patients
            .create(input)
            .await
            .map(patient_response)
            .map_err(status_from_error)
    }

    async fn get_patient(
        &self,
        req: Request<GetPatientRequest>,
    ) -> Result<Response<PatientResponse>, Status> {
        let req = req.into_inner();
        self.patients
            .get(&req.patient_uuid)
            .await
            .map(patient_response)
            .map_err(status_from_error)
    }

    async fn get_all_patients(
        &self,
        req: Request<GetAllPatientsRequest>,
    ) -> Result<Response<GetAllPatientsResponse>, Status> {
        let req = req.into_inner();
        let patients = self
            .patients
            .get_all(req.skip, req.limit)
            .await
            .map_err(status_from_error)?;
        Ok(Response::new(GetAllPatientsResponse { patients }))
    }

    async fn search_patient_by_id(
        &self,
        req: Request<SearchPatientByIdRequest>,
    ) -> Result<Response<PatientResponse>, Status> {
        let req = req.into_inner();
        self.patients
            .search_by_patient_id(&req.patient_id)
            .await
            .map(patient_response)
            .map_err(status_from_error)
    }

    async fn update_patient(
        &self,
        req: Request<UpdatePatientRequest>,
    ) -> Result<Response<PatientResponse>, Status> {
        let req = req.into_inner();
        let mode = match req.mode() {
            pb::UpdateMode::Partial => UpdateMode::Partial,
            pb::UpdateMode::Full => UpdateMode::Full,
        };
        let changes = match req.changes {
            Some(update_patient_request::Changes::Patch(patch)) => PatientChanges::Patch(patch),
            Some(update_patient_request::Changes::UpdateData(data)) => {
                PatientChanges::Flexible(data)
            }
            None => PatientChanges::Patch(pb::PatientPatch::default()),
        };

        self.patients
            .update(&req.patient_uuid, mode, changes)
            .await
            .map(patient_response)
            .map_err(status_from_error)
    }

    async fn delete_patient(
        &self,
        req: Request<DeletePatientRequest>,
    ) -> Result<Response<DeletePatientResponse>, Status> {
        let req = req.into_inner();
        let (success, message) = self
            .patients
            .delete(&req.patient_uuid)
            .await
            .map_err(status_from_error)?;
        Ok(Response::new(DeletePatientResponse { success, message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_shared::json::object_to_struct;
    use ehr_core::{CoreConfig, MemoryStore, StoreError};
    use serde_json::json;
    use std::sync::Arc;
    use tonic::Code;

    fn service() -> EhrService {
        EhrService::new(PatientService::with_store(
            Arc::new(CoreConfig::default()),
            Arc::new(MemoryStore::new()),
        ))
    }

    fn john() -> pb::PatientMessage {
        pb::PatientMessage {
            patient_id: "P001".into(),
            name: "John Doe".into(),
            birth_date: "1990-01-15".into(),
            blood_type: pb::BloodType::APositive as i32,
            ..Default::default()
        }
    }

    fn create_request(message: pb::PatientMessage) -> Request<CreatePatientRequest> {
        Request::new(CreatePatientRequest {
            payload: Some(create_patient_request::Payload::Patient(message)),
        })
    }

    async fn create(svc: &EhrService) -> pb::PatientMessage {
        svc.create_patient(create_request(john()))
            .await
            .unwrap()
            .into_inner()
            .patient
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_alive() {
        let res = service().health(Request::new(())).await.unwrap().into_inner();
        assert!(res.ok);
    }

    #[tokio::test]
    async fn create_then_duplicate_is_already_exists() {
        let svc = service();
        let created = create(&svc).await;
        assert_eq!(created.created_at, created.updated_at);

        let status = svc.create_patient(create_request(john())).await.unwrap_err();
        assert_eq!(status.code(), Code::AlreadyExists);
    }

    #[tokio::test]
    async fn create_without_payload_is_invalid_argument() {
        let status = service()
            .create_patient(Request::new(CreatePatientRequest { payload: None }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn create_accepts_flexible_payload() {
        let data = object_to_struct(
            json!({"patient_id": "P002", "name": "Ada", "birth_date": "1815-12-10"})
                .as_object()
                .unwrap(),
        );
        let created = service()
            .create_patient(Request::new(CreatePatientRequest {
                payload: Some(create_patient_request::Payload::PatientData(data)),
            }))
            .await
            .unwrap()
            .into_inner()
            .patient
            .unwrap();
        assert_eq!(created.patient_id, "P002");
    }

    #[tokio::test]
    async fn get_search_and_list() {
        let svc = service();
        let created = create(&svc).await;

        let fetched = svc
            .get_patient(Request::new(GetPatientRequest {
                patient_uuid: created.id.clone(),
            }))
            .await
            .unwrap()
            .into_inner()
            .patient;
        assert_eq!(fetched.as_ref(), Some(&created));

        let found = svc
            .search_patient_by_id(Request::new(SearchPatientByIdRequest {
                patient_id: "P001".into(),
            }))
            .await
            .unwrap()
            .into_inner()
            .patient;
        assert_eq!(found, Some(created));

        let all = svc
            .get_all_patients(Request::new(GetAllPatientsRequest { skip: 0, limit: 0 }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(all.patients.len(), 1);

        let status = svc
            .search_patient_by_id(Request::new(SearchPatientByIdRequest {
                patient_id: "P404".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn malformed_uuid_is_invalid_argument() {
        let status = service()
            .get_patient(Request::new(GetPatientRequest {
                patient_uuid: "nope".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn update_modes_and_delete() {
        let svc = service();
        let created = create(&svc).await;

        let updated = svc
            .update_patient(Request::new(UpdatePatientRequest {
                patient_uuid: created.id.clone(),
                mode: pb::UpdateMode::Partial as i32,
                changes: Some(update_patient_request::Changes::Patch(pb::PatientPatch {
                    diagnosis: Some("Updated".into()),
                    weight: Some(72),
                    ..Default::default()
                })),
            }))
            .await
            .unwrap()
            .into_inner()
            .patient
            .unwrap();
        assert_eq!(updated.name, "John Doe");
        assert_eq!(updated.weight, Some(72));

        let status = svc
            .update_patient(Request::new(UpdatePatientRequest {
                patient_uuid: created.id.clone(),
                mode: pb::UpdateMode::Full as i32,
                changes: Some(update_patient_request::Changes::Patch(pb::PatientPatch {
                    name: Some("Only Name".into()),
                    ..Default::default()
                })),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);

        let deleted = svc
            .delete_patient(Request::new(DeletePatientRequest {
                patient_uuid: created.id.clone(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(deleted.success);
        assert_eq!(deleted.message, "Patient deleted successfully");

        let status = svc
            .get_patient(Request::new(GetPatientRequest {
                patient_uuid: created.id,
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[test]
    fn internal_errors_are_masked() {
        let err = PatientError::Store(StoreError::conflict("record 123 already exists"));
        let status = status_from_error(err);
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "Internal error");
    }
}
