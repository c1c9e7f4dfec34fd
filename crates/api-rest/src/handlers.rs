//! HTTP handlers. Each one validates its input, makes exactly one RPC and maps the outcome.

use api_shared::pb::{
    self, create_patient_request, update_patient_request, CreatePatientRequest,
    DeletePatientRequest, GetAllPatientsRequest, GetPatientRequest, SearchPatientByIdRequest,
    UpdatePatientRequest,
};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use ehr_uuid::RecordId;

use crate::error::GatewayError;
use crate::extract::ValidatedJson;
use crate::models::{
    DeleteResponse, ErrorResponse, ListParams, PatientCreate, PatientPatchBody, PatientReplace,
    PatientResponse, RootResponse,
};
use crate::AppState;

pub const GATEWAY_VERSION: &str = "1.0.0";

fn check_uuid(uuid: &str) -> Result<(), GatewayError> {
    if RecordId::is_canonical(uuid) {
        Ok(())
    } else {
        Err(GatewayError::bad_request(format!(
            "invalid patient uuid '{uuid}'"
        )))
    }
}

fn into_patient(response: pb::PatientResponse) -> Result<Json<PatientResponse>, GatewayError> {
    response
        .patient
        .map(|p| Json(PatientResponse::from(p)))
        .ok_or_else(|| GatewayError::Internal("backend response carried no patient".into()))
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Gateway is running", body = RootResponse)
    )
)]
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "EHR API Gateway is running".into(),
        version: GATEWAY_VERSION.into(),
        grpc_server: state.backend_url().to_owned(),
    })
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientCreate,
    responses(
        (status = 201, description = "Patient created", body = PatientResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "patient_id already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_patient(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<PatientCreate>,
) -> Result<(StatusCode, Json<PatientResponse>), GatewayError> {
    let request = CreatePatientRequest {
        payload: Some(create_patient_request::Payload::Patient(
            body.into_message(),
        )),
    };
    let response = state.client().create_patient(request).await?.into_inner();
    let patient = into_patient(response)?;
    tracing::info!("created patient {}", patient.id);
    Ok((StatusCode::CREATED, patient))
}

#[utoipa::path(
    get,
    path = "/patients/{uuid}",
    params(("uuid" = String, Path, description = "Internal patient identifier")),
    responses(
        (status = 200, description = "Patient record", body = PatientResponse),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse)
    )
)]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<PatientResponse>, GatewayError> {
    check_uuid(&uuid)?;
    let response = state
        .client()
        .get_patient(GetPatientRequest { patient_uuid: uuid })
        .await?;
    into_patient(response.into_inner())
}

#[utoipa::path(
    get,
    path = "/patients",
    params(ListParams),
    responses(
        (status = 200, description = "Page of patients", body = [PatientResponse]),
        (status = 400, description = "Invalid pagination", body = ErrorResponse)
    )
)]
pub async fn list_patients(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<PatientResponse>>, GatewayError> {
    let Query(params) = params.map_err(|e| GatewayError::bad_request(e.body_text()))?;
    let request = GetAllPatientsRequest {
        skip: params.skip(),
        limit: params.limit(),
    };
    let patients = state
        .client()
        .get_all_patients(request)
        .await?
        .into_inner()
        .patients;
    Ok(Json(patients.into_iter().map(PatientResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/patients/search/{patient_id}",
    params(("patient_id" = String, Path, description = "External patient identifier")),
    responses(
        (status = 200, description = "Patient record", body = PatientResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse)
    )
)]
pub async fn search_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientResponse>, GatewayError> {
    let response = state
        .client()
        .search_patient_by_id(SearchPatientByIdRequest { patient_id })
        .await?;
    into_patient(response.into_inner())
}

#[utoipa::path(
    put,
    path = "/patients/{uuid}",
    params(("uuid" = String, Path, description = "Internal patient identifier")),
    request_body = PatientReplace,
    responses(
        (status = 200, description = "Patient replaced", body = PatientResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse)
    )
)]
pub async fn replace_patient(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    ValidatedJson(body): ValidatedJson<PatientReplace>,
) -> Result<Json<PatientResponse>, GatewayError> {
    check_uuid(&uuid)?;
    let request = UpdatePatientRequest {
        patient_uuid: uuid,
        mode: pb::UpdateMode::Full as i32,
        changes: Some(update_patient_request::Changes::Patch(body.into_patch())),
    };
    let response = state.client().update_patient(request).await?;
    into_patient(response.into_inner())
}

#[utoipa::path(
    patch,
    path = "/patients/{uuid}",
    params(("uuid" = String, Path, description = "Internal patient identifier")),
    request_body = PatientPatchBody,
    responses(
        (status = 200, description = "Patient updated", body = PatientResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse)
    )
)]
pub async fn patch_patient(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    ValidatedJson(body): ValidatedJson<PatientPatchBody>,
) -> Result<Json<PatientResponse>, GatewayError> {
    check_uuid(&uuid)?;
    let request = UpdatePatientRequest {
        patient_uuid: uuid,
        mode: pb::UpdateMode::Partial as i32,
        changes: Some(update_patient_request::Changes::UpdateData(
            body.into_struct(),
        )),
    };
    let response = state.client().update_patient(request).await?;
    into_patient(response.into_inner())
}

#[utoipa::path(
    delete,
    path = "/patients/{uuid}",
    params(("uuid" = String, Path, description = "Internal patient identifier")),
    responses(
        (status = 200, description = "Patient deleted", body = DeleteResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse)
    )
)]
pub async fn delete_patient(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<DeleteResponse>, GatewayError> {
    check_uuid(&uuid)?;
    let response = state
        .client()
        .delete_patient(DeletePatientRequest {
            patient_uuid: uuid.clone(),
        })
        .await?
        .into_inner();
    tracing::info!("deleted patient {uuid}");
    Ok(Json(DeleteResponse {
        success: response.success,
        message: response.message,
    }))
}
