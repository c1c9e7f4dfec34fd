//! # API REST
//!
//! REST gateway in front of the EHR gRPC backend.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - JSON shape validation before any RPC is made
//! - Mapping of gRPC status codes onto HTTP responses
//! - OpenAPI/Swagger documentation
//!
//! Uses `api-shared` for the generated gRPC client.

#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;

pub use config::GatewayConfig;
pub use error::GatewayError;

use api_shared::pb::ehr_client::EhrClient;
use axum::routing::get;
use axum::Router;
use tonic::transport::{Channel, Endpoint};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Shared by every handler. The channel connects lazily and is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    client: EhrClient<Channel>,
    backend_url: String,
}

impl AppState {
    pub fn new(channel: Channel, backend_url: impl Into<String>) -> Self {
        Self {
            client: EhrClient::new(channel),
            backend_url: backend_url.into(),
        }
    }

    /// Builds state for `backend_url` without dialling it; the first RPC opens the connection.
    pub fn connect_lazy(backend_url: &str) -> anyhow::Result<Self> {
        let channel = Endpoint::from_shared(backend_url.to_owned())?.connect_lazy();
        Ok(Self::new(channel, backend_url))
    }

    pub fn client(&self) -> EhrClient<Channel> {
        self.client.clone()
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "EHR API Gateway", version = "1.0.0"),
    paths(
        handlers::root,
        handlers::create_patient,
        handlers::get_patient,
        handlers::list_patients,
        handlers::search_patient,
        handlers::replace_patient,
        handlers::patch_patient,
        handlers::delete_patient,
    ),
    components(schemas(
        models::PatientCreate,
        models::PatientReplace,
        models::PatientPatchBody,
        models::PatientResponse,
        models::DeleteResponse,
        models::ErrorResponse,
        models::RootResponse,
    ))
)]
pub struct ApiDoc;

/// Builds the gateway router with CORS, request tracing and the Swagger UI.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route("/patients/search/:patient_id", get(handlers::search_patient))
        .route(
            "/patients/:uuid",
            get(handlers::get_patient)
                .put(handlers::replace_patient)
                .patch(handlers::patch_patient)
                .delete(handlers::delete_patient),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
