//! # API gRPC
//!
//! gRPC server implementation for the EHR CRUD backend.
//!
//! Handles:
//! - The `ehr.v1.Ehr` service implementation on top of `ehr-core`'s `PatientService`
//! - Mapping of core errors onto gRPC status codes
//! - Server assembly, including optional reflection
//!
//! Uses `api-shared` for the generated protobuf types.

#![warn(rust_2018_idioms)]

pub use service::{pb, status_from_error, EhrService};

pub mod service;

use api_shared::pb::ehr_server::EhrServer;
use api_shared::FILE_DESCRIPTOR_SET;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tonic_reflection::server::Builder;

/// Returns true when `EHR_ENABLE_REFLECTION` is set to `true`.
pub fn reflection_enabled(value: Option<String>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Assembles the gRPC server for `svc`, adding the reflection service when requested.
pub fn build_server(svc: EhrService, enable_reflection: bool) -> anyhow::Result<Router> {
    let mut router = Server::builder().add_service(EhrServer::new(svc));

    if enable_reflection {
        let reflection_service = Builder::configure()
            .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
            .build_v1()?;
        router = router.add_service(reflection_service);
        tracing::info!("gRPC server reflection enabled");
    } else {
        tracing::info!("gRPC server reflection disabled");
    }

    Ok(router)
}
