//! # API Shared
//!
//! Shared definitions for the EHR RPC server, the REST gateway and the CLI.
//!
//! Contains:
//! - Protobuf-generated types, server trait and client (`pb` module)
//! - Blood-type label mapping for the generated `BloodType` enum
//! - Conversion between JSON and `google.protobuf.Struct`
//! - Shared services like `HealthService`

// Re-export the generated protobuf module. The generated code will be placed
// into OUT_DIR at build time by the build script.
pub mod pb {
    tonic::include_proto!("ehr.v1");
}

pub mod blood_type;
pub mod health;
pub mod json;

pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("proto_descriptor");

pub use health::HealthService;
pub use pb::*;
