//! # EHR Core
//!
//! Core business logic for the EHR patient record service.
//!
//! This crate contains pure data operations:
//! - The stored [`document`] model of a patient record
//! - Translation between RPC messages and documents ([`translator`])
//! - Field validation and defaults ([`validation`])
//! - Pluggable document storage, in memory or as sharded JSON files ([`store`])
//! - The CRUD lifecycle with its business rules ([`PatientService`])
//!
//! **No API concerns**: HTTP/gRPC servers and status-code mapping belong in `api-grpc`,
//! `api-rest` or `api-shared`.

pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod patient;
pub mod store;
pub mod translator;
pub mod validation;

// Use the shared api-shared crate for generated protobuf types.
pub use api_shared::pb;

pub use config::{CoreConfig, StorageBackend};
pub use document::{DocValue, Document};
pub use error::{PatientError, PatientResult};
pub use patient::{NewPatient, PatientChanges, PatientService, UpdateMode};
pub use store::{DocumentStore, FileStore, MemoryStore, StoreError};
pub use translator::TranslateError;
