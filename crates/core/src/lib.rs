//! # HRM Core
//!
//! Core business logic for the HRM medical-records registry.
//!
//! This crate contains the registry state machine and its storage:
//! - Doctor self-registration and the doctor role lookup
//! - Patient enrollment and the patient directory
//! - Append-only per-patient record histories
//! - Optional JSON snapshot persistence under a data directory
//!
//! **No API concerns**: transports, authentication of callers and service interfaces belong in
//! `api-grpc`, `api-rest` or `api-shared`. Every operation here takes an already-authenticated
//! caller [`Identity`].

pub mod config;
pub mod constants;
pub mod error;
pub mod registry;
pub mod service;
pub mod store;
pub mod wire;

// Use the shared api-shared crate for generated protobuf types.
pub use api_shared::pb;

pub use config::CoreConfig;
pub use error::{RegistryError, RegistryResult};
pub use hrm_types::{Identity, IdentityError};
pub use registry::{NewRecord, Patient, Record, RecordsRegistry};
pub use service::RegistryService;
