//! # API gRPC
//!
//! gRPC server implementation for HRM.
//!
//! Handles:
//! - gRPC service setup and the optional API-key interceptor
//! - Caller identity extraction from `x-caller-id` metadata
//! - Mapping registry errors onto gRPC status codes
//!
//! Uses `api-shared` for common types and utilities.

#![warn(rust_2018_idioms)]

pub use service::{api_key_interceptor, pb, HrmService};

pub mod service;
