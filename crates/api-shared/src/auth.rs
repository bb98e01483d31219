//! Caller authentication helpers shared by the gRPC and REST transports.
//!
//! Establishing *who* the caller is happens upstream (gateway, wallet signature, mTLS). By the
//! time a request reaches HRM the caller identity is carried in [`CALLER_ID_HEADER`] and is
//! trusted as-is. These helpers only extract it and, for gRPC, check the optional shared API key.

use hrm_types::Identity;

/// Header (HTTP) / metadata key (gRPC) carrying the authenticated caller identity.
pub const CALLER_ID_HEADER: &str = "x-caller-id";

/// Header (HTTP) / metadata key (gRPC) carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing x-caller-id header")]
    MissingCaller,
    #[error("x-caller-id header is empty or not valid text")]
    InvalidCaller,
    #[error("missing x-api-key header")]
    MissingApiKey,
    #[error("invalid API key")]
    InvalidApiKey,
}

/// Turns the raw `x-caller-id` value into an [`Identity`].
///
/// `None` means the header was absent; `Some(Err(_))` means it was present but not valid
/// visible ASCII (what `HeaderValue::to_str` reports).
pub fn caller_identity<E>(raw: Option<Result<&str, E>>) -> Result<Identity, AuthError> {
    let raw = raw
        .ok_or(AuthError::MissingCaller)?
        .map_err(|_| AuthError::InvalidCaller)?;
    Identity::new(raw).map_err(|_| AuthError::InvalidCaller)
}

/// Validates the provided API key against the key configured at startup.
pub fn validate_api_key(provided_key: Option<&str>, expected_key: &str) -> Result<(), AuthError> {
    match provided_key {
        None => Err(AuthError::MissingApiKey),
        Some(key) if key == expected_key => Ok(()),
        Some(_) => Err(AuthError::InvalidApiKey),
    }
}

impl From<AuthError> for tonic::Status {
    fn from(err: AuthError) -> Self {
        tonic::Status::unauthenticated(err.to_string())
    }
}
