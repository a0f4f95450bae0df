//! Access-check error types.

use printql_proto::TypeId;
use thiserror::Error;

/// Errors raised by access-check services.
#[derive(Debug, Clone, Error)]
pub enum AccessError {
    /// The service could not answer.
    #[error("service failed: {0}")]
    Service(String),

    /// The service does not know the type it was asked about.
    #[error("unknown type: {0}")]
    UnknownType(TypeId),

    /// Invalid capability string format.
    #[error("invalid capability format: {0}")]
    InvalidCapabilityFormat(String),
}

/// Result type for access checks.
pub type AccessResult<T> = std::result::Result<T, AccessError>;
