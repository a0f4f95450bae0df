//! Protocol error types.

use thiserror::Error;

/// Errors raised while validating data handed over by collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The statement is structurally invalid (empty expression, misplaced aggregator, ...).
    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    /// An OID string could not be parsed.
    #[error("invalid oid: {0}")]
    InvalidOid(String),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidStatement("empty output expression".to_string());
        assert!(err.to_string().contains("empty output expression"));

        let err = Error::InvalidOid("abc".to_string());
        assert_eq!(err.to_string(), "invalid oid: abc");
    }
}
