//! Core error types.

use crate::access::AccessError;
use thiserror::Error;

/// Selection engine errors.
///
/// Everything here is fatal for the statement being evaluated. Per-row data
/// problems are not errors; see [`RowDecodeWarning`](crate::select::RowDecodeWarning).
#[derive(Debug, Error)]
pub enum Error {
    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] printql_proto::Error),

    /// A type, attribute or classification name does not resolve.
    #[error("schema mismatch: '{name}' does not resolve on {on}")]
    SchemaMismatch {
        /// Where the lookup happened (a type name or "schema").
        on: String,
        /// The name that failed to resolve.
        name: String,
    },

    /// The candidate base types share no common ancestor.
    #[error("no common type for [{}]", .0.join(", "))]
    NoCommonType(Vec<String>),

    /// The schema definition itself is inconsistent.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// An exec step names a program that is not registered.
    #[error("unknown program: {0}")]
    UnknownProgram(String),

    /// The access-check service failed.
    #[error("access service error: {0}")]
    AccessService(#[from] AccessError),

    /// A selection budget was exceeded.
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    /// No output with the given index or alias.
    #[error("unknown output: {0}")]
    UnknownOutput(String),

    /// A value was read before the cursor was positioned on a row.
    #[error("cursor is not positioned on a row")]
    NoCurrentRow,

    /// A message phrase could not be formatted.
    #[error("phrase error: {0}")]
    Phrase(String),

    /// Row source failure.
    #[error("row source error: {0}")]
    RowSource(String),
}

impl Error {
    /// Shorthand for a schema mismatch.
    pub fn mismatch(on: impl Into<String>, name: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            on: on.into(),
            name: name.into(),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
