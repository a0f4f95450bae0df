//! printql protocol types.
//!
//! This crate defines the data exchanged between the selection engine and its
//! collaborators: the parser hands over a [`PrintStatement`], the row source
//! hands over [`Row`]s, and the engine hands back [`Value`]s.
//!
//! # Modules
//!
//! - [`value`] - Runtime values for rows and results
//! - [`identity`] - Record identities and type handles
//! - [`row`] - Raw rows from the tabular query
//! - [`statement`] - Parsed print statements
//! - [`error`] - Protocol error types

pub mod error;
pub mod identity;
pub mod row;
pub mod statement;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use identity::{Identity, TypeId};
pub use row::Row;
pub use statement::{OutputExpr, PhraseDef, PhraseKind, PrintStatement, Step};
pub use value::{value_to_json, Value};
