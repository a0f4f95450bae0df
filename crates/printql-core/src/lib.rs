//! printql core - selection evaluation engine.
//!
//! Turns a parsed print statement into typed, access-filtered result rows:
//! the statement is resolved against the schema into a [`Selection`], raw
//! rows from a [`RowSource`] are ingested and squashed back into logical
//! rows, and an [`Evaluator`] walks them while hiding every record the caller
//! may not see.
//!
//! # Example
//!
//! ```ignore
//! let schema = Arc::new(Schema::builder().with_types(types).build()?);
//! let statement = PrintStatement::for_type("Invoice")
//!     .select(OutputExpr::attribute("Name"));
//! let selection = Selection::build(&statement, &schema)?;
//! let mut evaluator = Evaluator::execute(selection, &mut source, service, EvaluatorConfig::default())?;
//! while evaluator.next()? {
//!     println!("{}", evaluator.get(0)?);
//! }
//! ```

pub mod access;
pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod exec;
pub mod format;
pub mod phrase;
pub mod select;
pub mod selection;
pub mod source;
mod squash;

pub use access::{
    Access, AccessCheck, AccessError, AccessKind, AccessResult, Capability, CapabilityAccessCheck,
    CapabilitySet, StaticAccessCheck, TypeScope,
};
pub use catalog::{AttributeDef, AttributeKind, ScalarType, Schema, SchemaBuilder, TypeDef};
pub use config::{EvaluatorConfig, SelectionBudget};
pub use error::{Error, Result};
pub use evaluator::{Evaluator, OutputRef, RowMap};
pub use exec::{ExecError, ExecProgram, ProgramRegistry};
pub use phrase::{MessageFormatter, PhraseHelper, PositionalFormatter};
pub use select::{Element, RowDecodeWarning, Select, Slot};
pub use selection::{
    ColumnKind, ColumnLayout, ColumnSpec, IdentityColumns, JoinPath, PathId, PhraseBinding,
    Selection,
};
pub use source::RowSource;

/// Re-export protocol types.
pub use printql_proto as proto;
