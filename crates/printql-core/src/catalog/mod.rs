//! Schema catalog for printql.
//!
//! The catalog describes types, their inheritance tree, attributes and
//! classifications. It is read-only input to the selection engine.

mod attribute;
mod schema;
mod type_def;
mod types;

pub use attribute::AttributeDef;
pub use schema::{Schema, SchemaBuilder};
pub use type_def::TypeDef;
pub use types::{AttributeKind, ScalarType};
