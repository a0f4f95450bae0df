//! Elements: the steps of a select's chain.

use super::decode::{read_identity, read_scalar};
use super::slot::{Deferred, Slot};
use crate::catalog::{AttributeDef, ScalarType, Schema};
use crate::exec::ProgramRef;
use crate::format;
use crate::selection::{IdentityColumns, PathId};
use printql_proto::{Row, TypeId, Value};
use std::fmt;
use tracing::warn;

/// One step of a resolved output chain.
///
/// Traversal and attribute elements read their own columns from the raw row;
/// `Format` and `Exec` transform the value produced by their predecessor.
/// Aggregators pass values through and only act when the evaluator reads.
#[derive(Debug, Clone)]
pub enum Element {
    /// Read an attribute column of the record at `path`.
    Attribute {
        attribute: AttributeDef,
        owner: TypeId,
        scalar: ScalarType,
        column: usize,
        path: PathId,
    },
    /// Follow a link to exactly one record.
    LinkTo {
        attribute: String,
        path: PathId,
        identity: IdentityColumns,
    },
    /// Fan out to the records of `origin` linking back here.
    LinkFrom {
        origin: TypeId,
        attribute: String,
        path: PathId,
        identity: IdentityColumns,
    },
    /// Fan out to the classification instances of the record.
    Classification {
        classification: TypeId,
        base: TypeId,
        path: PathId,
        identity: IdentityColumns,
    },
    /// Enter an attribute set entry.
    AttributeSet {
        set_type: TypeId,
        name: String,
        path: PathId,
        identity: IdentityColumns,
    },
    /// The identity of the record at `path`.
    Instance { path: PathId, identity: IdentityColumns },
    /// The `type.id` text of the record at `path`.
    Oid { path: PathId, identity: IdentityColumns },
    /// Format the preceding value.
    Format { pattern: String, path: PathId },
    /// Run a program over the preceding value.
    Exec {
        program: ProgramRef,
        params: Vec<String>,
        path: PathId,
    },
    First,
    Last,
    Join(String),
}

impl Element {
    /// The join path this element reads at; `None` for aggregators.
    pub fn path(&self) -> Option<PathId> {
        match self {
            Element::Attribute { path, .. }
            | Element::LinkTo { path, .. }
            | Element::LinkFrom { path, .. }
            | Element::Classification { path, .. }
            | Element::AttributeSet { path, .. }
            | Element::Instance { path, .. }
            | Element::Oid { path, .. }
            | Element::Format { path, .. }
            | Element::Exec { path, .. } => Some(*path),
            Element::First | Element::Last | Element::Join(_) => None,
        }
    }

    /// Check if this element fans one record out into many rows.
    pub fn is_squashable(&self) -> bool {
        matches!(self, Element::LinkFrom { .. } | Element::Classification { .. })
    }

    /// Check if this element moves to another record.
    pub fn is_traversal(&self) -> bool {
        matches!(
            self,
            Element::LinkTo { .. }
                | Element::LinkFrom { .. }
                | Element::Classification { .. }
                | Element::AttributeSet { .. }
        )
    }

    /// Check if this element is a terminal aggregator.
    pub fn is_aggregator(&self) -> bool {
        matches!(self, Element::First | Element::Last | Element::Join(_))
    }

    /// Identity columns of the record this element reads.
    pub fn identity_columns(&self) -> Option<&IdentityColumns> {
        match self {
            Element::LinkTo { identity, .. }
            | Element::LinkFrom { identity, .. }
            | Element::Classification { identity, .. }
            | Element::AttributeSet { identity, .. }
            | Element::Instance { identity, .. }
            | Element::Oid { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Produce this element's slot for one raw row.
    pub(crate) fn extract(&self, row: &Row, input: Slot, schema: &Schema) -> Slot {
        match self {
            Element::Attribute { scalar, column, .. } => {
                Slot::Value(read_scalar(row, *column, *scalar))
            }
            Element::LinkTo { identity, .. }
            | Element::LinkFrom { identity, .. }
            | Element::Classification { identity, .. }
            | Element::AttributeSet { identity, .. }
            | Element::Instance { identity, .. } => Slot::Value(
                read_identity(row, identity, schema)
                    .map(Value::Identity)
                    .unwrap_or(Value::Null),
            ),
            Element::Oid { identity, .. } => Slot::Value(
                read_identity(row, identity, schema)
                    .map(|identity| Value::String(identity.oid()))
                    .unwrap_or(Value::Null),
            ),
            Element::Format { pattern, .. } => {
                if input.is_null() {
                    return input;
                }
                let pattern = pattern.clone();
                Slot::Deferred(Box::new(Deferred::new(move || {
                    format::apply(&pattern, &input.resolve())
                })))
            }
            Element::Exec { program, params, .. } => {
                let program = program.clone();
                let params = params.clone();
                Slot::Deferred(Box::new(Deferred::new(move || {
                    match program.execute(&input.resolve(), &params) {
                        Ok(value) => value,
                        Err(e) => {
                            warn!(program = program.name(), error = %e, "exec program failed");
                            Value::Null
                        }
                    }
                })))
            }
            Element::First | Element::Last | Element::Join(_) => input,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Attribute { attribute, .. } => write!(f, "attribute[{}]", attribute.name),
            Element::LinkTo { attribute, .. } => write!(f, "linkto[{}]", attribute),
            Element::LinkFrom {
                origin, attribute, ..
            } => write!(f, "linkfrom[{}#{}]", origin, attribute),
            Element::Classification { classification, .. } => {
                write!(f, "class[{}]", classification)
            }
            Element::AttributeSet { name, .. } => write!(f, "attributeset[{}]", name),
            Element::Instance { .. } => f.write_str("instance"),
            Element::Oid { .. } => f.write_str("oid"),
            Element::Format { pattern, .. } => write!(f, "format[{}]", pattern),
            Element::Exec { program, .. } => write!(f, "exec[{}]", program.name()),
            Element::First => f.write_str("first"),
            Element::Last => f.write_str("last"),
            Element::Join(separator) => write!(f, "join[{}]", separator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeDef;
    use crate::exec::{ExecError, ProgramRegistry};
    use printql_proto::Identity;

    fn schema() -> Schema {
        Schema::builder()
            .with_type(TypeDef::new("Invoice").with_id(1))
            .build()
            .unwrap()
    }

    fn root() -> IdentityColumns {
        IdentityColumns {
            id: 0,
            type_column: None,
            declared: TypeId(1),
        }
    }

    #[test]
    fn test_attribute_and_instance() {
        let schema = schema();
        let row = Row::new(vec![Value::Int64(4), Value::from("INV-4")]);
        let name = Element::Attribute {
            attribute: AttributeDef::scalar("Name", ScalarType::String),
            owner: TypeId(1),
            scalar: ScalarType::String,
            column: 1,
            path: PathId::ROOT,
        };
        let instance = Element::Instance {
            path: PathId::ROOT,
            identity: root(),
        };
        let oid = Element::Oid {
            path: PathId::ROOT,
            identity: root(),
        };

        assert_eq!(name.extract(&row, Slot::null(), &schema).resolve(), Value::from("INV-4"));
        assert_eq!(
            instance.extract(&row, Slot::null(), &schema).identity(),
            Some(Identity::new(TypeId(1), 4))
        );
        assert_eq!(oid.extract(&row, Slot::null(), &schema).resolve(), Value::from("1.4"));
    }

    #[test]
    fn test_capabilities() {
        let link_from = Element::LinkFrom {
            origin: TypeId(2),
            attribute: "Invoice".into(),
            path: PathId(1),
            identity: root(),
        };
        assert!(link_from.is_squashable());
        assert!(link_from.is_traversal());
        assert_eq!(link_from.path(), Some(PathId(1)));
        assert!(link_from.identity_columns().is_some());

        let link_to = Element::LinkTo {
            attribute: "Customer".into(),
            path: PathId(2),
            identity: root(),
        };
        assert!(!link_to.is_squashable());
        assert!(link_to.is_traversal());

        assert!(Element::Join(",".into()).is_aggregator());
        assert_eq!(Element::First.path(), None);
    }

    #[test]
    fn test_format_is_deferred() {
        let schema = schema();
        let row = Row::new(vec![Value::Int64(1)]);
        let element = Element::Format {
            pattern: "0.00".into(),
            path: PathId::ROOT,
        };
        let slot = element.extract(&row, Slot::from(Value::Float64(2.5)), &schema);
        assert!(matches!(slot, Slot::Deferred(_)));
        assert_eq!(slot.resolve(), Value::from("2.50"));

        let slot = element.extract(&row, Slot::null(), &schema);
        assert!(slot.is_null());
    }

    #[test]
    fn test_exec_failure_is_null() {
        let schema = schema();
        let registry = ProgramRegistry::new().with_program(
            "fail",
            |_: &Value, _: &[String]| -> Result<Value, ExecError> { Err(ExecError::new("boom")) },
        );
        let element = Element::Exec {
            program: registry.get("fail").unwrap(),
            params: Vec::new(),
            path: PathId::ROOT,
        };
        let row = Row::new(vec![Value::Int64(1)]);
        let slot = element.extract(&row, Slot::from(Value::Int64(3)), &schema);
        assert_eq!(slot.resolve(), Value::Null);
    }
}
