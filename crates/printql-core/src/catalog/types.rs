//! Core type definitions for the catalog.

use serde::{Deserialize, Serialize};

/// Scalar value kinds an attribute column can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// Fixed-precision decimal, carried as a float.
    Decimal {
        /// Number of digits after decimal point.
        scale: u8,
    },
    /// UTF-8 string.
    String,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
}

impl ScalarType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarType::Int64 | ScalarType::Float64 | ScalarType::Decimal { .. }
        )
    }
}

/// What an attribute holds.
///
/// Flat representation: link targets are referenced by type name and
/// resolved by the schema when it is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// A plain column.
    Scalar(ScalarType),
    /// A foreign key pointing at exactly one record of `target`.
    LinkTo {
        /// Name of the linked type.
        target: String,
    },
    /// The records of `origin` whose `attribute` points back here.
    LinkFrom {
        /// Type holding the link.
        origin: String,
        /// Link attribute on `origin`.
        attribute: String,
    },
    /// A set of sub-records described by `set_type`.
    AttributeSet {
        /// Name of the type describing one set entry.
        set_type: String,
    },
}

impl AttributeKind {
    /// Create a scalar kind.
    pub fn scalar(scalar: ScalarType) -> Self {
        AttributeKind::Scalar(scalar)
    }

    /// Create a link-to kind.
    pub fn link_to(target: impl Into<String>) -> Self {
        AttributeKind::LinkTo {
            target: target.into(),
        }
    }

    /// Create a link-from kind.
    pub fn link_from(origin: impl Into<String>, attribute: impl Into<String>) -> Self {
        AttributeKind::LinkFrom {
            origin: origin.into(),
            attribute: attribute.into(),
        }
    }

    /// Create an attribute-set kind.
    pub fn attribute_set(set_type: impl Into<String>) -> Self {
        AttributeKind::AttributeSet {
            set_type: set_type.into(),
        }
    }

    /// Check if the attribute is backed by a column of its own type.
    pub fn has_column(&self) -> bool {
        matches!(self, AttributeKind::Scalar(_) | AttributeKind::LinkTo { .. })
    }

    /// The scalar kind of the column; links are read as numeric ids.
    pub fn column_type(&self) -> Option<ScalarType> {
        match self {
            AttributeKind::Scalar(scalar) => Some(*scalar),
            AttributeKind::LinkTo { .. } => Some(ScalarType::Int64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_checks() {
        assert!(ScalarType::Int64.is_numeric());
        assert!(ScalarType::Decimal { scale: 2 }.is_numeric());
        assert!(!ScalarType::String.is_numeric());
        assert!(!ScalarType::Timestamp.is_numeric());
    }

    #[test]
    fn test_attribute_kind_columns() {
        assert!(AttributeKind::scalar(ScalarType::String).has_column());
        assert_eq!(
            AttributeKind::link_to("Invoice").column_type(),
            Some(ScalarType::Int64)
        );
        assert!(!AttributeKind::link_from("Position", "Invoice").has_column());
        assert_eq!(AttributeKind::attribute_set("Taxes").column_type(), None);
    }
}
