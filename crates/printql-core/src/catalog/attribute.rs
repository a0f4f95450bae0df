//! Attribute definitions for types.

use super::types::{AttributeKind, ScalarType};
use serde::{Deserialize, Serialize};

/// An attribute definition within a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name (unique within its type).
    pub name: String,
    /// What the attribute holds.
    pub kind: AttributeKind,
}

impl AttributeDef {
    /// Create a new attribute.
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a scalar attribute.
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, AttributeKind::Scalar(scalar))
    }

    /// Create a link to one record of `target`.
    pub fn link_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::link_to(target))
    }

    /// Create a named reverse link: the records of `origin` pointing here via `attribute`.
    pub fn link_from(
        name: impl Into<String>,
        origin: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self::new(name, AttributeKind::link_from(origin, attribute))
    }

    /// Create an attribute set described by `set_type`.
    pub fn attribute_set(name: impl Into<String>, set_type: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::attribute_set(set_type))
    }

    /// Check if this attribute links to another record.
    pub fn is_link(&self) -> bool {
        matches!(self.kind, AttributeKind::LinkTo { .. })
    }
}
