//! Type definitions.

use super::attribute::AttributeDef;
use serde::{Deserialize, Serialize};

/// A type definition as declared to the schema builder.
///
/// Parents, link targets and classifications are referenced by name and
/// resolved when the schema is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Type name (unique within schema).
    pub name: String,
    /// Explicit catalog id; assigned sequentially when absent.
    #[serde(default)]
    pub id: Option<u32>,
    /// Parent type name.
    #[serde(default)]
    pub parent: Option<String>,
    /// Attributes declared on this type (inherited ones live on the parents).
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    /// Classification types that may classify instances of this type.
    #[serde(default)]
    pub classifications: Vec<String>,
    /// Set when this type is itself a classification of another type.
    #[serde(default)]
    pub classifies: Option<String>,
}

impl TypeDef {
    /// Create a new type definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            parent: None,
            attributes: Vec::new(),
            classifications: Vec::new(),
            classifies: None,
        }
    }

    /// Create a classification type for `classified`.
    pub fn classification(name: impl Into<String>, classified: impl Into<String>) -> Self {
        let mut def = Self::new(name);
        def.classifies = Some(classified.into());
        def
    }

    /// Set the catalog id.
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the parent type.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add multiple attributes.
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = AttributeDef>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Allow instances of this type to carry the named classification.
    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classifications.push(classification.into());
        self
    }

    /// Get an attribute declared directly on this type.
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check if this type is a classification.
    pub fn is_classification(&self) -> bool {
        self.classifies.is_some()
    }
}
