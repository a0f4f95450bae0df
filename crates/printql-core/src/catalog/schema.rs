//! Schema - the resolved, read-only type tree.

use super::attribute::AttributeDef;
use super::type_def::TypeDef;
use super::types::AttributeKind;
use crate::error::{Error, Result};
use printql_proto::TypeId;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct TypeSlot {
    id: TypeId,
    parent: Option<usize>,
    has_subtypes: bool,
    def: TypeDef,
}

/// A resolved schema: types, their inheritance tree, attributes and
/// classifications.
///
/// Built once and shared read-only (usually behind an `Arc`) by every
/// selection evaluated against it.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: Vec<TypeSlot>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<TypeId, usize>,
}

/// Builder collecting type definitions before resolution.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    types: Vec<TypeDef>,
}

impl SchemaBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type to the schema.
    pub fn with_type(mut self, def: TypeDef) -> Self {
        self.types.push(def);
        self
    }

    /// Add multiple types.
    pub fn with_types(mut self, defs: impl IntoIterator<Item = TypeDef>) -> Self {
        self.types.extend(defs);
        self
    }

    /// Add the type definitions of a JSON array.
    pub fn with_json(self, json: &str) -> Result<Self> {
        let defs: Vec<TypeDef> = serde_json::from_str(json)
            .map_err(|e| Error::InvalidSchema(format!("malformed type list: {}", e)))?;
        Ok(self.with_types(defs))
    }

    /// Resolve names and ids and check the type tree.
    pub fn build(self) -> Result<Schema> {
        let mut by_name = HashMap::new();
        for (index, def) in self.types.iter().enumerate() {
            if by_name.insert(def.name.clone(), index).is_some() {
                return Err(Error::InvalidSchema(format!(
                    "duplicate type '{}'",
                    def.name
                )));
            }
        }

        // Explicit ids first, then fill the gaps sequentially.
        let mut by_id = HashMap::new();
        let mut ids = vec![None; self.types.len()];
        for (index, def) in self.types.iter().enumerate() {
            if let Some(id) = def.id {
                if by_id.insert(TypeId(id), index).is_some() {
                    return Err(Error::InvalidSchema(format!("duplicate type id {}", id)));
                }
                ids[index] = Some(TypeId(id));
            }
        }
        let mut next = 1u32;
        for (index, slot) in ids.iter_mut().enumerate() {
            if slot.is_none() {
                while by_id.contains_key(&TypeId(next)) {
                    next += 1;
                }
                by_id.insert(TypeId(next), index);
                *slot = Some(TypeId(next));
            }
        }

        let mut types = Vec::with_capacity(self.types.len());
        for (def, id) in self.types.into_iter().zip(ids) {
            let parent = match &def.parent {
                Some(name) => Some(
                    *by_name
                        .get(name)
                        .ok_or_else(|| Error::mismatch(def.name.as_str(), name.as_str()))?,
                ),
                None => None,
            };
            types.push(TypeSlot {
                id: id.unwrap_or(TypeId(0)),
                parent,
                has_subtypes: false,
                def,
            });
        }

        let mut schema = Schema {
            types,
            by_name,
            by_id,
        };
        schema.check_tree()?;
        schema.check_references()?;

        let parents: Vec<usize> = schema.types.iter().filter_map(|t| t.parent).collect();
        for parent in parents {
            schema.types[parent].has_subtypes = true;
        }
        Ok(schema)
    }
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    fn check_tree(&self) -> Result<()> {
        for slot in &self.types {
            let mut steps = 0;
            let mut current = slot.parent;
            while let Some(index) = current {
                steps += 1;
                if steps > self.types.len() {
                    return Err(Error::InvalidSchema(format!(
                        "type '{}' has a cyclic parent chain",
                        slot.def.name
                    )));
                }
                current = self.types[index].parent;
            }
        }
        Ok(())
    }

    fn check_references(&self) -> Result<()> {
        for slot in &self.types {
            let def = &slot.def;
            for attribute in &def.attributes {
                let referenced = match &attribute.kind {
                    AttributeKind::Scalar(_) => None,
                    AttributeKind::LinkTo { target } => Some(target),
                    AttributeKind::LinkFrom { origin, .. } => Some(origin),
                    AttributeKind::AttributeSet { set_type } => Some(set_type),
                };
                if let Some(name) = referenced {
                    if !self.by_name.contains_key(name) {
                        return Err(Error::mismatch(
                            format!("{}.{}", def.name, attribute.name),
                            name.as_str(),
                        ));
                    }
                }
            }
            for classification in &def.classifications {
                match self.by_name.get(classification) {
                    Some(&index) if self.types[index].def.is_classification() => {}
                    _ => {
                        return Err(Error::mismatch(def.name.as_str(), classification.as_str()))
                    }
                }
            }
            if let Some(classified) = &def.classifies {
                if !self.by_name.contains_key(classified) {
                    return Err(Error::mismatch(def.name.as_str(), classified.as_str()));
                }
            }
        }
        Ok(())
    }

    /// Number of types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the schema has no types.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Resolve a type name.
    pub fn resolve(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).map(|&index| self.types[index].id)
    }

    /// Get a type definition by id.
    pub fn get(&self, id: TypeId) -> Option<&TypeDef> {
        self.by_id.get(&id).map(|&index| &self.types[index].def)
    }

    /// Get a type definition by name.
    pub fn get_by_name(&self, name: &str) -> Option<&TypeDef> {
        self.by_name.get(name).map(|&index| &self.types[index].def)
    }

    /// Name of a type, for messages.
    pub fn name(&self, id: TypeId) -> &str {
        self.get(id).map(|def| def.name.as_str()).unwrap_or("<unknown>")
    }

    /// Parent of a type.
    pub fn parent(&self, id: TypeId) -> Option<TypeId> {
        let index = *self.by_id.get(&id)?;
        self.types[index].parent.map(|p| self.types[p].id)
    }

    /// The type itself followed by its ancestors, nearest first.
    pub fn ancestors(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut current = self.by_id.get(&id).copied();
        while let Some(index) = current {
            chain.push(self.types[index].id);
            current = self.types[index].parent;
        }
        chain
    }

    /// Check if `id` is `ancestor` or derives from it.
    pub fn is_kind_of(&self, id: TypeId, ancestor: TypeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Check if any type derives from this one.
    pub fn has_subtypes(&self, id: TypeId) -> bool {
        self.by_id
            .get(&id)
            .map(|&index| self.types[index].has_subtypes)
            .unwrap_or(false)
    }

    /// Nearest type every candidate is a kind of.
    pub fn common_ancestor(&self, candidates: &[TypeId]) -> Option<TypeId> {
        let (first, rest) = candidates.split_first()?;
        self.ancestors(*first)
            .into_iter()
            .find(|&ancestor| rest.iter().all(|&c| self.is_kind_of(c, ancestor)))
    }

    /// Find an attribute on a type or its ancestors, returning the declaring type.
    pub fn find_attribute(&self, id: TypeId, name: &str) -> Option<(TypeId, &AttributeDef)> {
        self.ancestors(id).into_iter().find_map(|owner| {
            self.get(owner)
                .and_then(|def| def.get_attribute(name))
                .map(|attribute| (owner, attribute))
        })
    }

    /// Find a classification allowed on a type or its ancestors.
    pub fn find_classification(&self, id: TypeId, name: &str) -> Option<TypeId> {
        let allowed = self.ancestors(id).into_iter().any(|owner| {
            self.get(owner)
                .map(|def| def.classifications.iter().any(|c| c == name))
                .unwrap_or(false)
        });
        if allowed {
            self.resolve(name)
        } else {
            None
        }
    }
}
