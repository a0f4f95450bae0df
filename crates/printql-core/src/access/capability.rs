//! Capability-based access decisions.
//!
//! Capabilities grant a permission over a scope of types. A scope naming a
//! type also covers its subtypes.

use super::{AccessCheck, AccessError, AccessKind, AccessResult};
use crate::catalog::Schema;
use printql_proto::{Identity, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Scope of type access.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeScope {
    /// Access to all types.
    All,
    /// Access to a type and its subtypes.
    Type(String),
    /// Access to types matching a pattern (e.g., "Invoice*").
    Pattern(String),
}

impl TypeScope {
    /// Check if this scope matches the given type name.
    pub fn matches(&self, type_name: &str) -> bool {
        match self {
            TypeScope::All => true,
            TypeScope::Type(name) => name == type_name,
            TypeScope::Pattern(pattern) => {
                if let Some(prefix) = pattern.strip_suffix('*') {
                    type_name.starts_with(prefix)
                } else if let Some(suffix) = pattern.strip_prefix('*') {
                    type_name.ends_with(suffix)
                } else {
                    type_name == pattern
                }
            }
        }
    }

    /// Check if this scope covers the type or one of its ancestors.
    pub fn covers(&self, schema: &Schema, type_id: TypeId) -> bool {
        schema
            .ancestors(type_id)
            .into_iter()
            .any(|ancestor| self.matches(schema.name(ancestor)))
    }
}

impl fmt::Display for TypeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeScope::All => f.write_str("*"),
            TypeScope::Type(name) | TypeScope::Pattern(name) => f.write_str(name),
        }
    }
}

/// A granted permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Read records.
    Read(TypeScope),
    /// Modify records.
    Modify(TypeScope),
    /// Delete records.
    Delete(TypeScope),
    /// Every permission on every type.
    Admin,
}

impl Capability {
    /// Parse a capability from a string.
    ///
    /// Format: `operation:scope` where:
    /// - operation: `read`, `modify`, `delete` or `admin`
    /// - scope: `*` (all), type name, or pattern
    ///
    /// Examples:
    /// - `read:*` - read all types
    /// - `read:Invoice` - read invoices and their subtypes
    /// - `modify:Doc*` - modify types whose name starts with "Doc"
    /// - `admin` - everything
    pub fn parse(s: &str) -> AccessResult<Self> {
        let (operation, scope) = match s.split_once(':') {
            Some((operation, scope)) => (operation, Some(scope)),
            None => (s, None),
        };
        match operation {
            "admin" => Ok(Capability::Admin),
            "read" => Ok(Capability::Read(Self::parse_scope(scope))),
            "modify" => Ok(Capability::Modify(Self::parse_scope(scope))),
            "delete" => Ok(Capability::Delete(Self::parse_scope(scope))),
            other => Err(AccessError::InvalidCapabilityFormat(format!(
                "unknown capability type: {}",
                other
            ))),
        }
    }

    fn parse_scope(scope: Option<&str>) -> TypeScope {
        match scope {
            None | Some("*") => TypeScope::All,
            Some(s) if s.contains('*') => TypeScope::Pattern(s.to_string()),
            Some(s) => TypeScope::Type(s.to_string()),
        }
    }

    /// Check if this capability grants `kind` on the type.
    pub fn grants(&self, kind: AccessKind, schema: &Schema, type_id: TypeId) -> bool {
        match (self, kind) {
            (Capability::Admin, _) => true,
            (Capability::Read(scope), AccessKind::Read)
            | (Capability::Modify(scope), AccessKind::Modify)
            | (Capability::Delete(scope), AccessKind::Delete) => scope.covers(schema, type_id),
            _ => false,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Admin => f.write_str("admin"),
            Capability::Read(scope) => write!(f, "read:{}", scope),
            Capability::Modify(scope) => write!(f, "modify:{}", scope),
            Capability::Delete(scope) => write!(f, "delete:{}", scope),
        }
    }
}

/// A set of capabilities with efficient lookup.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    capabilities: HashSet<Capability>,
}

impl CapabilitySet {
    /// Create an empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a capability set from a list of capabilities.
    pub fn from_capabilities(caps: Vec<Capability>) -> Self {
        Self {
            capabilities: caps.into_iter().collect(),
        }
    }

    /// Parse capabilities from string representations.
    pub fn from_strings(strings: &[&str]) -> AccessResult<Self> {
        let capabilities: AccessResult<HashSet<Capability>> =
            strings.iter().map(|s| Capability::parse(s)).collect();
        Ok(Self {
            capabilities: capabilities?,
        })
    }

    /// Add a capability to the set.
    pub fn add(&mut self, cap: Capability) {
        self.capabilities.insert(cap);
    }

    /// Check if the set contains a specific capability.
    pub fn contains(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Check if any capability grants `kind` on the type.
    pub fn allows(&self, kind: AccessKind, schema: &Schema, type_id: TypeId) -> bool {
        self.capabilities
            .iter()
            .any(|cap| cap.grants(kind, schema, type_id))
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Get the number of capabilities.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }
}

/// Access service granting by type capabilities, with per-record denials.
#[derive(Debug, Clone)]
pub struct CapabilityAccessCheck {
    schema: Arc<Schema>,
    capabilities: CapabilitySet,
    denied: HashSet<Identity>,
}

impl CapabilityAccessCheck {
    /// Create a service over a schema.
    pub fn new(schema: Arc<Schema>, capabilities: CapabilitySet) -> Self {
        Self {
            schema,
            capabilities,
            denied: HashSet::new(),
        }
    }

    /// Deny one record even when its type is granted.
    pub fn deny_instance(mut self, identity: Identity) -> Self {
        self.denied.insert(identity);
        self
    }
}

impl AccessCheck for CapabilityAccessCheck {
    fn check(
        &self,
        type_id: TypeId,
        kind: AccessKind,
        instances: &HashSet<Identity>,
    ) -> AccessResult<HashMap<Identity, bool>> {
        if self.schema.get(type_id).is_none() {
            return Err(AccessError::UnknownType(type_id));
        }
        let granted = self.capabilities.allows(kind, &self.schema, type_id);
        Ok(instances
            .iter()
            .map(|identity| (*identity, granted && !self.denied.contains(identity)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeDef;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .with_type(TypeDef::new("Document").with_id(1))
                .with_type(TypeDef::new("Invoice").with_id(2).with_parent("Document"))
                .with_type(TypeDef::new("Person").with_id(3))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_scope_matching() {
        assert!(TypeScope::All.matches("Anything"));
        assert!(TypeScope::Type("Invoice".into()).matches("Invoice"));
        assert!(!TypeScope::Type("Invoice".into()).matches("Invoices"));
        assert!(TypeScope::Pattern("Inv*".into()).matches("Invoice"));
        assert!(TypeScope::Pattern("*ice".into()).matches("Invoice"));
        assert!(!TypeScope::Pattern("Per*".into()).matches("Invoice"));
    }

    #[test]
    fn test_scope_covers_subtypes() {
        let schema = schema();
        let document = TypeScope::Type("Document".into());
        assert!(document.covers(&schema, TypeId(2)));
        assert!(!document.covers(&schema, TypeId(3)));
        assert!(!TypeScope::Type("Invoice".into()).covers(&schema, TypeId(1)));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Capability::parse("admin").unwrap(), Capability::Admin);
        assert_eq!(
            Capability::parse("read:Invoice").unwrap(),
            Capability::Read(TypeScope::Type("Invoice".into()))
        );
        assert_eq!(
            Capability::parse("modify:*").unwrap(),
            Capability::Modify(TypeScope::All)
        );
        assert_eq!(
            Capability::parse("delete:Doc*").unwrap(),
            Capability::Delete(TypeScope::Pattern("Doc*".into()))
        );
        assert!(Capability::parse("write:Invoice").is_err());
        assert_eq!(Capability::parse("read:Doc*").unwrap().to_string(), "read:Doc*");
    }

    #[test]
    fn test_capability_set() {
        let schema = schema();
        let set = CapabilitySet::from_strings(&["read:Document", "delete:Person"]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.allows(AccessKind::Read, &schema, TypeId(2)));
        assert!(!set.allows(AccessKind::Read, &schema, TypeId(3)));
        assert!(set.allows(AccessKind::Delete, &schema, TypeId(3)));
        assert!(!set.allows(AccessKind::Modify, &schema, TypeId(1)));

        let admin = CapabilitySet::from_capabilities(vec![Capability::Admin]);
        assert!(admin.allows(AccessKind::Modify, &schema, TypeId(3)));
    }

    #[test]
    fn test_service() {
        let schema = schema();
        let invoice_1 = Identity::new(TypeId(2), 1);
        let invoice_2 = Identity::new(TypeId(2), 2);
        let service = CapabilityAccessCheck::new(
            schema,
            CapabilitySet::from_capabilities(vec![Capability::Read(TypeScope::Type(
                "Invoice".into(),
            ))]),
        )
        .deny_instance(invoice_2);

        let batch: HashSet<Identity> = [invoice_1, invoice_2].into_iter().collect();
        let answer = service.check(TypeId(2), AccessKind::Read, &batch).unwrap();
        assert_eq!(answer[&invoice_1], true);
        assert_eq!(answer[&invoice_2], false);

        let answer = service.check(TypeId(2), AccessKind::Modify, &batch).unwrap();
        assert!(answer.values().all(|allowed| !allowed));

        assert!(matches!(
            service.check(TypeId(42), AccessKind::Read, &batch),
            Err(AccessError::UnknownType(TypeId(42)))
        ));
    }
}
