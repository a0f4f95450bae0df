//! Record identities.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque handle to a type in the schema catalog.
///
/// The numeric value is the catalog's own identifier; the engine never
/// interprets it beyond equality and hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `(type, id)` reference to a stored record.
///
/// Identities are the unit of access control and the grouping key used when
/// one-to-many rows are folded back into logical rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    /// Concrete type of the record.
    pub type_id: TypeId,
    /// Numeric record id, unique within the type.
    pub id: u64,
}

impl Identity {
    /// Create a new identity.
    pub fn new(type_id: TypeId, id: u64) -> Self {
        Self { type_id, id }
    }

    /// The `type.id` string form.
    pub fn oid(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_id.0, self.id)
    }
}

impl FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (type_part, id_part) = s
            .split_once('.')
            .ok_or_else(|| Error::InvalidOid(s.to_string()))?;
        let type_id = type_part
            .parse::<u32>()
            .map_err(|_| Error::InvalidOid(s.to_string()))?;
        let id = id_part
            .parse::<u64>()
            .map_err(|_| Error::InvalidOid(s.to_string()))?;
        Ok(Identity::new(TypeId(type_id), id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_equality_and_hash() {
        let a = Identity::new(TypeId(1), 10);
        let b = Identity::new(TypeId(1), 10);
        let c = Identity::new(TypeId(2), 10);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_oid_parse() {
        let identity: Identity = "42.1001".parse().unwrap();
        assert_eq!(identity, Identity::new(TypeId(42), 1001));
        assert_eq!(identity.oid(), "42.1001");

        assert!("42".parse::<Identity>().is_err());
        assert!("x.1".parse::<Identity>().is_err());
        assert!("1.-5".parse::<Identity>().is_err());
    }
}
