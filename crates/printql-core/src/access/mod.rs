//! Record-level access control.
//!
//! The evaluator never asks about one record at a time. It collects every
//! identity reachable from the squashed selection, hands them to [`Access`],
//! and the first lookup triggers one [`AccessCheck::check`] call per type.
//!
//! # Example
//!
//! ```ignore
//! use printql_core::access::{Capability, CapabilityAccessCheck, CapabilitySet, TypeScope};
//!
//! let capabilities = CapabilitySet::from_capabilities(vec![
//!     Capability::Read(TypeScope::Type("Invoice".to_string())),
//! ]);
//! let service = CapabilityAccessCheck::new(schema, capabilities);
//! let evaluator = Evaluator::new(selection, Arc::new(service), EvaluatorConfig::default());
//! ```

mod capability;
mod decision;
mod error;
mod fixed;

pub use capability::{Capability, CapabilityAccessCheck, CapabilitySet, TypeScope};
pub use decision::Access;
pub use error::{AccessError, AccessResult};
pub use fixed::StaticAccessCheck;

use printql_proto::{Identity, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// The permission being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Read the record.
    Read,
    /// Change the record.
    Modify,
    /// Delete the record.
    Delete,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Read => write!(f, "read"),
            AccessKind::Modify => write!(f, "modify"),
            AccessKind::Delete => write!(f, "delete"),
        }
    }
}

/// External access-decision service.
///
/// Called once per type with every instance of that type the evaluator may
/// surface. Instances missing from the returned map are denied.
pub trait AccessCheck: Send + Sync {
    /// Decide access for a batch of instances of one type.
    fn check(
        &self,
        type_id: TypeId,
        kind: AccessKind,
        instances: &HashSet<Identity>,
    ) -> AccessResult<HashMap<Identity, bool>>;
}
