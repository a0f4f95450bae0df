//! Access service answering from a fixed decision table.

use super::{AccessCheck, AccessError, AccessKind, AccessResult};
use parking_lot::Mutex;
use printql_proto::{Identity, TypeId};
use std::collections::{HashMap, HashSet};

/// Answers from explicit per-identity decisions and records every call.
///
/// Identities without a decision are left out of the answer, so they are
/// denied. Useful for privileged tooling with precomputed grants and for
/// tests.
#[derive(Debug, Default)]
pub struct StaticAccessCheck {
    decisions: HashMap<Identity, bool>,
    failure: Option<String>,
    calls: Mutex<Vec<(TypeId, usize)>>,
}

impl StaticAccessCheck {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A service whose every call fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Grant an identity.
    pub fn allow(mut self, identity: Identity) -> Self {
        self.decisions.insert(identity, true);
        self
    }

    /// Deny an identity explicitly.
    pub fn deny(mut self, identity: Identity) -> Self {
        self.decisions.insert(identity, false);
        self
    }

    /// Add many decisions.
    pub fn with_decisions(mut self, decisions: impl IntoIterator<Item = (Identity, bool)>) -> Self {
        self.decisions.extend(decisions);
        self
    }

    /// Calls received so far: type and batch size.
    pub fn calls(&self) -> Vec<(TypeId, usize)> {
        self.calls.lock().clone()
    }
}

impl AccessCheck for StaticAccessCheck {
    fn check(
        &self,
        type_id: TypeId,
        _kind: AccessKind,
        instances: &HashSet<Identity>,
    ) -> AccessResult<HashMap<Identity, bool>> {
        self.calls.lock().push((type_id, instances.len()));
        if let Some(message) = &self.failure {
            return Err(AccessError::Service(message.clone()));
        }
        Ok(instances
            .iter()
            .filter_map(|identity| {
                self.decisions
                    .get(identity)
                    .map(|&allowed| (*identity, allowed))
            })
            .collect())
    }
}
