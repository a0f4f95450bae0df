//! Memoized access decisions for one evaluation.

use super::{AccessCheck, AccessError, AccessKind, AccessResult};
use printql_proto::{Identity, TypeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lazily evaluated access decisions.
///
/// Nothing is checked when built. The first [`has_access`](Access::has_access)
/// call sends every candidate to the service, one batch per type, and
/// memoizes the answers; later calls are lookups. A failed service call is
/// remembered and returned by every later call without asking again.
pub struct Access {
    kind: AccessKind,
    service: Option<Arc<dyn AccessCheck>>,
    candidates: HashSet<Identity>,
    decisions: HashMap<Identity, bool>,
    initialized: bool,
    failure: Option<AccessError>,
}

impl Access {
    /// Register candidates to be checked against `service`.
    pub fn build(
        kind: AccessKind,
        service: Arc<dyn AccessCheck>,
        instances: impl IntoIterator<Item = Identity>,
    ) -> Self {
        Self {
            kind,
            service: Some(service),
            candidates: instances.into_iter().collect(),
            decisions: HashMap::new(),
            initialized: false,
            failure: None,
        }
    }

    /// Grant everything without consulting any service.
    pub fn allow_all() -> Self {
        Self {
            kind: AccessKind::Read,
            service: None,
            candidates: HashSet::new(),
            decisions: HashMap::new(),
            initialized: true,
            failure: None,
        }
    }

    /// The permission checked.
    pub fn kind(&self) -> AccessKind {
        self.kind
    }

    /// Check if this instance grants everything.
    pub fn is_allow_all(&self) -> bool {
        self.service.is_none()
    }

    /// Check if the bulk evaluation ran.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The service failure, once one happened.
    pub fn failure(&self) -> Option<&AccessError> {
        self.failure.as_ref()
    }

    /// Number of registered candidates.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Decide access for one identity; unknown identities are denied.
    pub fn has_access(&mut self, identity: &Identity) -> AccessResult<bool> {
        let Some(service) = self.service.clone() else {
            return Ok(true);
        };
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if !self.initialized {
            if let Err(err) = self.initialize(service.as_ref()) {
                warn!(error = %err, "access service failed");
                self.failure = Some(err.clone());
                return Err(err);
            }
        }
        Ok(self.decisions.get(identity).copied().unwrap_or(false))
    }

    fn initialize(&mut self, service: &dyn AccessCheck) -> AccessResult<()> {
        let mut by_type: BTreeMap<TypeId, HashSet<Identity>> = BTreeMap::new();
        for identity in &self.candidates {
            by_type.entry(identity.type_id).or_default().insert(*identity);
        }

        // committed only once every batch answered
        let mut decisions = HashMap::with_capacity(self.candidates.len());
        for (type_id, batch) in by_type {
            let returned = service.check(type_id, self.kind, &batch)?;
            let granted = batch
                .iter()
                .filter(|identity| returned.get(identity).copied().unwrap_or(false))
                .count();
            debug!(
                type_id = %type_id,
                kind = %self.kind,
                instances = batch.len(),
                granted,
                "access batch checked"
            );
            for identity in batch {
                let allowed = returned.get(&identity).copied().unwrap_or(false);
                decisions.insert(identity, allowed);
            }
        }
        self.decisions = decisions;
        self.initialized = true;
        Ok(())
    }
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Access")
            .field("kind", &self.kind)
            .field("allow_all", &self.is_allow_all())
            .field("candidates", &self.candidates.len())
            .field("decisions", &self.decisions.len())
            .field("initialized", &self.initialized)
            .field("failed", &self.failure.is_some())
            .finish()
    }
}
