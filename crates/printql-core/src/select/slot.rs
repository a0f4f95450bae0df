//! Buffer slots of a select.

use once_cell::unsync::Lazy;
use printql_proto::{Identity, Value};
use std::fmt;

type Compute = Box<dyn FnOnce() -> Value + Send>;

/// A value computed on first read and memoized.
pub struct Deferred(Lazy<Value, Compute>);

impl Deferred {
    /// Defer a computation.
    pub fn new(compute: impl FnOnce() -> Value + Send + 'static) -> Self {
        Self(Lazy::new(Box::new(compute)))
    }

    /// Compute the value if needed and return it.
    pub fn force(&self) -> &Value {
        Lazy::force(&self.0)
    }

    /// Check if the value was already computed.
    pub fn is_forced(&self) -> bool {
        Lazy::get(&self.0).is_some()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Lazy::get(&self.0) {
            Some(value) => f.debug_tuple("Deferred").field(value).finish(),
            None => f.write_str("Deferred(<pending>)"),
        }
    }
}

/// One buffer entry: a value, a deferred value, or the members of a
/// one-to-many group once the buffer is squashed.
#[derive(Debug)]
pub enum Slot {
    /// A plain value.
    Value(Value),
    /// A value computed on first read.
    Deferred(Box<Deferred>),
    /// Members of a group, in raw row order.
    Group(Vec<Slot>),
}

impl Slot {
    /// A null slot.
    pub fn null() -> Self {
        Slot::Value(Value::Null)
    }

    /// Materialize the slot; groups become lists.
    pub fn resolve(&self) -> Value {
        match self {
            Slot::Value(value) => value.clone(),
            Slot::Deferred(deferred) => deferred.force().clone(),
            Slot::Group(members) => Value::List(members.iter().map(Slot::resolve).collect()),
        }
    }

    /// Members of a group, or the slot itself.
    pub fn members(&self) -> &[Slot] {
        match self {
            Slot::Group(members) => members,
            _ => std::slice::from_ref(self),
        }
    }

    /// The identity held by a plain slot.
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Slot::Value(Value::Identity(identity)) => Some(*identity),
            _ => None,
        }
    }

    /// Check if the slot is a group.
    pub fn is_group(&self) -> bool {
        matches!(self, Slot::Group(_))
    }

    /// Check if the slot holds null without computing anything.
    pub fn is_null(&self) -> bool {
        matches!(self, Slot::Value(Value::Null))
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printql_proto::TypeId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_deferred_computes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let slot = Slot::Deferred(Box::new(Deferred::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::from("computed")
        })));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(slot.resolve(), Value::from("computed"));
        assert_eq!(slot.resolve(), Value::from("computed"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_group_resolves_to_list() {
        let slot = Slot::Group(vec![Slot::from(Value::Int64(1)), Slot::from(Value::Int64(2))]);
        assert!(slot.is_group());
        assert_eq!(slot.members().len(), 2);
        assert_eq!(
            slot.resolve(),
            Value::List(vec![Value::Int64(1), Value::Int64(2)])
        );
        assert_eq!(Slot::Group(Vec::new()).resolve(), Value::List(Vec::new()));
    }

    #[test]
    fn test_scalar_members_and_identity() {
        let identity = Identity::new(TypeId(1), 5);
        let slot = Slot::from(Value::Identity(identity));
        assert_eq!(slot.members().len(), 1);
        assert_eq!(slot.identity(), Some(identity));
        assert!(Slot::null().is_null());
        assert_eq!(Slot::null().identity(), None);
    }

    #[test]
    fn test_deferred_debug() {
        let deferred = Deferred::new(|| Value::Int64(3));
        assert_eq!(format!("{:?}", deferred), "Deferred(<pending>)");
        deferred.force();
        assert!(deferred.is_forced());
        assert_eq!(format!("{:?}", deferred), "Deferred(Int64(3))");
    }
}
