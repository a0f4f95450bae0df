//! Access masking and terminal aggregation of one output value.
//!
//! A squashed value nests one group per fan-out level on its path. Walking
//! it level by level, every access-checked record on the way is looked up
//! in the identity select of its path at the same group position: a denied
//! record nulls a scalar and drops a group member. Aggregators run on what
//! is left.

use crate::access::Access;
use crate::error::Result;
use crate::select::{Element, Select, Slot};
use crate::selection::{PathId, Selection};
use printql_proto::{Identity, Value};

/// Read `select` at logical row `row`, masked and aggregated.
pub(crate) fn read(
    selection: &Selection,
    access: &mut Access,
    select: &Select,
    row: usize,
    default_separator: &str,
) -> Result<Value> {
    let Some(slot) = select.buffer().get(row) else {
        return Ok(Value::Null);
    };
    let checked: Vec<(PathId, usize)> = selection
        .checked_paths(select.path())
        .into_iter()
        .map(|path| (path, selection.levels(path).len()))
        .collect();
    let mut mask = Mask {
        selection,
        access,
        row,
        levels: selection.levels(select.path()),
        checked,
        keep_groups: select.is_instance(),
        keep_outer: select.aggregator().is_some(),
    };
    let mut position = Vec::new();
    let value = mask.filter(slot, &mut position)?.unwrap_or(Value::Null);
    Ok(aggregate(value, select.aggregator(), default_separator))
}

struct Mask<'a> {
    selection: &'a Selection,
    access: &'a mut Access,
    row: usize,
    levels: Vec<PathId>,
    checked: Vec<(PathId, usize)>,
    keep_groups: bool,
    /// Aggregators read the outermost group as a list, even with one member.
    keep_outer: bool,
}

impl Mask<'_> {
    /// Slot of `path`'s identity select at the current group position.
    fn identity_at(&self, path: PathId, position: &[usize]) -> Option<&Slot> {
        let mut slot = self.selection.instance_select(path)?.buffer().get(self.row)?;
        for &index in position {
            slot = slot.members().get(index)?;
        }
        Some(slot)
    }

    fn allowed(&mut self, identity: Option<Identity>) -> Result<bool> {
        match identity {
            Some(identity) => Ok(self.access.has_access(&identity)?),
            // no record, nothing to hide
            None => Ok(true),
        }
    }

    /// `None` when the value at this position is denied.
    fn filter(&mut self, slot: &Slot, position: &mut Vec<usize>) -> Result<Option<Value>> {
        let depth = position.len();
        let here: Vec<PathId> = self
            .checked
            .iter()
            .filter(|(_, level)| *level == depth)
            .map(|(path, _)| *path)
            .collect();
        for path in here {
            let identity = self.identity_at(path, position).and_then(Slot::identity);
            if !self.allowed(identity)? {
                return Ok(None);
            }
        }

        let Some(&level) = self.levels.get(depth) else {
            return Ok(Some(slot.resolve()));
        };
        let member_count = self
            .identity_at(level, position)
            .map_or(0, |group| group.members().len());
        // squashing stored a lone member in place of its group
        let collapsed = !self.keep_groups && member_count == 1;
        let members: &[Slot] = if collapsed {
            std::slice::from_ref(slot)
        } else {
            slot.members()
        };

        let mut kept = Vec::with_capacity(members.len());
        for (index, member) in members.iter().enumerate() {
            position.push(index);
            let value = self.filter(member, position)?;
            position.pop();
            kept.extend(value);
        }
        if collapsed && !(self.keep_outer && depth == 0) {
            Ok(kept.pop())
        } else {
            Ok(Some(Value::List(kept)))
        }
    }
}

/// Apply a terminal aggregator to a masked value.
pub(crate) fn aggregate(value: Value, aggregator: Option<&Element>, default_separator: &str) -> Value {
    match (aggregator, value) {
        (Some(Element::First), Value::List(items)) => {
            items.into_iter().next().unwrap_or(Value::Null)
        }
        (Some(Element::Last), Value::List(items)) => items.into_iter().last().unwrap_or(Value::Null),
        (Some(Element::Join(_)), Value::Null) => Value::Null,
        (Some(Element::Join(separator)), value) => {
            let separator = if separator.is_empty() {
                default_separator
            } else {
                separator.as_str()
            };
            let parts: Vec<String> = match value {
                Value::List(items) => items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| item.to_string())
                    .collect(),
                scalar => vec![scalar.to_string()],
            };
            Value::String(parts.join(separator))
        }
        (_, value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Value {
        Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")])
    }

    #[test]
    fn test_aggregators() {
        assert_eq!(aggregate(abc(), Some(&Element::First), ", "), Value::from("a"));
        assert_eq!(aggregate(abc(), Some(&Element::Last), ", "), Value::from("c"));
        assert_eq!(
            aggregate(abc(), Some(&Element::Join("-".into())), ", "),
            Value::from("a-b-c")
        );
        assert_eq!(aggregate(abc(), None, ", "), abc());
    }

    #[test]
    fn test_join_edge_cases() {
        let join = Element::Join(String::new());
        assert_eq!(aggregate(abc(), Some(&join), "; "), Value::from("a; b; c"));
        assert_eq!(
            aggregate(Value::List(Vec::new()), Some(&join), ", "),
            Value::from("")
        );
        assert_eq!(aggregate(Value::Null, Some(&join), ", "), Value::Null);
        assert_eq!(
            aggregate(
                Value::List(vec![Value::Int64(1), Value::Null, Value::Int64(2)]),
                Some(&Element::Join(",".into())),
                ", "
            ),
            Value::from("1,2")
        );
        assert_eq!(aggregate(Value::Int64(7), Some(&join), ", "), Value::from("7"));
    }

    #[test]
    fn test_first_last_of_empty_and_scalar() {
        let empty = Value::List(Vec::new());
        assert_eq!(aggregate(empty.clone(), Some(&Element::First), ", "), Value::Null);
        assert_eq!(aggregate(empty, Some(&Element::Last), ", "), Value::Null);
        assert_eq!(
            aggregate(Value::Int64(5), Some(&Element::First), ", "),
            Value::Int64(5)
        );
    }
}
