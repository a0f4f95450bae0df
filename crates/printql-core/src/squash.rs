//! Squashing: folds fanned-out raw rows back into logical rows.
//!
//! A one-to-many step multiplies the raw rows of its parent record. Every
//! buffer is regrouped by the identity recurrence at each one-to-many level
//! on its path: the root identity first, then each nested fan-out within the
//! scope of its parent group. Groupings are cached per `(leader row, path)`
//! so every select under the same fan-out is grouped identically.

use crate::select::Slot;
use crate::selection::{PathId, Selection};
use printql_proto::Identity;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Where a raw row goes within its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// First row with its identity; starts a group.
    Leader,
    /// Repeat of the identity first seen at this row.
    Member(usize),
}

/// First-occurrence grouping of a scope's rows by identity.
///
/// Rows without an identity have no record at this level and join no group.
#[derive(Debug, Default)]
struct DirectionMap {
    entries: Vec<(usize, Direction)>,
}

impl DirectionMap {
    fn build(rows: &[usize], identities: &[Option<Identity>]) -> Self {
        let mut leaders: HashMap<Identity, usize> = HashMap::new();
        let mut entries = Vec::with_capacity(rows.len());
        for &row in rows {
            let Some(identity) = identities.get(row).copied().flatten() else {
                continue;
            };
            match leaders.get(&identity) {
                Some(&leader) => entries.push((row, Direction::Member(leader))),
                None => {
                    leaders.insert(identity, row);
                    entries.push((row, Direction::Leader));
                }
            }
        }
        Self { entries }
    }

    /// Row groups in leader order; members keep raw row order.
    fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of: HashMap<usize, usize> = HashMap::new();
        for &(row, direction) in &self.entries {
            match direction {
                Direction::Leader => {
                    group_of.insert(row, groups.len());
                    groups.push(vec![row]);
                }
                Direction::Member(leader) => {
                    if let Some(&group) = group_of.get(&leader) {
                        groups[group].push(row);
                    }
                }
            }
        }
        groups
    }
}

struct Grouper<'a> {
    identities: &'a [Vec<Option<Identity>>],
    cache: HashMap<(usize, PathId), Rc<Vec<Vec<usize>>>>,
}

impl Grouper<'_> {
    fn subgroups(&mut self, rows: &[usize], level: PathId) -> Rc<Vec<Vec<usize>>> {
        let Some(&leader) = rows.first() else {
            return Rc::new(Vec::new());
        };
        let identities = self.identities;
        Rc::clone(self.cache.entry((leader, level)).or_insert_with(|| {
            let column = identities.get(level.0).map(Vec::as_slice).unwrap_or(&[]);
            Rc::new(DirectionMap::build(rows, column).groups())
        }))
    }

    /// Fold the raw slots of `rows` into one slot, nesting one group per level.
    fn collect(
        &mut self,
        raw: &mut [Option<Slot>],
        rows: &[usize],
        levels: &[PathId],
        keep_groups: bool,
    ) -> Slot {
        let Some((&level, rest)) = levels.split_first() else {
            // below the last fan-out every row of the scope carries the same value
            return rows
                .first()
                .and_then(|&row| raw.get_mut(row).and_then(Option::take))
                .unwrap_or_else(Slot::null);
        };
        let subgroups = self.subgroups(rows, level);
        let mut members: Vec<Slot> = subgroups
            .iter()
            .map(|sub| self.collect(raw, sub, rest, keep_groups))
            .collect();
        if !keep_groups && members.len() == 1 {
            members.pop().unwrap_or_else(Slot::null)
        } else {
            Slot::Group(members)
        }
    }
}

/// Regroup every buffer of the selection into logical rows.
pub(crate) fn squash(selection: &mut Selection) {
    if selection.squashed {
        return;
    }
    selection.squashed = true;
    if !selection.is_multi_valued() {
        debug!(rows = selection.raw_rows, "nothing to squash");
        return;
    }

    let identities: Vec<Vec<Option<Identity>>> = selection
        .instance_selects
        .iter()
        .map(|select| select.buffer().iter().map(Slot::identity).collect())
        .collect();
    let all_rows: Vec<usize> = (0..selection.root_select().len()).collect();
    let root = identities.first().map(Vec::as_slice).unwrap_or(&[]);
    let logical = DirectionMap::build(&all_rows, root).groups();

    let plans: Vec<(Vec<PathId>, bool)> = selection
        .instance_selects
        .iter()
        .chain(selection.selects.iter())
        .map(|select| (selection.levels(select.path()), select.is_instance()))
        .collect();

    let mut grouper = Grouper {
        identities: &identities,
        cache: HashMap::new(),
    };
    for (select, (levels, keep_groups)) in selection.all_selects_mut().zip(plans) {
        let mut raw: Vec<Option<Slot>> = select.take_buffer().into_iter().map(Some).collect();
        let squashed = logical
            .iter()
            .map(|rows| grouper.collect(&mut raw, rows, &levels, keep_groups))
            .collect();
        select.replace_buffer(squashed);
    }

    debug!(
        raw_rows = selection.raw_rows,
        logical_rows = logical.len(),
        groupings = grouper.cache.len(),
        "selection squashed"
    );
}
