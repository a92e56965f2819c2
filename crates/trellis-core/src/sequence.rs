//! Serial-number shift planning for ordered sibling sets.
//!
//! A sibling set is any group of items sharing a container and an ordering
//! domain: the columns of a kanban, the ALIVE elements of a column, the pages
//! under one parent. At rest its serial numbers are exactly `0..len`.
//!
//! The planners here never mutate anything. They compute the minimal list of
//! [`Shift`]s that keeps the set dense, and callers apply them inside a
//! [`Txn`](crate::graph::Txn). A moved item's own shift is always last.

use std::fmt::Debug;

use crate::error::{CoreError, Result};

/// One serial-number change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift<Id> {
    pub id: Id,
    pub from: u32,
    pub to: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan<Id> {
    shifts: Vec<Shift<Id>>,
}

impl<Id> Default for ReorderPlan<Id> {
    fn default() -> Self {
        Self { shifts: Vec::new() }
    }
}

impl<Id: Copy> ReorderPlan<Id> {
    pub fn shifts(&self) -> &[Shift<Id>] {
        &self.shifts
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }
}

fn position_of<Id: Copy + Eq + Debug>(siblings: &[(Id, u32)], item: Id) -> Result<u32> {
    siblings
        .iter()
        .find(|(id, _)| *id == item)
        .map(|(_, serial)| *serial)
        .ok_or_else(|| CoreError::InvalidArgument(format!("{item:?} is not in the sibling set")))
}

/// Plan moving `item` to index `to` within its own sibling set.
///
/// `to` must be below the set's size; otherwise nothing is planned and
/// [`CoreError::OutOfRange`] is returned.
pub fn plan_move<Id: Copy + Eq + Debug>(
    siblings: &[(Id, u32)],
    item: Id,
    to: u32,
) -> Result<ReorderPlan<Id>> {
    let len = siblings.len() as u32;
    if to >= len {
        return Err(CoreError::OutOfRange { index: to, len });
    }
    let from = position_of(siblings, item)?;

    let mut shifts = Vec::new();
    if to > from {
        shifts.extend(
            siblings
                .iter()
                .filter(|(_, serial)| *serial > from && *serial <= to)
                .map(|&(id, serial)| Shift {
                    id,
                    from: serial,
                    to: serial - 1,
                }),
        );
    } else if to < from {
        shifts.extend(
            siblings
                .iter()
                .filter(|(_, serial)| *serial >= to && *serial < from)
                .map(|&(id, serial)| Shift {
                    id,
                    from: serial,
                    to: serial + 1,
                }),
        );
    } else {
        return Ok(ReorderPlan::default());
    }

    shifts.push(Shift { id: item, from, to });
    Ok(ReorderPlan { shifts })
}

/// Plan closing the gap left by removing `item` from its sibling set.
/// The removed item itself is not part of the plan.
pub fn plan_remove<Id: Copy + Eq + Debug>(siblings: &[(Id, u32)], item: Id) -> Result<ReorderPlan<Id>> {
    let from = position_of(siblings, item)?;
    let shifts = siblings
        .iter()
        .filter(|(id, serial)| *id != item && *serial > from)
        .map(|&(id, serial)| Shift {
            id,
            from: serial,
            to: serial - 1,
        })
        .collect();
    Ok(ReorderPlan { shifts })
}

/// Plan opening a slot at `to` in a sibling set that is about to grow by one.
///
/// Valid slots are `0..=len`. The arriving item is not part of the plan; the
/// caller assigns it `to` after applying the shifts.
pub fn plan_insert<Id: Copy + Eq + Debug>(siblings: &[(Id, u32)], to: u32) -> Result<ReorderPlan<Id>> {
    let len = siblings.len() as u32;
    if to > len {
        return Err(CoreError::OutOfRange {
            index: to,
            len: len + 1,
        });
    }
    let shifts = siblings
        .iter()
        .filter(|(_, serial)| *serial >= to)
        .map(|&(id, serial)| Shift {
            id,
            from: serial,
            to: serial + 1,
        })
        .collect();
    Ok(ReorderPlan { shifts })
}

/// Serial number for an item appended at the end of the set.
pub fn next_serial<Id>(siblings: &[(Id, u32)]) -> u32 {
    siblings
        .iter()
        .map(|(_, serial)| *serial + 1)
        .max()
        .unwrap_or(0)
}

/// Whether the serials are exactly `0..len` with no gaps or duplicates.
pub fn is_dense(serials: impl IntoIterator<Item = u32>) -> bool {
    let mut serials: Vec<u32> = serials.into_iter().collect();
    serials.sort_unstable();
    serials.iter().enumerate().all(|(i, s)| *s as usize == i)
}
