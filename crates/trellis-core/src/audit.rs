//! Whole-graph consistency check.
//!
//! [`verify`] walks every sibling set and page tree and reports what breaks
//! the at-rest invariants. An empty result means the graph is consistent.

use std::fmt;

use serde::Serialize;
use trellis_shared::{ColumnId, ElementId, ElementStatus, KanbanId, PageId, UserId};

use crate::graph::{PageSlot, ResourceGraph};
use crate::sequence::is_dense;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Column serials of a kanban are not `0..n`.
    ColumnSerials { kanban: KanbanId, serials: Vec<u32> },
    /// Serials of one status partition of a column are not `0..n`.
    ElementSerials {
        column: ColumnId,
        status: ElementStatus,
        serials: Vec<u32>,
    },
    /// A trashed element kept a position.
    TrashedSerial { element: ElementId, serial: u32 },
    PageSerials { slot: PageSlot, serials: Vec<u32> },
    /// A user's visit marks are not ranked `0..n`.
    VisitSerials { user: UserId, serials: Vec<u32> },
    /// A page whose parent is missing from the graph.
    OrphanPage { page: PageId, parent: PageId },
    /// `root` disagrees with the parent chain.
    RootMismatch {
        page: PageId,
        expected: Option<PageId>,
        found: Option<PageId>,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnSerials { kanban, serials } => {
                write!(f, "kanban {kanban}: column serials {serials:?}")
            }
            Self::ElementSerials {
                column,
                status,
                serials,
            } => write!(f, "column {column}: {status} serials {serials:?}"),
            Self::TrashedSerial { element, serial } => {
                write!(f, "trashed element {element} has serial {serial}")
            }
            Self::PageSerials { slot, serials } => write!(f, "{slot:?}: page serials {serials:?}"),
            Self::VisitSerials { user, serials } => {
                write!(f, "user {user}: visit mark serials {serials:?}")
            }
            Self::OrphanPage { page, parent } => {
                write!(f, "page {page} points at missing parent {parent}")
            }
            Self::RootMismatch {
                page,
                expected,
                found,
            } => write!(f, "page {page}: root {found:?}, expected {expected:?}"),
        }
    }
}

fn sorted(mut serials: Vec<u32>) -> Vec<u32> {
    serials.sort_unstable();
    serials
}

pub fn verify(graph: &ResourceGraph) -> Vec<Violation> {
    let mut violations = Vec::new();

    let mut kanbans: Vec<KanbanId> = graph.kanbans().map(|k| k.id).collect();
    kanbans.sort();
    for kanban in kanbans {
        let serials: Vec<u32> = graph.columns_of(kanban).iter().map(|c| c.serial_number).collect();
        if !is_dense(serials.iter().copied()) {
            violations.push(Violation::ColumnSerials { kanban, serials });
        }
    }

    let mut columns: Vec<ColumnId> = graph.columns().map(|c| c.id).collect();
    columns.sort();
    for column in columns {
        for status in [ElementStatus::Alive, ElementStatus::Archived] {
            let serials: Vec<u32> = graph
                .partition(column, status)
                .iter()
                .map(|e| e.serial_number)
                .collect();
            if !is_dense(serials.iter().copied()) {
                violations.push(Violation::ElementSerials {
                    column,
                    status,
                    serials: sorted(serials),
                });
            }
        }
        for element in graph.partition(column, ElementStatus::Utilise) {
            if element.serial_number != 0 {
                violations.push(Violation::TrashedSerial {
                    element: element.id,
                    serial: element.serial_number,
                });
            }
        }
    }

    let mut slots: Vec<PageSlot> = graph.page_slots().copied().collect();
    slots.sort();
    for slot in slots {
        let serials: Vec<u32> = graph.pages_in(slot).iter().map(|p| p.serial_number).collect();
        if !is_dense(serials.iter().copied()) {
            violations.push(Violation::PageSerials { slot, serials });
        }
    }

    let mut visitors: Vec<UserId> = graph.visiting_users().collect();
    visitors.sort();
    for user in visitors {
        let serials: Vec<u32> = graph.visits_of(user).iter().map(|m| m.serial_number).collect();
        if !is_dense(serials.iter().copied()) {
            violations.push(Violation::VisitSerials { user, serials });
        }
    }

    let mut pages: Vec<PageId> = graph.pages().map(|p| p.id).collect();
    pages.sort();
    for id in pages {
        let Ok(page) = graph.page(id) else {
            continue;
        };
        let expected = match page.parent {
            None => None,
            Some(parent) => match graph.page(parent) {
                Ok(p) => Some(p.access_root()),
                Err(_) => {
                    violations.push(Violation::OrphanPage { page: id, parent });
                    continue;
                }
            },
        };
        if page.root != expected {
            violations.push(Violation::RootMismatch {
                page: id,
                expected,
                found: page.root,
            });
        }
    }

    violations
}
