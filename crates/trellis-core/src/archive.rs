//! Element lifecycle: ALIVE, ARCHIVED and UTILISE (trash).
//!
//! ALIVE and ARCHIVED elements are ordered independently inside their column.
//! A transition closes the gap in the partition the element leaves and
//! appends it to the end of the partition it enters. Trashed elements carry
//! serial 0 and no position.

use chrono::{DateTime, Utc};
use tracing::info;
use trellis_shared::{ElementId, ElementStatus, KanbanId, SearchType, UserId};

use crate::error::{CoreError, Result};
use crate::graph::Txn;
use crate::kanban::{append_serial, close_partition_gap, drop_element};
use crate::manager::Manager;
use crate::models::KanbanElement;
use crate::persist::Persistence;

/// Move `element` out of its partition and into `status`.
fn change_status(
    txn: &mut Txn<'_>,
    element: &KanbanElement,
    status: ElementStatus,
    user: Option<UserId>,
) -> Result<()> {
    close_partition_gap(txn, element)?;
    let serial = if status.is_ordered() {
        append_serial(txn.graph(), element.column, status)
    } else {
        0
    };
    txn.update_element(element.id, |e| {
        e.status = status;
        e.serial_number = serial;
        if let Some(user) = user {
            e.last_redactor = user;
        }
        e.updated_at = Utc::now();
    })
}

fn matches_query(element: &KanbanElement, search: SearchType, needle: &str) -> bool {
    let name = || element.name.to_lowercase().contains(needle);
    let tag = || {
        element
            .tag
            .as_deref()
            .map(|t| t.to_lowercase().contains(needle))
            .unwrap_or(false)
    };
    (search.matches_name() && name()) || (search.matches_tag() && tag())
}

fn reject_alive(status: ElementStatus) -> Result<()> {
    if status == ElementStatus::Alive {
        return Err(CoreError::InvalidArgument(
            "ALIVE elements are not searchable through the archive".into(),
        ));
    }
    Ok(())
}

impl<P: Persistence> Manager<P> {
    fn transition(
        &mut self,
        action: &'static str,
        login: &str,
        element: ElementId,
        allowed: impl Fn(ElementStatus) -> bool,
        target: ElementStatus,
    ) -> Result<bool> {
        let user = self.principal(login)?;
        let found = self.graph().element(element)?.clone();
        let kanban = self.graph().kanban_of_element(&found)?.id;
        if !self.graph().permissions().can_edit_kanban(kanban, user) {
            Self::denied(action, user);
            return Ok(false);
        }
        if !allowed(found.status) {
            return Err(CoreError::IllegalTransition {
                status: found.status,
                action,
            });
        }

        self.transact(action, |txn| change_status(txn, &found, target, Some(user)))?;
        Ok(true)
    }

    /// Send an element to the end of its column's archive.
    pub fn archive(&mut self, login: &str, element: ElementId) -> Result<bool> {
        self.transition(
            "archive",
            login,
            element,
            |s| s != ElementStatus::Archived,
            ElementStatus::Archived,
        )
    }

    /// Bring an archived or trashed element back to the end of the board.
    pub fn reestablish(&mut self, login: &str, element: ElementId) -> Result<bool> {
        self.transition(
            "reestablish",
            login,
            element,
            |s| s != ElementStatus::Alive,
            ElementStatus::Alive,
        )
    }

    /// Move an element to the trash.
    pub fn utilize(&mut self, login: &str, element: ElementId) -> Result<bool> {
        self.transition(
            "utilize",
            login,
            element,
            |s| s != ElementStatus::Utilise,
            ElementStatus::Utilise,
        )
    }

    /// Permanently remove a trashed element.
    ///
    /// Runs without a principal; the retention sweeper decides when.
    pub fn final_delete(&mut self, element: ElementId) -> Result<()> {
        let found = self.graph().element(element)?;
        if found.status != ElementStatus::Utilise {
            return Err(CoreError::IllegalTransition {
                status: found.status,
                action: "final_delete",
            });
        }

        self.transact("final_delete", |txn| {
            drop_element(txn, element);
            Ok(())
        })?;
        info!(element = %element, "trashed element removed");
        Ok(())
    }

    /// Trashed elements whose last update is older than the retention period.
    pub fn expired_trash(&self, now: DateTime<Utc>) -> Vec<ElementId> {
        let cutoff = now - self.config().trash_retention();
        let mut expired: Vec<&KanbanElement> = self
            .graph()
            .elements()
            .filter(|e| e.status == ElementStatus::Utilise && e.updated_at <= cutoff)
            .collect();
        expired.sort_by_key(|e| e.updated_at);
        expired.into_iter().map(|e| e.id).collect()
    }

    /// Search the archive or the trash of a kanban by name and/or tag.
    pub fn find_elements(
        &self,
        login: &str,
        kanban: KanbanId,
        search: SearchType,
        query: &str,
        status: ElementStatus,
    ) -> Result<Option<Vec<KanbanElement>>> {
        let Some(partition) = self.find_partition(login, kanban, status)? else {
            return Ok(None);
        };
        let needle = query.trim().to_lowercase();
        Ok(Some(
            partition
                .into_iter()
                .filter(|e| matches_query(e, search, &needle))
                .collect(),
        ))
    }

    /// Every element of a kanban in the given non-ALIVE partition, column by
    /// column.
    pub fn find_partition(
        &self,
        login: &str,
        kanban: KanbanId,
        status: ElementStatus,
    ) -> Result<Option<Vec<KanbanElement>>> {
        let user = self.principal(login)?;
        self.graph().kanban(kanban)?;
        reject_alive(status)?;
        if !self.graph().permissions().can_see_kanban(kanban, user) {
            Self::denied("find_partition", user);
            return Ok(None);
        }

        let mut found = Vec::new();
        for column in self.graph().columns_of(kanban) {
            let mut elements: Vec<&KanbanElement> = self
                .graph()
                .elements_of(column.id)
                .filter(|e| e.status == status)
                .collect();
            elements.sort_by(|a, b| {
                a.serial_number
                    .cmp(&b.serial_number)
                    .then(b.updated_at.cmp(&a.updated_at))
            });
            found.extend(elements.into_iter().cloned());
        }
        Ok(Some(found))
    }
}
