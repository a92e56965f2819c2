//! Kanban structure: columns, elements and their ordering.

use chrono::Utc;
use trellis_shared::{ColumnId, CommentId, ElementId, ElementStatus, KanbanId, ProjectId};

use crate::error::{CoreError, Result};
use crate::graph::{Entity, EntityKey, ResourceGraph, Txn};
use crate::manager::Manager;
use crate::models::{ElementComment, Kanban, KanbanColumn, KanbanElement};
use crate::persist::Persistence;
use crate::sequence::{self, ReorderPlan};

/// Editable fields of a kanban element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementDraft {
    pub name: String,
    pub tag: Option<String>,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Sibling views and plan application
// ---------------------------------------------------------------------------

pub(crate) fn column_siblings(graph: &ResourceGraph, kanban: KanbanId) -> Vec<(ColumnId, u32)> {
    graph
        .columns_of(kanban)
        .into_iter()
        .map(|c| (c.id, c.serial_number))
        .collect()
}

pub(crate) fn partition_siblings(
    graph: &ResourceGraph,
    column: ColumnId,
    status: ElementStatus,
) -> Vec<(ElementId, u32)> {
    graph
        .partition(column, status)
        .into_iter()
        .map(|e| (e.id, e.serial_number))
        .collect()
}

pub(crate) fn apply_column_plan(txn: &mut Txn<'_>, plan: &ReorderPlan<ColumnId>) -> Result<()> {
    for shift in plan.shifts() {
        txn.update_column(shift.id, |c| c.serial_number = shift.to)?;
    }
    Ok(())
}

pub(crate) fn apply_element_plan(txn: &mut Txn<'_>, plan: &ReorderPlan<ElementId>) -> Result<()> {
    for shift in plan.shifts() {
        txn.update_element(shift.id, |e| e.serial_number = shift.to)?;
    }
    Ok(())
}

/// Close the gap an element leaves in its current partition.
/// Trashed elements hold no position, so nothing shifts for them.
pub(crate) fn close_partition_gap(txn: &mut Txn<'_>, element: &KanbanElement) -> Result<()> {
    if !element.status.is_ordered() {
        return Ok(());
    }
    let siblings = partition_siblings(txn.graph(), element.column, element.status);
    let plan = sequence::plan_remove(&siblings, element.id)?;
    apply_element_plan(txn, &plan)
}

/// Delete an element and its comments. Leaves the partition gap open.
pub(crate) fn drop_element(txn: &mut Txn<'_>, element: ElementId) {
    let comments: Vec<CommentId> = txn.graph().comments_of(element).iter().map(|c| c.id).collect();
    for comment in comments {
        txn.delete(EntityKey::Comment(comment));
    }
    txn.delete(EntityKey::Element(element));
}

/// Serial an element gets when appended to a partition.
pub(crate) fn append_serial(graph: &ResourceGraph, column: ColumnId, status: ElementStatus) -> u32 {
    sequence::next_serial(&partition_siblings(graph, column, status))
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl<P: Persistence> Manager<P> {
    pub fn create_kanban(&mut self, login: &str, project: ProjectId, name: &str) -> Result<Option<Kanban>> {
        let user = self.principal(login)?;
        self.graph().project(project)?;
        if !self.graph().permissions().can_edit_resources(project, user) {
            Self::denied("create_kanban", user);
            return Ok(None);
        }

        let kanban = Kanban {
            id: KanbanId::new(),
            project,
            name: name.trim().to_string(),
        };
        let created = kanban.clone();
        self.transact("create_kanban", |txn| {
            txn.put(Entity::Kanban(created));
            Ok(())
        })?;
        Ok(Some(kanban))
    }

    /// Columns of a kanban with their ALIVE elements, both in display order.
    pub fn find_kanban(
        &self,
        login: &str,
        kanban: KanbanId,
    ) -> Result<Option<Vec<(KanbanColumn, Vec<KanbanElement>)>>> {
        let user = self.principal(login)?;
        self.graph().kanban(kanban)?;
        if !self.graph().permissions().can_see_kanban(kanban, user) {
            Self::denied("find_kanban", user);
            return Ok(None);
        }

        let board = self
            .graph()
            .columns_of(kanban)
            .into_iter()
            .map(|column| {
                let elements = self
                    .graph()
                    .partition(column.id, ElementStatus::Alive)
                    .into_iter()
                    .cloned()
                    .collect();
                (column.clone(), elements)
            })
            .collect();
        Ok(Some(board))
    }

    pub fn add_column(&mut self, login: &str, kanban: KanbanId, name: &str) -> Result<Option<KanbanColumn>> {
        let user = self.principal(login)?;
        self.graph().kanban(kanban)?;
        if !self.graph().permissions().can_edit_kanban(kanban, user) {
            Self::denied("add_column", user);
            return Ok(None);
        }

        let column = KanbanColumn {
            id: ColumnId::new(),
            kanban,
            name: name.trim().to_string(),
            serial_number: sequence::next_serial(&column_siblings(self.graph(), kanban)),
        };
        let created = column.clone();
        self.transact("add_column", |txn| {
            txn.put(Entity::Column(created));
            Ok(())
        })?;
        Ok(Some(column))
    }

    pub fn rename_column(&mut self, login: &str, column: ColumnId, name: &str) -> Result<bool> {
        let user = self.principal(login)?;
        let kanban = self.graph().column(column)?.kanban;
        if !self.graph().permissions().can_edit_kanban(kanban, user) {
            Self::denied("rename_column", user);
            return Ok(false);
        }

        let name = name.trim().to_string();
        self.transact("rename_column", |txn| txn.update_column(column, |c| c.name = name))?;
        Ok(true)
    }

    /// Delete a column with every element it holds.
    pub fn delete_column(&mut self, login: &str, column: ColumnId) -> Result<bool> {
        let user = self.principal(login)?;
        let kanban = self.graph().column(column)?.kanban;
        if !self.graph().permissions().can_edit_kanban(kanban, user) {
            Self::denied("delete_column", user);
            return Ok(false);
        }

        let plan = sequence::plan_remove(&column_siblings(self.graph(), kanban), column)?;
        let elements: Vec<ElementId> = self.graph().elements_of(column).map(|e| e.id).collect();
        self.transact("delete_column", |txn| {
            for element in elements {
                drop_element(txn, element);
            }
            txn.delete(EntityKey::Column(column));
            apply_column_plan(txn, &plan)
        })?;
        Ok(true)
    }

    /// Move a column to `to` within its kanban.
    pub fn transport_column(&mut self, login: &str, column: ColumnId, to: u32) -> Result<bool> {
        let user = self.principal(login)?;
        let kanban = self.graph().column(column)?.kanban;
        if !self.graph().permissions().can_edit_kanban(kanban, user) {
            Self::denied("transport_column", user);
            return Ok(false);
        }

        let plan = sequence::plan_move(&column_siblings(self.graph(), kanban), column, to)?;
        self.transact("transport_column", |txn| apply_column_plan(txn, &plan))?;
        Ok(true)
    }

    pub fn add_element(
        &mut self,
        login: &str,
        column: ColumnId,
        draft: ElementDraft,
    ) -> Result<Option<KanbanElement>> {
        let user = self.principal(login)?;
        let kanban = self.graph().column(column)?.kanban;
        if !self.graph().permissions().can_edit_kanban(kanban, user) {
            Self::denied("add_element", user);
            return Ok(None);
        }

        let now = Utc::now();
        let element = KanbanElement {
            id: ElementId::new(),
            column,
            owner: user,
            last_redactor: user,
            serial_number: append_serial(self.graph(), column, ElementStatus::Alive),
            name: draft.name.trim().to_string(),
            tag: draft.tag.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            content: draft.content,
            photo: None,
            status: ElementStatus::Alive,
            created_at: now,
            updated_at: now,
        };
        let created = element.clone();
        self.transact("add_element", |txn| {
            txn.put(Entity::Element(created));
            Ok(())
        })?;
        Ok(Some(element))
    }

    pub fn find_element(&self, login: &str, element: ElementId) -> Result<Option<KanbanElement>> {
        let user = self.principal(login)?;
        let found = self.graph().element(element)?;
        let kanban = self.graph().kanban_of_element(found)?.id;
        if !self.graph().permissions().can_see_kanban(kanban, user) {
            Self::denied("find_element", user);
            return Ok(None);
        }
        Ok(Some(found.clone()))
    }

    pub fn edit_element(&mut self, login: &str, element: ElementId, draft: ElementDraft) -> Result<bool> {
        let user = self.principal(login)?;
        let found = self.graph().element(element)?;
        let kanban = self.graph().kanban_of_element(found)?.id;
        if !self.graph().permissions().can_edit_kanban(kanban, user) {
            Self::denied("edit_element", user);
            return Ok(false);
        }

        self.transact("edit_element", |txn| {
            txn.update_element(element, |e| {
                e.name = draft.name.trim().to_string();
                e.tag = draft.tag.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
                e.content = draft.content;
                e.last_redactor = user;
                e.updated_at = Utc::now();
            })
        })?;
        Ok(true)
    }

    pub fn set_element_photo(&mut self, login: &str, element: ElementId, photo: Option<Vec<u8>>) -> Result<bool> {
        let user = self.principal(login)?;
        let found = self.graph().element(element)?;
        let kanban = self.graph().kanban_of_element(found)?.id;
        if !self.graph().permissions().can_edit_kanban(kanban, user) {
            Self::denied("set_element_photo", user);
            return Ok(false);
        }

        self.transact("set_element_photo", |txn| {
            txn.update_element(element, |e| {
                e.photo = photo;
                e.last_redactor = user;
                e.updated_at = Utc::now();
            })
        })?;
        Ok(true)
    }

    /// Remove an element immediately, whatever its status.
    pub fn delete_element(&mut self, login: &str, element: ElementId) -> Result<bool> {
        let user = self.principal(login)?;
        let found = self.graph().element(element)?.clone();
        let kanban = self.graph().kanban_of_element(&found)?.id;
        if !self.graph().permissions().can_edit_kanban(kanban, user) {
            Self::denied("delete_element", user);
            return Ok(false);
        }

        self.transact("delete_element", |txn| {
            drop_element(txn, element);
            close_partition_gap(txn, &found)
        })?;
        Ok(true)
    }

    /// Comment on an element. Anyone who can see the kanban may comment.
    pub fn add_comment(&mut self, login: &str, element: ElementId, text: &str) -> Result<Option<ElementComment>> {
        let user = self.principal(login)?;
        let found = self.graph().element(element)?;
        let kanban = self.graph().kanban_of_element(found)?.id;
        if !self.graph().permissions().can_see_kanban(kanban, user) {
            Self::denied("add_comment", user);
            return Ok(None);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::InvalidArgument("comment text must not be empty".into()));
        }

        let comment = ElementComment {
            id: CommentId::new(),
            element,
            owner: user,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        let created = comment.clone();
        self.transact("add_comment", |txn| {
            txn.put(Entity::Comment(created));
            Ok(())
        })?;
        Ok(Some(comment))
    }

    /// Comments on an element, oldest first.
    pub fn find_comments(&self, login: &str, element: ElementId) -> Result<Option<Vec<ElementComment>>> {
        let user = self.principal(login)?;
        let found = self.graph().element(element)?;
        let kanban = self.graph().kanban_of_element(found)?.id;
        if !self.graph().permissions().can_see_kanban(kanban, user) {
            Self::denied("find_comments", user);
            return Ok(None);
        }
        Ok(Some(
            self.graph().comments_of(element).into_iter().cloned().collect(),
        ))
    }

    /// Move an ALIVE element to index `to` of `dest_column`.
    ///
    /// Within one column this is a plain reorder. Across columns the element
    /// leaves the source's ALIVE partition and is inserted into the
    /// destination's, both inside one transaction. Columns must share a
    /// kanban.
    pub fn transport_element(
        &mut self,
        login: &str,
        element: ElementId,
        dest_column: ColumnId,
        to: u32,
    ) -> Result<bool> {
        let user = self.principal(login)?;
        let moved = self.graph().element(element)?.clone();
        let source = self.graph().column(moved.column)?.clone();
        let dest = self.graph().column(dest_column)?.clone();
        if !self.graph().permissions().can_edit_kanban(source.kanban, user) {
            Self::denied("transport_element", user);
            return Ok(false);
        }
        if moved.status != ElementStatus::Alive {
            return Err(CoreError::IllegalTransition {
                status: moved.status,
                action: "transport",
            });
        }
        if dest.kanban != source.kanban {
            return Err(CoreError::InvalidArgument(format!(
                "column {dest_column} belongs to another kanban"
            )));
        }

        if source.id == dest.id {
            let siblings = partition_siblings(self.graph(), source.id, ElementStatus::Alive);
            let plan = sequence::plan_move(&siblings, element, to)?;
            self.transact("transport_element", |txn| apply_element_plan(txn, &plan))?;
            return Ok(true);
        }

        let removal = sequence::plan_remove(
            &partition_siblings(self.graph(), source.id, ElementStatus::Alive),
            element,
        )?;
        let insertion = sequence::plan_insert(
            &partition_siblings(self.graph(), dest.id, ElementStatus::Alive),
            to,
        )?;
        self.transact("transport_element", |txn| {
            apply_element_plan(txn, &removal)?;
            apply_element_plan(txn, &insertion)?;
            txn.update_element(element, |e| {
                e.column = dest_column;
                e.serial_number = to;
            })
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use trellis_shared::{ElementStatus, ProjectRole};

    use super::*;
    use crate::audit;
    use crate::fixtures::Fixture;

    fn names(fx_manager: &Manager<crate::persist::MemoryJournal>, column: ColumnId) -> Vec<String> {
        fx_manager
            .graph()
            .partition(column, ElementStatus::Alive)
            .into_iter()
            .map(|e| format!("{}({})", e.name, e.serial_number))
            .collect()
    }

    #[test]
    fn reorder_within_column() {
        let mut fx = Fixture::new();
        let kanban = fx.kanban("board");
        let column = fx.column(kanban, "todo");
        fx.element(column, "A");
        let b = fx.element(column, "B");
        fx.element(column, "C");
        let mut manager = fx.manager();

        assert!(manager.transport_element("admin", b, column, 2).unwrap());
        assert_eq!(names(&manager, column), ["A(0)", "C(1)", "B(2)"]);
        assert!(audit::verify(manager.graph()).is_empty());
    }

    #[test]
    fn move_across_columns_keeps_both_dense() {
        let mut fx = Fixture::new();
        let kanban = fx.kanban("board");
        let todo = fx.column(kanban, "todo");
        let done = fx.column(kanban, "done");
        fx.element(todo, "A");
        let b = fx.element(todo, "B");
        fx.element(todo, "C");
        fx.element(done, "X");
        fx.element(done, "Y");
        let mut manager = fx.manager();

        assert!(manager.transport_element("admin", b, done, 1).unwrap());
        assert_eq!(names(&manager, todo), ["A(0)", "C(1)"]);
        assert_eq!(names(&manager, done), ["X(0)", "B(1)", "Y(2)"]);
        assert_eq!(manager.graph().element(b).unwrap().column, done);
        assert!(audit::verify(manager.graph()).is_empty());

        let commit = manager.persistence().last_commit().unwrap();
        assert_eq!(commit.writes().len(), 3, "C, Y and B are rewritten");
    }

    #[test]
    fn append_to_end_of_other_column() {
        let mut fx = Fixture::new();
        let kanban = fx.kanban("board");
        let todo = fx.column(kanban, "todo");
        let done = fx.column(kanban, "done");
        let a = fx.element(todo, "A");
        fx.element(done, "X");
        let mut manager = fx.manager();

        assert!(manager.transport_element("admin", a, done, 1).unwrap());
        assert_eq!(names(&manager, done), ["X(0)", "A(1)"]);
        assert!(matches!(
            manager.transport_element("admin", a, todo, 1),
            Err(CoreError::OutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn out_of_range_leaves_state_untouched() {
        let mut fx = Fixture::new();
        let kanban = fx.kanban("board");
        let column = fx.column(kanban, "todo");
        let a = fx.element(column, "A");
        fx.element(column, "B");
        let mut manager = fx.manager();

        assert_eq!(
            manager.transport_element("admin", a, column, 2),
            Err(CoreError::OutOfRange { index: 2, len: 2 })
        );
        assert_eq!(names(&manager, column), ["A(0)", "B(1)"]);
        assert!(manager.persistence().commits().is_empty());
    }

    #[test]
    fn self_move_commits_nothing() {
        let mut fx = Fixture::new();
        let kanban = fx.kanban("board");
        let column = fx.column(kanban, "todo");
        let a = fx.element(column, "A");
        let mut manager = fx.manager();

        assert!(manager.transport_element("admin", a, column, 0).unwrap());
        assert!(manager.persistence().commits().is_empty());
    }

    #[test]
    fn viewer_cannot_move() {
        let mut fx = Fixture::new();
        let kanban = fx.kanban("board");
        let column = fx.column(kanban, "todo");
        let a = fx.element(column, "A");
        fx.element(column, "B");
        let role = fx.role("viewer", false, &[(kanban, false)], &[]);
        fx.member("vic", ProjectRole::Custom(role));
        let mut manager = fx.manager();

        assert!(!manager.transport_element("vic", a, column, 1).unwrap());
        assert!(!manager.transport_column("vic", column, 0).unwrap());
        assert!(manager.find_kanban("vic", kanban).unwrap().is_some());
    }

    #[test]
    fn moving_columns_and_deleting_them() {
        let mut fx = Fixture::new();
        let kanban = fx.kanban("board");
        let a = fx.column(kanban, "a");
        let b = fx.column(kanban, "b");
        let c = fx.column(kanban, "c");
        fx.element(b, "inside");
        let mut manager = fx.manager();

        assert!(manager.transport_column("admin", a, 2).unwrap());
        let order: Vec<ColumnId> = manager.graph().columns_of(kanban).iter().map(|c| c.id).collect();
        assert_eq!(order, vec![b, c, a]);

        assert!(manager.delete_column("admin", b).unwrap());
        let serials: Vec<(ColumnId, u32)> = column_siblings(manager.graph(), kanban);
        assert_eq!(serials, vec![(c, 0), (a, 1)]);
        assert_eq!(manager.graph().elements().count(), 0);
        assert!(audit::verify(manager.graph()).is_empty());
    }

    #[test]
    fn cross_kanban_moves_are_rejected() {
        let mut fx = Fixture::new();
        let first = fx.kanban("first");
        let second = fx.kanban("second");
        let from = fx.column(first, "todo");
        let to = fx.column(second, "todo");
        let a = fx.element(from, "A");
        let mut manager = fx.manager();

        assert!(matches!(
            manager.transport_element("admin", a, to, 0),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn add_edit_and_delete_elements() {
        let mut fx = Fixture::new();
        let kanban = fx.kanban("board");
        let column = fx.column(kanban, "todo");
        let member = fx.member("sam", ProjectRole::StandardUser);
        let mut manager = fx.manager();

        let a = manager
            .add_element(
                "admin",
                column,
                ElementDraft {
                    name: " A ".into(),
                    tag: Some("  ".into()),
                    content: "first".into(),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(a.name, "A");
        assert_eq!(a.tag, None);
        let b = manager
            .add_element("sam", column, ElementDraft { name: "B".into(), ..Default::default() })
            .unwrap()
            .unwrap();
        assert_eq!(b.serial_number, 1);

        assert!(manager
            .edit_element("sam", a.id, ElementDraft { name: "A2".into(), tag: Some("ux".into()), content: String::new() })
            .unwrap());
        let edited = manager.graph().element(a.id).unwrap();
        assert_eq!(edited.last_redactor, member);
        assert_eq!(edited.tag.as_deref(), Some("ux"));

        assert!(manager.set_element_photo("sam", a.id, Some(vec![1, 2, 3])).unwrap());
        assert!(manager.delete_element("admin", a.id).unwrap());
        assert_eq!(names(&manager, column), ["B(0)"]);
    }

    #[test]
    fn readers_comment_and_comments_follow_their_element() {
        let mut fx = Fixture::new();
        let kanban = fx.kanban("board");
        let hidden = fx.kanban("hidden");
        let column = fx.column(kanban, "todo");
        let secret = fx.column(hidden, "todo");
        let a = fx.element(column, "A");
        let s = fx.element(secret, "S");
        let role = fx.role("readers", false, &[(kanban, false)], &[]);
        let reader = fx.member("rita", ProjectRole::Custom(role));
        let mut manager = fx.manager();

        let first = manager.add_comment("rita", a, "  looks good ").unwrap().unwrap();
        assert_eq!(first.text, "looks good");
        assert_eq!(first.owner, reader);
        manager.add_comment("admin", a, "thanks").unwrap().unwrap();
        assert!(manager.add_comment("rita", s, "hi").unwrap().is_none());
        assert!(matches!(
            manager.add_comment("admin", a, "   "),
            Err(CoreError::InvalidArgument(_))
        ));

        let texts: Vec<String> = manager
            .find_comments("rita", a)
            .unwrap()
            .unwrap()
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, ["looks good", "thanks"]);
        assert!(manager.find_comments("rita", s).unwrap().is_none());

        assert!(manager.delete_element("admin", a).unwrap());
        assert!(manager.graph().comments_of(a).is_empty());
        assert_eq!(manager.persistence().last_commit().unwrap().deletes().len(), 3);
    }
}
