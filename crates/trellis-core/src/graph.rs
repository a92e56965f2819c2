//! In-memory resource graph.
//!
//! Entities live in id-keyed maps. Parent/child relations are id fields on
//! the child plus the reverse indexes kept here (`columns_by_kanban`,
//! `elements_by_column`, `pages_by_slot`, ...). All writes go through
//! [`ResourceGraph::upsert`] / [`ResourceGraph::remove`] so the indexes never
//! drift from the entities.
//!
//! [`Txn`] wraps a mutable borrow of the graph for the duration of one public
//! operation. It records a before-image of every entity it touches and the
//! resulting [`ChangeSet`], so the operation can either be committed to the
//! persistence collaborator or rolled back in memory.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use trellis_shared::{
    ColumnId, CommentId, ElementId, ElementStatus, KanbanId, PageId, ProjectId, ResourceKind, RoleId,
    UserId,
};

use crate::error::{CoreError, Result};
use crate::models::{
    CustomRole, ElementComment, Kanban, KanbanColumn, KanbanElement, Page, Project, User,
    UserConnector, VisitMark,
};

// ---------------------------------------------------------------------------
// Entity envelope
// ---------------------------------------------------------------------------

/// Any entity stored in the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Entity {
    User(User),
    Project(Project),
    Membership(UserConnector),
    Role(CustomRole),
    Kanban(Kanban),
    Column(KanbanColumn),
    Element(KanbanElement),
    Comment(ElementComment),
    Page(Page),
    VisitMark(VisitMark),
}

/// Primary key of an [`Entity`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityKey {
    User(UserId),
    Project(ProjectId),
    Membership(ProjectId, UserId),
    Role(RoleId),
    Kanban(KanbanId),
    Column(ColumnId),
    Element(ElementId),
    Comment(CommentId),
    Page(PageId),
    VisitMark(UserId, PageId),
}

impl Entity {
    pub fn key(&self) -> EntityKey {
        match self {
            Self::User(u) => EntityKey::User(u.id),
            Self::Project(p) => EntityKey::Project(p.id),
            Self::Membership(m) => EntityKey::Membership(m.project, m.user),
            Self::Role(r) => EntityKey::Role(r.id),
            Self::Kanban(k) => EntityKey::Kanban(k.id),
            Self::Column(c) => EntityKey::Column(c.id),
            Self::Element(e) => EntityKey::Element(e.id),
            Self::Comment(c) => EntityKey::Comment(c.id),
            Self::Page(p) => EntityKey::Page(p.id),
            Self::VisitMark(v) => EntityKey::VisitMark(v.user, v.page),
        }
    }
}

impl EntityKey {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::User(_) => ResourceKind::User,
            Self::Project(_) => ResourceKind::Project,
            Self::Membership(..) => ResourceKind::Membership,
            Self::Role(_) => ResourceKind::Role,
            Self::Kanban(_) => ResourceKind::Kanban,
            Self::Column(_) => ResourceKind::Column,
            Self::Element(_) => ResourceKind::Element,
            Self::Comment(_) => ResourceKind::Comment,
            Self::Page(_) => ResourceKind::Page,
            Self::VisitMark(..) => ResourceKind::VisitMark,
        }
    }
}

/// Sibling container of a page: the project's top level, or a parent page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PageSlot {
    Top(ProjectId),
    Under(PageId),
}

impl PageSlot {
    pub fn of(page: &Page) -> Self {
        match page.parent {
            Some(parent) => Self::Under(parent),
            None => Self::Top(page.project),
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    users: HashMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    projects: HashMap<ProjectId, Project>,
    memberships: HashMap<(ProjectId, UserId), UserConnector>,
    roles: HashMap<RoleId, CustomRole>,
    roles_by_project: HashMap<ProjectId, BTreeSet<RoleId>>,
    kanbans: HashMap<KanbanId, Kanban>,
    kanbans_by_project: HashMap<ProjectId, BTreeSet<KanbanId>>,
    columns: HashMap<ColumnId, KanbanColumn>,
    columns_by_kanban: HashMap<KanbanId, BTreeSet<ColumnId>>,
    elements: HashMap<ElementId, KanbanElement>,
    elements_by_column: HashMap<ColumnId, BTreeSet<ElementId>>,
    comments: HashMap<CommentId, ElementComment>,
    comments_by_element: HashMap<ElementId, BTreeSet<CommentId>>,
    pages: HashMap<PageId, Page>,
    pages_by_slot: HashMap<PageSlot, BTreeSet<PageId>>,
    pages_by_project: HashMap<ProjectId, BTreeSet<PageId>>,
    visit_marks: HashMap<(UserId, PageId), VisitMark>,
    visits_by_user: HashMap<UserId, BTreeSet<PageId>>,
    visitors_by_page: HashMap<PageId, BTreeSet<UserId>>,
}

fn index_add<K: std::hash::Hash + Eq, V: Ord>(index: &mut HashMap<K, BTreeSet<V>>, key: K, value: V) {
    index.entry(key).or_default().insert(value);
}

fn index_drop<K: std::hash::Hash + Eq, V: Ord>(index: &mut HashMap<K, BTreeSet<V>>, key: &K, value: &V) {
    if let Some(set) = index.get_mut(key) {
        set.remove(value);
        if set.is_empty() {
            index.remove(key);
        }
    }
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a flat list of entities, e.g. rows loaded from a
    /// store. Order does not matter.
    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut graph = Self::new();
        for entity in entities {
            graph.upsert(entity);
        }
        graph
    }

    /// Every entity in the graph, parents before children.
    pub fn entities(&self) -> Vec<Entity> {
        let mut out = Vec::new();
        out.extend(self.users.values().cloned().map(Entity::User));
        out.extend(self.projects.values().cloned().map(Entity::Project));
        out.extend(self.kanbans.values().cloned().map(Entity::Kanban));
        out.extend(self.columns.values().cloned().map(Entity::Column));
        out.extend(self.elements.values().cloned().map(Entity::Element));
        out.extend(self.comments.values().cloned().map(Entity::Comment));
        // Parents before children so a store with immediate FK checks accepts
        // the sequence.
        let mut pages: Vec<&Page> = self.pages.values().collect();
        pages.sort_by_key(|p| self.depth(p.id));
        out.extend(pages.into_iter().cloned().map(Entity::Page));
        out.extend(self.visit_marks.values().cloned().map(Entity::VisitMark));
        out.extend(self.roles.values().cloned().map(Entity::Role));
        out.extend(self.memberships.values().cloned().map(Entity::Membership));
        out
    }

    // ------------------------------------------------------------------
    // Generic write path
    // ------------------------------------------------------------------

    /// Insert or replace an entity, returning the previous version.
    pub fn upsert(&mut self, entity: Entity) -> Option<Entity> {
        let previous = self.remove(entity.key());
        match entity {
            Entity::User(user) => {
                self.usernames.insert(user.username.clone(), user.id);
                self.users.insert(user.id, user);
            }
            Entity::Project(project) => {
                self.projects.insert(project.id, project);
            }
            Entity::Membership(m) => {
                self.memberships.insert((m.project, m.user), m);
            }
            Entity::Role(role) => {
                index_add(&mut self.roles_by_project, role.project, role.id);
                self.roles.insert(role.id, role);
            }
            Entity::Kanban(kanban) => {
                index_add(&mut self.kanbans_by_project, kanban.project, kanban.id);
                self.kanbans.insert(kanban.id, kanban);
            }
            Entity::Column(column) => {
                index_add(&mut self.columns_by_kanban, column.kanban, column.id);
                self.columns.insert(column.id, column);
            }
            Entity::Element(element) => {
                index_add(&mut self.elements_by_column, element.column, element.id);
                self.elements.insert(element.id, element);
            }
            Entity::Comment(comment) => {
                index_add(&mut self.comments_by_element, comment.element, comment.id);
                self.comments.insert(comment.id, comment);
            }
            Entity::Page(page) => {
                index_add(&mut self.pages_by_slot, PageSlot::of(&page), page.id);
                index_add(&mut self.pages_by_project, page.project, page.id);
                self.pages.insert(page.id, page);
            }
            Entity::VisitMark(mark) => {
                index_add(&mut self.visits_by_user, mark.user, mark.page);
                index_add(&mut self.visitors_by_page, mark.page, mark.user);
                self.visit_marks.insert((mark.user, mark.page), mark);
            }
        }
        previous
    }

    /// Remove a single entity. Does not cascade.
    pub fn remove(&mut self, key: EntityKey) -> Option<Entity> {
        match key {
            EntityKey::User(id) => {
                let user = self.users.remove(&id)?;
                self.usernames.remove(&user.username);
                Some(Entity::User(user))
            }
            EntityKey::Project(id) => self.projects.remove(&id).map(Entity::Project),
            EntityKey::Membership(project, user) => {
                self.memberships.remove(&(project, user)).map(Entity::Membership)
            }
            EntityKey::Role(id) => {
                let role = self.roles.remove(&id)?;
                index_drop(&mut self.roles_by_project, &role.project, &role.id);
                Some(Entity::Role(role))
            }
            EntityKey::Kanban(id) => {
                let kanban = self.kanbans.remove(&id)?;
                index_drop(&mut self.kanbans_by_project, &kanban.project, &kanban.id);
                Some(Entity::Kanban(kanban))
            }
            EntityKey::Column(id) => {
                let column = self.columns.remove(&id)?;
                index_drop(&mut self.columns_by_kanban, &column.kanban, &column.id);
                Some(Entity::Column(column))
            }
            EntityKey::Element(id) => {
                let element = self.elements.remove(&id)?;
                index_drop(&mut self.elements_by_column, &element.column, &element.id);
                Some(Entity::Element(element))
            }
            EntityKey::Comment(id) => {
                let comment = self.comments.remove(&id)?;
                index_drop(&mut self.comments_by_element, &comment.element, &comment.id);
                Some(Entity::Comment(comment))
            }
            EntityKey::Page(id) => {
                let page = self.pages.remove(&id)?;
                index_drop(&mut self.pages_by_slot, &PageSlot::of(&page), &page.id);
                index_drop(&mut self.pages_by_project, &page.project, &page.id);
                Some(Entity::Page(page))
            }
            EntityKey::VisitMark(user, page) => {
                let mark = self.visit_marks.remove(&(user, page))?;
                index_drop(&mut self.visits_by_user, &user, &page);
                index_drop(&mut self.visitors_by_page, &page, &user);
                Some(Entity::VisitMark(mark))
            }
        }
    }

    /// Cloned copy of the entity behind `key`, if present.
    pub fn get(&self, key: &EntityKey) -> Option<Entity> {
        match key {
            EntityKey::User(id) => self.users.get(id).cloned().map(Entity::User),
            EntityKey::Project(id) => self.projects.get(id).cloned().map(Entity::Project),
            EntityKey::Membership(p, u) => {
                self.memberships.get(&(*p, *u)).cloned().map(Entity::Membership)
            }
            EntityKey::Role(id) => self.roles.get(id).cloned().map(Entity::Role),
            EntityKey::Kanban(id) => self.kanbans.get(id).cloned().map(Entity::Kanban),
            EntityKey::Column(id) => self.columns.get(id).cloned().map(Entity::Column),
            EntityKey::Element(id) => self.elements.get(id).cloned().map(Entity::Element),
            EntityKey::Comment(id) => self.comments.get(id).cloned().map(Entity::Comment),
            EntityKey::Page(id) => self.pages.get(id).cloned().map(Entity::Page),
            EntityKey::VisitMark(u, p) => {
                self.visit_marks.get(&(*u, *p)).cloned().map(Entity::VisitMark)
            }
        }
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn user(&self, id: UserId) -> Result<&User> {
        self.users
            .get(&id)
            .ok_or_else(|| CoreError::not_found(ResourceKind::User, id))
    }

    pub fn user_by_username(&self, username: &str) -> Result<&User> {
        self.usernames
            .get(username)
            .and_then(|id| self.users.get(id))
            .ok_or_else(|| CoreError::not_found(ResourceKind::User, username))
    }

    pub fn project(&self, id: ProjectId) -> Result<&Project> {
        self.projects
            .get(&id)
            .ok_or_else(|| CoreError::not_found(ResourceKind::Project, id))
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn membership(&self, project: ProjectId, user: UserId) -> Option<&UserConnector> {
        self.memberships.get(&(project, user))
    }

    pub fn members_of(&self, project: ProjectId) -> impl Iterator<Item = &UserConnector> {
        self.memberships
            .values()
            .filter(move |m| m.project == project)
    }

    pub fn role(&self, id: RoleId) -> Result<&CustomRole> {
        self.roles
            .get(&id)
            .ok_or_else(|| CoreError::not_found(ResourceKind::Role, id))
    }

    pub fn roles_of(&self, project: ProjectId) -> impl Iterator<Item = &CustomRole> {
        self.roles_by_project
            .get(&project)
            .into_iter()
            .flatten()
            .filter_map(|id| self.roles.get(id))
    }

    pub fn kanban(&self, id: KanbanId) -> Result<&Kanban> {
        self.kanbans
            .get(&id)
            .ok_or_else(|| CoreError::not_found(ResourceKind::Kanban, id))
    }

    pub fn kanbans_of(&self, project: ProjectId) -> impl Iterator<Item = &Kanban> {
        self.kanbans_by_project
            .get(&project)
            .into_iter()
            .flatten()
            .filter_map(|id| self.kanbans.get(id))
    }

    pub fn column(&self, id: ColumnId) -> Result<&KanbanColumn> {
        self.columns
            .get(&id)
            .ok_or_else(|| CoreError::not_found(ResourceKind::Column, id))
    }

    /// Columns of a kanban, ordered by serial number.
    pub fn columns_of(&self, kanban: KanbanId) -> Vec<&KanbanColumn> {
        let mut columns: Vec<&KanbanColumn> = self
            .columns_by_kanban
            .get(&kanban)
            .into_iter()
            .flatten()
            .filter_map(|id| self.columns.get(id))
            .collect();
        columns.sort_by_key(|c| c.serial_number);
        columns
    }

    pub fn element(&self, id: ElementId) -> Result<&KanbanElement> {
        self.elements
            .get(&id)
            .ok_or_else(|| CoreError::not_found(ResourceKind::Element, id))
    }

    /// Every element of a column regardless of status.
    pub fn elements_of(&self, column: ColumnId) -> impl Iterator<Item = &KanbanElement> {
        self.elements_by_column
            .get(&column)
            .into_iter()
            .flatten()
            .filter_map(|id| self.elements.get(id))
    }

    /// Elements of one status partition of a column, ordered by serial.
    pub fn partition(&self, column: ColumnId, status: ElementStatus) -> Vec<&KanbanElement> {
        let mut elements: Vec<&KanbanElement> = self
            .elements_of(column)
            .filter(|e| e.status == status)
            .collect();
        elements.sort_by_key(|e| e.serial_number);
        elements
    }

    /// Kanban the element's column belongs to.
    pub fn kanban_of_element(&self, element: &KanbanElement) -> Result<&Kanban> {
        let column = self.column(element.column)?;
        self.kanban(column.kanban)
    }

    /// Comments on an element, oldest first.
    pub fn comments_of(&self, element: ElementId) -> Vec<&ElementComment> {
        let mut comments: Vec<&ElementComment> = self
            .comments_by_element
            .get(&element)
            .into_iter()
            .flatten()
            .filter_map(|id| self.comments.get(id))
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        comments
    }

    pub fn page(&self, id: PageId) -> Result<&Page> {
        self.pages
            .get(&id)
            .ok_or_else(|| CoreError::not_found(ResourceKind::Page, id))
    }

    /// Pages sharing a container, ordered by serial.
    pub fn pages_in(&self, slot: PageSlot) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self
            .pages_by_slot
            .get(&slot)
            .into_iter()
            .flatten()
            .filter_map(|id| self.pages.get(id))
            .collect();
        pages.sort_by_key(|p| p.serial_number);
        pages
    }

    pub fn children(&self, page: PageId) -> Vec<&Page> {
        self.pages_in(PageSlot::Under(page))
    }

    pub fn pages_of(&self, project: ProjectId) -> impl Iterator<Item = &Page> {
        self.pages_by_project
            .get(&project)
            .into_iter()
            .flatten()
            .filter_map(|id| self.pages.get(id))
    }

    pub fn visit_mark(&self, user: UserId, page: PageId) -> Result<&VisitMark> {
        self.visit_marks
            .get(&(user, page))
            .ok_or_else(|| CoreError::not_found(ResourceKind::VisitMark, format!("{user} on {page}")))
    }

    /// A user's visit marks, latest first.
    pub fn visits_of(&self, user: UserId) -> Vec<&VisitMark> {
        let mut marks: Vec<&VisitMark> = self
            .visits_by_user
            .get(&user)
            .into_iter()
            .flatten()
            .filter_map(|page| self.visit_marks.get(&(user, *page)))
            .collect();
        marks.sort_by_key(|m| m.serial_number);
        marks
    }

    /// Users holding a visit mark on `page`.
    pub fn visitors_of(&self, page: PageId) -> impl Iterator<Item = UserId> + '_ {
        self.visitors_by_page.get(&page).into_iter().flatten().copied()
    }

    /// Every user with at least one visit mark.
    pub fn visiting_users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.visits_by_user.keys().copied()
    }

    /// Every page container present in the graph.
    pub fn page_slots(&self) -> impl Iterator<Item = &PageSlot> {
        self.pages_by_slot.keys()
    }

    pub fn columns(&self) -> impl Iterator<Item = &KanbanColumn> {
        self.columns.values()
    }

    pub fn kanbans(&self) -> impl Iterator<Item = &Kanban> {
        self.kanbans.values()
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    pub fn elements(&self) -> impl Iterator<Item = &KanbanElement> {
        self.elements.values()
    }

    /// Number of ancestors above a page. Stops on a broken or cyclic chain.
    pub fn depth(&self, page: PageId) -> usize {
        let mut depth = 0;
        let mut current = self.pages.get(&page).and_then(|p| p.parent);
        while let Some(parent) = current {
            depth += 1;
            if depth > self.pages.len() {
                break;
            }
            current = self.pages.get(&parent).and_then(|p| p.parent);
        }
        depth
    }
}

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

/// Entity writes and deletions produced by one operation.
///
/// A key appears at most once: a later write replaces an earlier one, and a
/// delete cancels a pending write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    writes: Vec<Entity>,
    deletes: Vec<EntityKey>,
}

impl ChangeSet {
    pub fn record_write(&mut self, entity: Entity) {
        let key = entity.key();
        self.deletes.retain(|k| *k != key);
        match self.writes.iter_mut().find(|e| e.key() == key) {
            Some(slot) => *slot = entity,
            None => self.writes.push(entity),
        }
    }

    pub fn record_delete(&mut self, key: EntityKey) {
        self.writes.retain(|e| e.key() != key);
        if !self.deletes.contains(&key) {
            self.deletes.push(key);
        }
    }

    pub fn writes(&self) -> &[Entity] {
        &self.writes
    }

    pub fn deletes(&self) -> &[EntityKey] {
        &self.deletes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Txn
// ---------------------------------------------------------------------------

/// Undo-logged mutation scope over a [`ResourceGraph`].
pub struct Txn<'g> {
    graph: &'g mut ResourceGraph,
    undo: Vec<(EntityKey, Option<Entity>)>,
    changes: ChangeSet,
}

impl<'g> Txn<'g> {
    pub fn new(graph: &'g mut ResourceGraph) -> Self {
        Self {
            graph,
            undo: Vec::new(),
            changes: ChangeSet::default(),
        }
    }

    /// Read access to the graph as modified so far.
    pub fn graph(&self) -> &ResourceGraph {
        self.graph
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn put(&mut self, entity: Entity) {
        let key = entity.key();
        self.changes.record_write(entity.clone());
        let previous = self.graph.upsert(entity);
        self.undo.push((key, previous));
    }

    pub fn delete(&mut self, key: EntityKey) -> Option<Entity> {
        let previous = self.graph.remove(key)?;
        self.changes.record_delete(key);
        self.undo.push((key, Some(previous.clone())));
        Some(previous)
    }

    pub fn update_column(&mut self, id: ColumnId, f: impl FnOnce(&mut KanbanColumn)) -> Result<()> {
        let mut column = self.graph.column(id)?.clone();
        f(&mut column);
        self.put(Entity::Column(column));
        Ok(())
    }

    pub fn update_element(&mut self, id: ElementId, f: impl FnOnce(&mut KanbanElement)) -> Result<()> {
        let mut element = self.graph.element(id)?.clone();
        f(&mut element);
        self.put(Entity::Element(element));
        Ok(())
    }

    pub fn update_page(&mut self, id: PageId, f: impl FnOnce(&mut Page)) -> Result<()> {
        let mut page = self.graph.page(id)?.clone();
        f(&mut page);
        self.put(Entity::Page(page));
        Ok(())
    }

    pub fn update_role(&mut self, id: RoleId, f: impl FnOnce(&mut CustomRole)) -> Result<()> {
        let mut role = self.graph.role(id)?.clone();
        f(&mut role);
        self.put(Entity::Role(role));
        Ok(())
    }

    /// Hand back the accumulated changes, keeping the mutations.
    pub fn finish(self) -> ChangeSet {
        self.changes
    }

    /// Restore every touched entity to its state before the transaction.
    pub fn rollback(self) {
        for (key, previous) in self.undo.into_iter().rev() {
            match previous {
                Some(entity) => {
                    self.graph.upsert(entity);
                }
                None => {
                    self.graph.remove(key);
                }
            }
        }
    }
}
