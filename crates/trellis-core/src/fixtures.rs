//! Graph builders shared by the unit tests.

use chrono::Utc;
use trellis_shared::{ColumnId, ElementId, ElementStatus, KanbanId, PageId, ProjectId, ProjectRole, RoleId, UserId};

use crate::config::CoreConfig;
use crate::graph::{Entity, PageSlot, ResourceGraph};
use crate::manager::Manager;
use crate::models::{
    CustomRole, DocumentConnector, Kanban, KanbanColumn, KanbanConnector, KanbanElement, Page, Project, User,
    UserConnector,
};
use crate::persist::MemoryJournal;

/// A project with one administrator named `admin`.
pub struct Fixture {
    pub graph: ResourceGraph,
    pub project: ProjectId,
    pub admin: UserId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut fx = Self {
            graph: ResourceGraph::new(),
            project: ProjectId::new(),
            admin: UserId::new(),
        };
        fx.graph.upsert(Entity::Project(Project {
            id: fx.project,
            name: "project".into(),
            created_at: Utc::now(),
        }));
        fx.admin = fx.user("admin");
        fx.graph.upsert(Entity::Membership(UserConnector {
            project: fx.project,
            user: fx.admin,
            role: ProjectRole::Admin,
        }));
        fx
    }

    pub fn user(&mut self, username: &str) -> UserId {
        let id = UserId::new();
        self.graph.upsert(Entity::User(User {
            id,
            username: username.into(),
            display_name: username.into(),
            email: format!("{username}@example.org"),
        }));
        id
    }

    pub fn member(&mut self, username: &str, role: ProjectRole) -> UserId {
        let id = self.user(username);
        self.graph.upsert(Entity::Membership(UserConnector {
            project: self.project,
            user: id,
            role,
        }));
        id
    }

    pub fn kanban(&mut self, name: &str) -> KanbanId {
        let id = KanbanId::new();
        self.graph.upsert(Entity::Kanban(Kanban {
            id,
            project: self.project,
            name: name.into(),
        }));
        id
    }

    pub fn column(&mut self, kanban: KanbanId, name: &str) -> ColumnId {
        let id = ColumnId::new();
        let serial_number = self.graph.columns_of(kanban).len() as u32;
        self.graph.upsert(Entity::Column(KanbanColumn {
            id,
            kanban,
            name: name.into(),
            serial_number,
        }));
        id
    }

    /// An ALIVE element appended to the column.
    pub fn element(&mut self, column: ColumnId, name: &str) -> ElementId {
        let id = ElementId::new();
        let serial_number = self.graph.partition(column, ElementStatus::Alive).len() as u32;
        self.graph.upsert(Entity::Element(KanbanElement {
            id,
            column,
            owner: self.admin,
            last_redactor: self.admin,
            serial_number,
            name: name.into(),
            tag: None,
            content: String::new(),
            photo: None,
            status: ElementStatus::Alive,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }));
        id
    }

    pub fn page(&mut self, name: &str, parent: Option<PageId>, owner: UserId, published: bool) -> PageId {
        let id = PageId::new();
        let root = parent.map(|p| self.graph.page(p).map(|page| page.access_root()).unwrap_or(p));
        let slot = match parent {
            Some(p) => PageSlot::Under(p),
            None => PageSlot::Top(self.project),
        };
        let serial_number = self.graph.pages_in(slot).len() as u32;
        self.graph.upsert(Entity::Page(Page {
            id,
            project: self.project,
            owner,
            parent,
            root,
            serial_number,
            name: name.into(),
            published,
            content: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }));
        id
    }

    pub fn role(
        &mut self,
        name: &str,
        can_edit_resources: bool,
        kanbans: &[(KanbanId, bool)],
        pages: &[(PageId, bool)],
    ) -> RoleId {
        let id = RoleId::new();
        self.graph.upsert(Entity::Role(CustomRole {
            id,
            project: self.project,
            name: name.into(),
            can_edit_resources,
            kanban_connectors: kanbans
                .iter()
                .map(|&(kanban, can_edit)| KanbanConnector { kanban, can_edit })
                .collect(),
            document_connectors: pages
                .iter()
                .map(|&(page, can_edit)| DocumentConnector { page, can_edit })
                .collect(),
        }));
        id
    }

    pub fn publish(&mut self, page: PageId) {
        if let Ok(found) = self.graph.page(page) {
            let mut published = found.clone();
            published.published = true;
            self.graph.upsert(Entity::Page(published));
        }
    }

    pub fn manager(&self) -> Manager<MemoryJournal> {
        Manager::new(self.graph.clone(), MemoryJournal::new(), CoreConfig::default())
    }
}
