//! Domain entities held in the [`ResourceGraph`](crate::graph::ResourceGraph).
//!
//! Relations are plain id fields; the graph keeps the reverse indexes.
//! Every struct derives `Serialize` and `Deserialize` so it can be handed to
//! a transport layer unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trellis_shared::{
    ColumnId, CommentId, ElementId, ElementStatus, KanbanId, PageId, ProjectId, ProjectRole, RoleId,
    UserId,
};

// ---------------------------------------------------------------------------
// Users & projects
// ---------------------------------------------------------------------------

/// An account known to the system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Login used to resolve the authenticated principal.
    pub username: String,
    pub display_name: String,
    pub email: String,
}

/// A team workspace owning kanbans, pages and custom roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Membership of a user in a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserConnector {
    pub project: ProjectId,
    pub user: UserId,
    pub role: ProjectRole,
}

// ---------------------------------------------------------------------------
// Custom roles
// ---------------------------------------------------------------------------

/// Grant of one kanban to a custom role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KanbanConnector {
    pub kanban: KanbanId,
    pub can_edit: bool,
}

/// Grant of one root page (and so its whole subtree) to a custom role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentConnector {
    pub page: PageId,
    pub can_edit: bool,
}

/// Fine-grained project role with per-resource connectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomRole {
    pub id: RoleId,
    pub project: ProjectId,
    pub name: String,
    /// Allows creating kanbans and pages in the project.
    pub can_edit_resources: bool,
    pub kanban_connectors: Vec<KanbanConnector>,
    pub document_connectors: Vec<DocumentConnector>,
}

impl CustomRole {
    pub fn kanban_connector(&self, kanban: KanbanId) -> Option<&KanbanConnector> {
        self.kanban_connectors.iter().find(|c| c.kanban == kanban)
    }

    pub fn document_connector(&self, page: PageId) -> Option<&DocumentConnector> {
        self.document_connectors.iter().find(|c| c.page == page)
    }
}

// ---------------------------------------------------------------------------
// Kanban
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Kanban {
    pub id: KanbanId,
    pub project: ProjectId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KanbanColumn {
    pub id: ColumnId,
    pub kanban: KanbanId,
    pub name: String,
    /// Dense rank among the kanban's columns.
    pub serial_number: u32,
}

/// A card inside a kanban column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KanbanElement {
    pub id: ElementId,
    pub column: ColumnId,
    pub owner: UserId,
    pub last_redactor: UserId,
    /// Dense rank within the column's partition for `status`.
    /// Meaningless (kept at 0) while the element is trashed.
    pub serial_number: u32,
    pub name: String,
    pub tag: Option<String>,
    pub content: String,
    pub photo: Option<Vec<u8>>,
    pub status: ElementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A note left on a kanban element. Comments are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementComment {
    pub id: CommentId,
    pub element: ElementId,
    pub owner: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A document page. `root` is `None` exactly when `parent` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub id: PageId,
    pub project: ProjectId,
    pub owner: UserId,
    pub parent: Option<PageId>,
    pub root: Option<PageId>,
    pub serial_number: u32,
    pub name: String,
    pub published: bool,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// The root whose connectors govern access to this page.
    pub fn access_root(&self) -> PageId {
        self.root.unwrap_or(self.id)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A page a user opened recently.
///
/// Marks of one user form a sibling set: serial 0 is the latest visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitMark {
    pub user: UserId,
    pub page: PageId,
    pub serial_number: u32,
    pub visited_at: DateTime<Utc>,
}
