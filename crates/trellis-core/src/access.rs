//! Three-tier permission resolution.
//!
//! A membership carries one of three roles:
//!
//! - `Admin`: everything, including role administration.
//! - `StandardUser`: sees and edits every kanban and page of the project, but
//!   cannot create resources or administer roles.
//! - `Custom(role)`: sees only the kanbans and root pages the role holds a
//!   connector for, edits only where the connector says `can_edit`, and may
//!   create resources only with `can_edit_resources`.
//!
//! Pages inherit the connector of their root. On top of that, mutating a page
//! requires owning it or the page sitting on a fully published chain up to
//! its root.
//!
//! Every predicate answers `false` for non-members and for ids that do not
//! resolve; existence is the caller's concern and is checked first.

use trellis_shared::{KanbanId, PageId, ProjectId, ProjectRole, UserId};

use crate::graph::ResourceGraph;
use crate::models::{CustomRole, Page};

/// Read-only permission view over a graph.
#[derive(Clone, Copy)]
pub struct PermissionResolver<'g> {
    graph: &'g ResourceGraph,
}

impl<'g> PermissionResolver<'g> {
    pub fn new(graph: &'g ResourceGraph) -> Self {
        Self { graph }
    }

    fn role_in(&self, project: ProjectId, user: UserId) -> Option<ProjectRole> {
        self.graph.membership(project, user).map(|m| m.role)
    }

    fn custom_role(&self, role: ProjectRole) -> Option<&'g CustomRole> {
        role.custom_role().and_then(|id| self.graph.role(id).ok())
    }

    pub fn is_member(&self, project: ProjectId, user: UserId) -> bool {
        self.role_in(project, user).is_some()
    }

    pub fn is_admin(&self, project: ProjectId, user: UserId) -> bool {
        matches!(self.role_in(project, user), Some(ProjectRole::Admin))
    }

    /// May create kanbans and pages in the project.
    pub fn can_edit_resources(&self, project: ProjectId, user: UserId) -> bool {
        match self.role_in(project, user) {
            Some(ProjectRole::Admin) => true,
            Some(role @ ProjectRole::Custom(_)) => self
                .custom_role(role)
                .map(|r| r.can_edit_resources)
                .unwrap_or(false),
            _ => false,
        }
    }

    fn kanban_access(&self, kanban: KanbanId, user: UserId, edit: bool) -> bool {
        let Ok(kanban_entity) = self.graph.kanban(kanban) else {
            return false;
        };
        match self.role_in(kanban_entity.project, user) {
            None => false,
            Some(role @ ProjectRole::Custom(_)) => self
                .custom_role(role)
                .and_then(|r| r.kanban_connector(kanban))
                .map(|c| !edit || c.can_edit)
                .unwrap_or(false),
            Some(_) => true,
        }
    }

    pub fn can_see_kanban(&self, kanban: KanbanId, user: UserId) -> bool {
        self.kanban_access(kanban, user, false)
    }

    pub fn can_edit_kanban(&self, kanban: KanbanId, user: UserId) -> bool {
        self.kanban_access(kanban, user, true)
    }

    fn page_access(&self, page: &Page, user: UserId, edit: bool) -> bool {
        let root = page.access_root();
        match self.role_in(page.project, user) {
            None => false,
            Some(role @ ProjectRole::Custom(_)) => self
                .custom_role(role)
                .and_then(|r| r.document_connector(root))
                .map(|c| !edit || c.can_edit)
                .unwrap_or(false),
            Some(_) => true,
        }
    }

    pub fn can_see_page(&self, page: PageId, user: UserId) -> bool {
        self.graph
            .page(page)
            .map(|p| self.page_access(p, user, false))
            .unwrap_or(false)
    }

    pub fn can_edit_page(&self, page: PageId, user: UserId) -> bool {
        self.graph
            .page(page)
            .map(|p| self.page_access(p, user, true))
            .unwrap_or(false)
    }

    /// The page and every ancestor up to its root are published.
    pub fn is_publish_pipeline(&self, page: PageId) -> bool {
        let limit = self.graph.pages().count();
        let mut current = Some(page);
        let mut steps = 0;
        while let Some(id) = current {
            let Ok(p) = self.graph.page(id) else {
                return false;
            };
            if !p.published {
                return false;
            }
            steps += 1;
            if steps > limit {
                return false;
            }
            current = p.parent;
        }
        true
    }

    fn owner_or_pipeline(&self, page: PageId, user: UserId) -> bool {
        let owns = self
            .graph
            .page(page)
            .map(|p| p.owner == user)
            .unwrap_or(false);
        owns || self.is_publish_pipeline(page)
    }

    /// Edit rights plus ownership or a published chain.
    pub fn can_mutate_page(&self, page: PageId, user: UserId) -> bool {
        self.can_edit_page(page, user) && self.owner_or_pipeline(page, user)
    }

    /// Visibility plus ownership or a published chain.
    pub fn can_read_page(&self, page: PageId, user: UserId) -> bool {
        self.can_see_page(page, user) && self.owner_or_pipeline(page, user)
    }

    /// Deletion additionally requires resource-editing rights on the project.
    pub fn can_delete_page(&self, page: PageId, user: UserId) -> bool {
        let Ok(p) = self.graph.page(page) else {
            return false;
        };
        self.can_edit_resources(p.project, user) && self.can_mutate_page(page, user)
    }
}

impl ResourceGraph {
    pub fn permissions(&self) -> PermissionResolver<'_> {
        PermissionResolver::new(self)
    }
}

#[cfg(test)]
mod tests {
    use trellis_shared::ProjectRole;

    use crate::fixtures::Fixture;

    #[test]
    fn standard_user_sees_and_edits_everything() {
        let mut fx = Fixture::new();
        let member = fx.member("sam", ProjectRole::StandardUser);
        let kanban = fx.kanban("board");
        let root = fx.page("root", None, fx.admin, true);

        let access = fx.graph.permissions();
        assert!(access.can_see_kanban(kanban, member));
        assert!(access.can_edit_kanban(kanban, member));
        assert!(access.can_see_page(root, member));
        assert!(access.can_edit_page(root, member));
        assert!(!access.can_edit_resources(fx.project, member));
        assert!(!access.is_admin(fx.project, member));
    }

    #[test]
    fn custom_role_needs_explicit_connectors() {
        let mut fx = Fixture::new();
        let visible = fx.kanban("visible");
        let editable = fx.kanban("editable");
        let hidden = fx.kanban("hidden");
        let root = fx.page("docs", None, fx.admin, true);
        let child = fx.page("child", Some(root), fx.admin, true);
        let other_root = fx.page("other", None, fx.admin, true);

        let role = fx.role("viewer", false, &[(visible, false), (editable, true)], &[(root, false)]);
        let user = fx.member("cora", ProjectRole::Custom(role));

        let access = fx.graph.permissions();
        assert!(access.can_see_kanban(visible, user));
        assert!(!access.can_edit_kanban(visible, user));
        assert!(access.can_edit_kanban(editable, user));
        assert!(!access.can_see_kanban(hidden, user));

        assert!(access.can_see_page(child, user), "subpages inherit the root connector");
        assert!(!access.can_edit_page(child, user));
        assert!(!access.can_see_page(other_root, user));
        assert!(!access.can_edit_resources(fx.project, user));
    }

    #[test]
    fn outsiders_are_denied() {
        let mut fx = Fixture::new();
        let kanban = fx.kanban("board");
        let outsider = fx.user("eve");
        let access = fx.graph.permissions();
        assert!(!access.can_see_kanban(kanban, outsider));
        assert!(!access.is_member(fx.project, outsider));
    }

    #[test]
    fn publish_pipeline_covers_every_ancestor() {
        let mut fx = Fixture::new();
        let member = fx.member("sam", ProjectRole::StandardUser);
        let root = fx.page("root", None, fx.admin, false);
        let child = fx.page("child", Some(root), fx.admin, true);

        let access = fx.graph.permissions();
        assert!(!access.is_publish_pipeline(child));
        assert!(!access.can_mutate_page(child, member));
        assert!(access.can_mutate_page(child, fx.admin), "owner bypasses the pipeline");

        fx.publish(root);
        let access = fx.graph.permissions();
        assert!(access.is_publish_pipeline(child));
        assert!(access.can_mutate_page(child, member));
        assert!(!access.can_delete_page(child, member), "deletion needs resource rights");
    }
}
