//! The public operation surface.
//!
//! [`Manager`] owns the [`ResourceGraph`] and a [`Persistence`] collaborator.
//! Every public operation follows the same shape:
//!
//! 1. resolve the principal and every referenced id (`NotFound` first),
//! 2. evaluate the permission predicate (`Ok(false)` / `Ok(None)` on denial),
//! 3. validate and plan (typed errors, nothing mutated yet),
//! 4. mutate inside a [`Txn`] and commit the resulting change set.
//!
//! Operations are grouped by concern in `kanban.rs`, `archive.rs`,
//! `pages.rs` and `roles.rs`, each adding an `impl Manager` block.

use chrono::Utc;
use tracing::{debug, error, info};
use trellis_shared::{ProjectId, ProjectRole, ResourceKind, UserId};

use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::graph::{Entity, ResourceGraph, Txn};
use crate::models::{Project, User, UserConnector};
use crate::persist::Persistence;

pub struct Manager<P: Persistence> {
    graph: ResourceGraph,
    persistence: P,
    config: CoreConfig,
}

impl<P: Persistence> Manager<P> {
    pub fn new(graph: ResourceGraph, persistence: P, config: CoreConfig) -> Self {
        Self {
            graph,
            persistence,
            config,
        }
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn persistence_mut(&mut self) -> &mut P {
        &mut self.persistence
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Release the graph and the persistence handle.
    pub fn into_parts(self) -> (ResourceGraph, P) {
        (self.graph, self.persistence)
    }

    /// Resolve the authenticated login to a user id.
    pub(crate) fn principal(&self, login: &str) -> Result<UserId> {
        self.graph.user_by_username(login).map(|u| u.id)
    }

    pub(crate) fn denied(action: &'static str, user: UserId) {
        debug!(action, user = %user, "permission denied");
    }

    /// Run `f` against the graph and commit what it wrote.
    ///
    /// If `f` fails or the commit is rejected, every mutation made by `f` is
    /// undone before returning.
    pub(crate) fn transact<T>(
        &mut self,
        action: &'static str,
        f: impl FnOnce(&mut Txn<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut txn = Txn::new(&mut self.graph);
        let output = match f(&mut txn) {
            Ok(output) => output,
            Err(e) => {
                txn.rollback();
                return Err(e);
            }
        };

        if txn.changes().is_empty() {
            return Ok(output);
        }

        if let Err(e) = self.persistence.commit(txn.changes()) {
            error!(action, error = %e, "commit failed, rolling back");
            txn.rollback();
            return Err(CoreError::Persistence(e.to_string()));
        }

        let changes = txn.finish();
        info!(
            action,
            writes = changes.writes().len(),
            deletes = changes.deletes().len(),
            "committed"
        );
        Ok(output)
    }

    // ------------------------------------------------------------------
    // Users & projects
    // ------------------------------------------------------------------

    /// Register an account. Usernames are unique.
    pub fn register_user(&mut self, username: &str, display_name: &str, email: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(CoreError::InvalidArgument("username must not be empty".into()));
        }
        if self.graph.user_by_username(username).is_ok() {
            return Err(CoreError::InvalidArgument(format!(
                "username {username} is already registered"
            )));
        }

        let user = User {
            id: UserId::new(),
            username: username.to_string(),
            display_name: display_name.trim().to_string(),
            email: email.trim().to_string(),
        };
        let created = user.clone();
        self.transact("register_user", |txn| {
            txn.put(Entity::User(created));
            Ok(())
        })?;
        Ok(user)
    }

    /// Create a project; the caller becomes its administrator.
    pub fn create_project(&mut self, login: &str, name: &str) -> Result<Project> {
        let user = self.principal(login)?;
        let project = Project {
            id: ProjectId::new(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };
        let created = project.clone();
        self.transact("create_project", |txn| {
            txn.put(Entity::Membership(UserConnector {
                project: created.id,
                user,
                role: ProjectRole::Admin,
            }));
            txn.put(Entity::Project(created));
            Ok(())
        })?;
        Ok(project)
    }

    /// Add a user to a project with the given role. Admin only.
    pub fn add_member(
        &mut self,
        login: &str,
        project: ProjectId,
        target: UserId,
        role: ProjectRole,
    ) -> Result<bool> {
        let user = self.principal(login)?;
        self.graph.project(project)?;
        self.graph.user(target)?;
        if !self.graph.permissions().is_admin(project, user) {
            Self::denied("add_member", user);
            return Ok(false);
        }
        if let ProjectRole::Custom(role_id) = role {
            if self.graph.role(role_id)?.project != project {
                return Err(CoreError::not_found(ResourceKind::Role, role_id));
            }
        }
        if self.graph.membership(project, target).is_some() {
            return Err(CoreError::InvalidArgument(format!(
                "user {target} is already a member of project {project}"
            )));
        }

        self.transact("add_member", |txn| {
            txn.put(Entity::Membership(UserConnector {
                project,
                user: target,
                role,
            }));
            Ok(())
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use trellis_shared::ProjectRole;

    use crate::error::CoreError;
    use crate::fixtures::Fixture;

    #[test]
    fn creator_becomes_admin() {
        let mut manager = Fixture::new().manager();
        manager.register_user("nina", "Nina", "nina@example.org").unwrap();
        let project = manager.create_project("nina", "  Launch  ").unwrap();
        assert_eq!(project.name, "Launch");

        let nina = manager.graph().user_by_username("nina").unwrap().id;
        assert!(manager.graph().permissions().is_admin(project.id, nina));
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let mut manager = Fixture::new().manager();
        assert!(matches!(
            manager.register_user("admin", "Again", "x@example.org"),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn only_admins_add_members() {
        let mut fx = Fixture::new();
        let member = fx.member("sam", ProjectRole::StandardUser);
        let newcomer = fx.user("nia");
        let project = fx.project;
        let mut manager = fx.manager();

        assert!(!manager
            .add_member("sam", project, newcomer, ProjectRole::StandardUser)
            .unwrap());
        assert!(manager
            .add_member("admin", project, newcomer, ProjectRole::StandardUser)
            .unwrap());
        assert!(manager.graph().permissions().is_member(project, newcomer));
        assert!(manager
            .add_member("admin", project, member, ProjectRole::Admin)
            .is_err());
    }

    #[test]
    fn unknown_login_is_not_found() {
        let mut manager = Fixture::new().manager();
        assert!(matches!(
            manager.create_project("ghost", "x"),
            Err(CoreError::NotFound(..))
        ));
    }
}
