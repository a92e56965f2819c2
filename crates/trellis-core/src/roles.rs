//! Custom role administration. Every operation here is admin only.

use trellis_shared::constants::{is_reserved_role_name, normalize_role_name};
use trellis_shared::{KanbanId, PageId, ProjectId, ProjectRole, ResourceKind, RoleId, RoleType, UserId};

use crate::error::{CoreError, Result};
use crate::graph::{Entity, EntityKey, ResourceGraph};
use crate::manager::Manager;
use crate::models::{CustomRole, DocumentConnector, KanbanConnector, User, UserConnector};
use crate::persist::Persistence;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCustomRole {
    pub name: String,
    pub can_edit_resources: bool,
    pub kanban_grants: Vec<KanbanConnector>,
    pub page_grants: Vec<DocumentConnector>,
}

/// Reject empty, reserved and already used names. `except` is the role
/// being renamed, if any.
fn check_role_name(graph: &ResourceGraph, project: ProjectId, name: &str, except: Option<RoleId>) -> Result<()> {
    let normalized = normalize_role_name(name);
    if normalized.is_empty() {
        return Err(CoreError::InvalidArgument("role name must not be empty".into()));
    }
    if is_reserved_role_name(name) {
        return Err(CoreError::DuplicateName(name.trim().to_string()));
    }
    let taken = graph
        .roles_of(project)
        .any(|r| Some(r.id) != except && normalize_role_name(&r.name) == normalized);
    if taken {
        return Err(CoreError::DuplicateName(name.trim().to_string()));
    }
    Ok(())
}

fn check_kanban_grants(graph: &ResourceGraph, project: ProjectId, grants: &[KanbanConnector]) -> Result<()> {
    for grant in grants {
        match graph.kanban(grant.kanban) {
            Ok(k) if k.project == project => {}
            _ => return Err(CoreError::missing_grant(ResourceKind::Kanban, grant.kanban)),
        }
    }
    Ok(())
}

/// Document connectors may only point at root pages.
fn check_page_grants(graph: &ResourceGraph, project: ProjectId, grants: &[DocumentConnector]) -> Result<()> {
    for grant in grants {
        match graph.page(grant.page) {
            Ok(p) if p.project == project && p.is_root() => {}
            _ => return Err(CoreError::missing_grant(ResourceKind::Page, grant.page)),
        }
    }
    Ok(())
}

fn merge_kanban_grants(connectors: &mut Vec<KanbanConnector>, grants: &[KanbanConnector]) {
    for grant in grants {
        match connectors.iter_mut().find(|c| c.kanban == grant.kanban) {
            Some(existing) => existing.can_edit = grant.can_edit,
            None => connectors.push(*grant),
        }
    }
}

fn merge_page_grants(connectors: &mut Vec<DocumentConnector>, grants: &[DocumentConnector]) {
    for grant in grants {
        match connectors.iter_mut().find(|c| c.page == grant.page) {
            Some(existing) => existing.can_edit = grant.can_edit,
            None => connectors.push(*grant),
        }
    }
}

impl<P: Persistence> Manager<P> {
    /// Resolve a role and check the caller administers its project.
    fn administered_role(&self, action: &'static str, login: &str, role: RoleId) -> Result<Option<CustomRole>> {
        let user = self.principal(login)?;
        let found = self.graph().role(role)?;
        if !self.graph().permissions().is_admin(found.project, user) {
            Self::denied(action, user);
            return Ok(None);
        }
        Ok(Some(found.clone()))
    }

    pub fn create_custom_role(
        &mut self,
        login: &str,
        project: ProjectId,
        new: NewCustomRole,
    ) -> Result<Option<CustomRole>> {
        let user = self.principal(login)?;
        self.graph().project(project)?;
        if !self.graph().permissions().is_admin(project, user) {
            Self::denied("create_custom_role", user);
            return Ok(None);
        }
        check_role_name(self.graph(), project, &new.name, None)?;
        check_kanban_grants(self.graph(), project, &new.kanban_grants)?;
        check_page_grants(self.graph(), project, &new.page_grants)?;

        let mut role = CustomRole {
            id: RoleId::new(),
            project,
            name: new.name.trim().to_string(),
            can_edit_resources: new.can_edit_resources,
            kanban_connectors: Vec::new(),
            document_connectors: Vec::new(),
        };
        merge_kanban_grants(&mut role.kanban_connectors, &new.kanban_grants);
        merge_page_grants(&mut role.document_connectors, &new.page_grants);

        let created = role.clone();
        self.transact("create_custom_role", |txn| {
            txn.put(Entity::Role(created));
            Ok(())
        })?;
        Ok(Some(role))
    }

    pub fn rename_custom_role(&mut self, login: &str, role: RoleId, name: &str) -> Result<bool> {
        let Some(found) = self.administered_role("rename_custom_role", login, role)? else {
            return Ok(false);
        };
        check_role_name(self.graph(), found.project, name, Some(role))?;

        let name = name.trim().to_string();
        self.transact("rename_custom_role", |txn| txn.update_role(role, |r| r.name = name))?;
        Ok(true)
    }

    pub fn set_role_can_edit_resources(&mut self, login: &str, role: RoleId, allowed: bool) -> Result<bool> {
        if self.administered_role("set_role_can_edit_resources", login, role)?.is_none() {
            return Ok(false);
        }
        self.transact("set_role_can_edit_resources", |txn| {
            txn.update_role(role, |r| r.can_edit_resources = allowed)
        })?;
        Ok(true)
    }

    /// Add kanban connectors, or update `can_edit` of those already held.
    pub fn put_kanban_grants(&mut self, login: &str, role: RoleId, grants: &[KanbanConnector]) -> Result<bool> {
        let Some(found) = self.administered_role("put_kanban_grants", login, role)? else {
            return Ok(false);
        };
        check_kanban_grants(self.graph(), found.project, grants)?;

        self.transact("put_kanban_grants", |txn| {
            txn.update_role(role, |r| merge_kanban_grants(&mut r.kanban_connectors, grants))
        })?;
        Ok(true)
    }

    /// Add document connectors, or update `can_edit` of those already held.
    pub fn put_page_grants(&mut self, login: &str, role: RoleId, grants: &[DocumentConnector]) -> Result<bool> {
        let Some(found) = self.administered_role("put_page_grants", login, role)? else {
            return Ok(false);
        };
        check_page_grants(self.graph(), found.project, grants)?;

        self.transact("put_page_grants", |txn| {
            txn.update_role(role, |r| merge_page_grants(&mut r.document_connectors, grants))
        })?;
        Ok(true)
    }

    pub fn revoke_kanban_grants(&mut self, login: &str, role: RoleId, kanbans: &[KanbanId]) -> Result<bool> {
        let Some(found) = self.administered_role("revoke_kanban_grants", login, role)? else {
            return Ok(false);
        };
        if !found.kanban_connectors.iter().any(|c| kanbans.contains(&c.kanban)) {
            return Ok(true);
        }
        self.transact("revoke_kanban_grants", |txn| {
            txn.update_role(role, |r| r.kanban_connectors.retain(|c| !kanbans.contains(&c.kanban)))
        })?;
        Ok(true)
    }

    pub fn revoke_page_grants(&mut self, login: &str, role: RoleId, pages: &[PageId]) -> Result<bool> {
        let Some(found) = self.administered_role("revoke_page_grants", login, role)? else {
            return Ok(false);
        };
        if !found.document_connectors.iter().any(|c| pages.contains(&c.page)) {
            return Ok(true);
        }
        self.transact("revoke_page_grants", |txn| {
            txn.update_role(role, |r| r.document_connectors.retain(|c| !pages.contains(&c.page)))
        })?;
        Ok(true)
    }

    /// Delete a role. Its holders become standard users.
    pub fn delete_custom_role(&mut self, login: &str, role: RoleId) -> Result<bool> {
        let Some(found) = self.administered_role("delete_custom_role", login, role)? else {
            return Ok(false);
        };
        let holders: Vec<UserId> = self
            .graph()
            .members_of(found.project)
            .filter(|m| m.role == ProjectRole::Custom(role))
            .map(|m| m.user)
            .collect();

        self.transact("delete_custom_role", |txn| {
            for user in holders {
                txn.put(Entity::Membership(UserConnector {
                    project: found.project,
                    user,
                    role: ProjectRole::StandardUser,
                }));
            }
            txn.delete(EntityKey::Role(role));
            Ok(())
        })?;
        Ok(true)
    }

    /// Change the role a member holds in a project.
    pub fn edit_user_role(
        &mut self,
        login: &str,
        project: ProjectId,
        target: UserId,
        role_type: RoleType,
        role_id: Option<RoleId>,
    ) -> Result<bool> {
        let user = self.principal(login)?;
        self.graph().project(project)?;
        self.graph().user(target)?;
        if self.graph().membership(project, target).is_none() {
            return Err(CoreError::NotFound(
                ResourceKind::Membership,
                format!("{target} in {project}"),
            ));
        }
        if let Some(id) = role_id {
            if self.graph().role(id)?.project != project {
                return Err(CoreError::not_found(ResourceKind::Role, id));
            }
        }
        if !self.graph().permissions().is_admin(project, user) {
            Self::denied("edit_user_role", user);
            return Ok(false);
        }

        let role = match role_type {
            RoleType::Admin => ProjectRole::Admin,
            RoleType::StandardUser => ProjectRole::StandardUser,
            RoleType::CustomRole => match role_id {
                Some(id) => ProjectRole::Custom(id),
                None => {
                    return Err(CoreError::InvalidArgument(
                        "a custom role assignment needs a role id".into(),
                    ))
                }
            },
        };

        self.transact("edit_user_role", |txn| {
            txn.put(Entity::Membership(UserConnector {
                project,
                user: target,
                role,
            }));
            Ok(())
        })?;
        Ok(true)
    }

    pub fn list_custom_roles(&self, login: &str, project: ProjectId) -> Result<Option<Vec<CustomRole>>> {
        let user = self.principal(login)?;
        self.graph().project(project)?;
        if !self.graph().permissions().is_admin(project, user) {
            Self::denied("list_custom_roles", user);
            return Ok(None);
        }

        let mut roles: Vec<CustomRole> = self.graph().roles_of(project).cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(roles))
    }

    /// Members holding `role` whose username, display name or email contains
    /// `query`, ignoring case. An empty query matches every holder.
    pub fn find_users_on_role(
        &self,
        login: &str,
        project: ProjectId,
        role: ProjectRole,
        query: &str,
    ) -> Result<Option<Vec<User>>> {
        let user = self.principal(login)?;
        self.graph().project(project)?;
        if let ProjectRole::Custom(id) = role {
            if self.graph().role(id)?.project != project {
                return Err(CoreError::not_found(ResourceKind::Role, id));
            }
        }
        if !self.graph().permissions().is_admin(project, user) {
            Self::denied("find_users_on_role", user);
            return Ok(None);
        }

        let needle = query.trim().to_lowercase();
        let mut holders: Vec<User> = self
            .graph()
            .members_of(project)
            .filter(|m| m.role == role)
            .filter_map(|m| self.graph().user(m.user).ok())
            .filter(|u| {
                [&u.username, &u.display_name, &u.email]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        holders.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(Some(holders))
    }
}
