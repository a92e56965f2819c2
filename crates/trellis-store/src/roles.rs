//! CRUD operations for [`CustomRole`] records and their grants.
//!
//! A role row and its grant rows are always written together: the grants of
//! a role are replaced wholesale on every upsert, keeping their order in the
//! `position` column.

use std::collections::HashMap;

use rusqlite::{params, Connection};
use trellis_core::{CustomRole, DocumentConnector, KanbanConnector};
use trellis_shared::{KanbanId, PageId, ProjectId, RoleId};

use crate::database::Database;
use crate::error::{not_found, Result};
use crate::rows;

impl Database {
    /// Fetch a role with its grants.
    pub fn get_role(&self, id: RoleId) -> Result<CustomRole> {
        let mut role = self
            .conn()
            .query_row(
                "SELECT id, project_id, name, can_edit_resources
                 FROM custom_roles
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_role,
            )
            .map_err(not_found)?;
        attach_grants(self.conn(), std::slice::from_mut(&mut role))?;
        Ok(role)
    }

    /// List the roles of a project, ordered by name.
    pub fn list_roles(&self, project: ProjectId) -> Result<Vec<CustomRole>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, project_id, name, can_edit_resources
             FROM custom_roles
             WHERE project_id = ?1
             ORDER BY name ASC",
        )?;

        let rows = stmt.query_map(params![project.to_string()], row_to_role)?;

        let mut roles = Vec::new();
        for row in rows {
            roles.push(row?);
        }
        attach_grants(self.conn(), &mut roles)?;
        Ok(roles)
    }

    /// List every role with its grants.
    pub fn list_all_roles(&self) -> Result<Vec<CustomRole>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, project_id, name, can_edit_resources
             FROM custom_roles",
        )?;

        let rows = stmt.query_map([], row_to_role)?;

        let mut roles = Vec::new();
        for row in rows {
            roles.push(row?);
        }
        attach_grants(self.conn(), &mut roles)?;
        Ok(roles)
    }
}

/// Fill the connector lists of `roles` from the grant tables.
fn attach_grants(conn: &Connection, roles: &mut [CustomRole]) -> Result<()> {
    let index: HashMap<RoleId, usize> = roles.iter().enumerate().map(|(i, r)| (r.id, i)).collect();

    let mut stmt = conn.prepare(
        "SELECT role_id, kanban_id, can_edit
         FROM kanban_grants
         ORDER BY role_id, position",
    )?;
    let grants = stmt.query_map([], |row| {
        Ok((
            rows::id(row, 0, RoleId::parse)?,
            KanbanConnector {
                kanban: rows::id(row, 1, KanbanId::parse)?,
                can_edit: row.get(2)?,
            },
        ))
    })?;
    for grant in grants {
        let (role, connector) = grant?;
        if let Some(&i) = index.get(&role) {
            roles[i].kanban_connectors.push(connector);
        }
    }

    let mut stmt = conn.prepare(
        "SELECT role_id, page_id, can_edit
         FROM page_grants
         ORDER BY role_id, position",
    )?;
    let grants = stmt.query_map([], |row| {
        Ok((
            rows::id(row, 0, RoleId::parse)?,
            DocumentConnector {
                page: rows::id(row, 1, PageId::parse)?,
                can_edit: row.get(2)?,
            },
        ))
    })?;
    for grant in grants {
        let (role, connector) = grant?;
        if let Some(&i) = index.get(&role) {
            roles[i].document_connectors.push(connector);
        }
    }

    Ok(())
}

pub(crate) fn upsert_role(conn: &Connection, role: &CustomRole) -> rusqlite::Result<()> {
    let id = role.id.to_string();
    conn.execute(
        "INSERT INTO custom_roles (id, project_id, name, can_edit_resources)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             can_edit_resources = excluded.can_edit_resources",
        params![id, role.project.to_string(), role.name, role.can_edit_resources],
    )?;

    conn.execute("DELETE FROM kanban_grants WHERE role_id = ?1", params![id])?;
    for (position, grant) in role.kanban_connectors.iter().enumerate() {
        conn.execute(
            "INSERT INTO kanban_grants (role_id, kanban_id, can_edit, position)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, grant.kanban.to_string(), grant.can_edit, position as i64],
        )?;
    }

    conn.execute("DELETE FROM page_grants WHERE role_id = ?1", params![id])?;
    for (position, grant) in role.document_connectors.iter().enumerate() {
        conn.execute(
            "INSERT INTO page_grants (role_id, page_id, can_edit, position)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, grant.page.to_string(), grant.can_edit, position as i64],
        )?;
    }
    Ok(())
}

pub(crate) fn delete_role(conn: &Connection, id: RoleId) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM custom_roles WHERE id = ?1", params![id.to_string()])
}

fn row_to_role(row: &rusqlite::Row<'_>) -> rusqlite::Result<CustomRole> {
    Ok(CustomRole {
        id: rows::id(row, 0, RoleId::parse)?,
        project: rows::id(row, 1, ProjectId::parse)?,
        name: row.get(2)?,
        can_edit_resources: row.get(3)?,
        kanban_connectors: Vec::new(),
        document_connectors: Vec::new(),
    })
}
