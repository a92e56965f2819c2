//! CRUD operations for [`Project`] and [`UserConnector`] records.

use rusqlite::{params, Connection};
use trellis_core::{Project, UserConnector};
use trellis_shared::{decode_project_role, encode_project_role, ProjectId, UserId};

use crate::database::Database;
use crate::error::{not_found, Result};
use crate::rows;

impl Database {
    /// Fetch a single project by id.
    pub fn get_project(&self, id: ProjectId) -> Result<Project> {
        self.conn()
            .query_row(
                "SELECT id, name, created_at FROM projects WHERE id = ?1",
                params![id.to_string()],
                row_to_project,
            )
            .map_err(not_found)
    }

    /// List all projects, oldest first.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name, created_at FROM projects ORDER BY created_at ASC")?;

        let rows = stmt.query_map([], row_to_project)?;

        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }

    /// List every membership, across all projects.
    pub fn list_memberships(&self) -> Result<Vec<UserConnector>> {
        let mut stmt = self.conn().prepare(
            "SELECT project_id, user_id, role_type, role_id
             FROM memberships",
        )?;

        let rows = stmt.query_map([], row_to_membership)?;

        let mut memberships = Vec::new();
        for row in rows {
            memberships.push(row?);
        }
        Ok(memberships)
    }

    /// List the members of one project.
    pub fn list_members(&self, project: ProjectId) -> Result<Vec<UserConnector>> {
        let mut stmt = self.conn().prepare(
            "SELECT project_id, user_id, role_type, role_id
             FROM memberships
             WHERE project_id = ?1",
        )?;

        let rows = stmt.query_map(params![project.to_string()], row_to_membership)?;

        let mut memberships = Vec::new();
        for row in rows {
            memberships.push(row?);
        }
        Ok(memberships)
    }
}

pub(crate) fn upsert_project(conn: &Connection, project: &Project) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO projects (id, name, created_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![
            project.id.to_string(),
            project.name,
            project.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_project(conn: &Connection, id: ProjectId) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM projects WHERE id = ?1", params![id.to_string()])
}

pub(crate) fn upsert_membership(conn: &Connection, membership: &UserConnector) -> rusqlite::Result<()> {
    let (role_type, role_id) = encode_project_role(&membership.role);
    conn.execute(
        "INSERT INTO memberships (project_id, user_id, role_type, role_id)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(project_id, user_id) DO UPDATE SET
             role_type = excluded.role_type,
             role_id = excluded.role_id",
        params![
            membership.project.to_string(),
            membership.user.to_string(),
            role_type,
            role_id,
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_membership(conn: &Connection, project: ProjectId, user: UserId) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM memberships WHERE project_id = ?1 AND user_id = ?2",
        params![project.to_string(), user.to_string()],
    )
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: rows::id(row, 0, ProjectId::parse)?,
        name: row.get(1)?,
        created_at: rows::timestamp(row, 2)?,
    })
}

fn row_to_membership(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserConnector> {
    let role_type: String = row.get(2)?;
    let role_id: Option<String> = row.get(3)?;
    let role = decode_project_role(&role_type, role_id.as_deref()).map_err(|e| rows::conversion(2, e))?;

    Ok(UserConnector {
        project: rows::id(row, 0, ProjectId::parse)?,
        user: rows::id(row, 1, UserId::parse)?,
        role,
    })
}
