//! CRUD operations for kanbans, their columns and elements.

use rusqlite::{params, Connection};
use trellis_core::{ElementComment, Kanban, KanbanColumn, KanbanElement};
use trellis_shared::{ColumnId, CommentId, ElementId, ElementStatus, KanbanId, ProjectId, UserId};

use crate::database::Database;
use crate::error::{not_found, Result};
use crate::rows;

const ELEMENT_COLUMNS: &str = "id, column_id, owner_id, last_redactor_id, serial_number, name, tag, \
                               content, photo, status, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, element_id, owner_id, text, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Kanbans
    // ------------------------------------------------------------------

    pub fn get_kanban(&self, id: KanbanId) -> Result<Kanban> {
        self.conn()
            .query_row(
                "SELECT id, project_id, name FROM kanbans WHERE id = ?1",
                params![id.to_string()],
                row_to_kanban,
            )
            .map_err(not_found)
    }

    pub fn list_kanbans(&self) -> Result<Vec<Kanban>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, project_id, name FROM kanbans ORDER BY name ASC")?;

        let rows = stmt.query_map([], row_to_kanban)?;

        let mut kanbans = Vec::new();
        for row in rows {
            kanbans.push(row?);
        }
        Ok(kanbans)
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    /// Columns of one kanban in display order.
    pub fn list_columns(&self, kanban: KanbanId) -> Result<Vec<KanbanColumn>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, kanban_id, name, serial_number
             FROM kanban_columns
             WHERE kanban_id = ?1
             ORDER BY serial_number ASC",
        )?;

        let rows = stmt.query_map(params![kanban.to_string()], row_to_column)?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    pub fn list_all_columns(&self) -> Result<Vec<KanbanColumn>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, kanban_id, name, serial_number
             FROM kanban_columns",
        )?;

        let rows = stmt.query_map([], row_to_column)?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    // ------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------

    pub fn get_element(&self, id: ElementId) -> Result<KanbanElement> {
        self.conn()
            .query_row(
                &format!("SELECT {ELEMENT_COLUMNS} FROM kanban_elements WHERE id = ?1"),
                params![id.to_string()],
                row_to_element,
            )
            .map_err(not_found)
    }

    /// One status partition of a column, ordered by serial number.
    pub fn list_elements(&self, column: ColumnId, status: ElementStatus) -> Result<Vec<KanbanElement>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ELEMENT_COLUMNS}
             FROM kanban_elements
             WHERE column_id = ?1 AND status = ?2
             ORDER BY serial_number ASC"
        ))?;

        let rows = stmt.query_map(params![column.to_string(), status.as_str()], row_to_element)?;

        let mut elements = Vec::new();
        for row in rows {
            elements.push(row?);
        }
        Ok(elements)
    }

    pub fn list_all_elements(&self) -> Result<Vec<KanbanElement>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {ELEMENT_COLUMNS} FROM kanban_elements"))?;

        let rows = stmt.query_map([], row_to_element)?;

        let mut elements = Vec::new();
        for row in rows {
            elements.push(row?);
        }
        Ok(elements)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Comments on one element, oldest first.
    pub fn list_comments(&self, element: ElementId) -> Result<Vec<ElementComment>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {COMMENT_COLUMNS}
             FROM element_comments
             WHERE element_id = ?1
             ORDER BY created_at ASC, id ASC"
        ))?;
        let comments = stmt
            .query_map(params![element.to_string()], row_to_comment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }

    pub fn list_all_comments(&self) -> Result<Vec<ElementComment>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {COMMENT_COLUMNS} FROM element_comments"))?;
        let comments = stmt
            .query_map([], row_to_comment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }
}

pub(crate) fn upsert_kanban(conn: &Connection, kanban: &Kanban) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO kanbans (id, project_id, name)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![kanban.id.to_string(), kanban.project.to_string(), kanban.name],
    )?;
    Ok(())
}

pub(crate) fn delete_kanban(conn: &Connection, id: KanbanId) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM kanbans WHERE id = ?1", params![id.to_string()])
}

pub(crate) fn upsert_column(conn: &Connection, column: &KanbanColumn) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO kanban_columns (id, kanban_id, name, serial_number)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             kanban_id = excluded.kanban_id,
             name = excluded.name,
             serial_number = excluded.serial_number",
        params![
            column.id.to_string(),
            column.kanban.to_string(),
            column.name,
            column.serial_number,
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_column(conn: &Connection, id: ColumnId) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM kanban_columns WHERE id = ?1", params![id.to_string()])
}

pub(crate) fn upsert_element(conn: &Connection, element: &KanbanElement) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO kanban_elements
             (id, column_id, owner_id, last_redactor_id, serial_number, name, tag,
              content, photo, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(id) DO UPDATE SET
             column_id = excluded.column_id,
             last_redactor_id = excluded.last_redactor_id,
             serial_number = excluded.serial_number,
             name = excluded.name,
             tag = excluded.tag,
             content = excluded.content,
             photo = excluded.photo,
             status = excluded.status,
             updated_at = excluded.updated_at",
        params![
            element.id.to_string(),
            element.column.to_string(),
            element.owner.to_string(),
            element.last_redactor.to_string(),
            element.serial_number,
            element.name,
            element.tag,
            element.content,
            element.photo,
            element.status.as_str(),
            element.created_at.to_rfc3339(),
            element.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_element(conn: &Connection, id: ElementId) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM kanban_elements WHERE id = ?1", params![id.to_string()])
}

pub(crate) fn upsert_comment(conn: &Connection, comment: &ElementComment) -> rusqlite::Result<()> {
    // Comments never change once written.
    conn.execute(
        "INSERT INTO element_comments (id, element_id, owner_id, text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO NOTHING",
        params![
            comment.id.to_string(),
            comment.element.to_string(),
            comment.owner.to_string(),
            comment.text,
            comment.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_comment(conn: &Connection, id: CommentId) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM element_comments WHERE id = ?1", params![id.to_string()])
}

fn row_to_kanban(row: &rusqlite::Row<'_>) -> rusqlite::Result<Kanban> {
    Ok(Kanban {
        id: rows::id(row, 0, KanbanId::parse)?,
        project: rows::id(row, 1, ProjectId::parse)?,
        name: row.get(2)?,
    })
}

fn row_to_column(row: &rusqlite::Row<'_>) -> rusqlite::Result<KanbanColumn> {
    Ok(KanbanColumn {
        id: rows::id(row, 0, ColumnId::parse)?,
        kanban: rows::id(row, 1, KanbanId::parse)?,
        name: row.get(2)?,
        serial_number: row.get(3)?,
    })
}

fn row_to_element(row: &rusqlite::Row<'_>) -> rusqlite::Result<KanbanElement> {
    let status: String = row.get(9)?;
    let status = status
        .parse::<ElementStatus>()
        .map_err(|e| rows::conversion(9, e))?;

    Ok(KanbanElement {
        id: rows::id(row, 0, ElementId::parse)?,
        column: rows::id(row, 1, ColumnId::parse)?,
        owner: rows::id(row, 2, UserId::parse)?,
        last_redactor: rows::id(row, 3, UserId::parse)?,
        serial_number: row.get(4)?,
        name: row.get(5)?,
        tag: row.get(6)?,
        content: row.get(7)?,
        photo: row.get(8)?,
        status,
        created_at: rows::timestamp(row, 10)?,
        updated_at: rows::timestamp(row, 11)?,
    })
}

fn row_to_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<ElementComment> {
    Ok(ElementComment {
        id: rows::id(row, 0, CommentId::parse)?,
        element: rows::id(row, 1, ElementId::parse)?,
        owner: rows::id(row, 2, UserId::parse)?,
        text: row.get(3)?,
        created_at: rows::timestamp(row, 4)?,
    })
}
