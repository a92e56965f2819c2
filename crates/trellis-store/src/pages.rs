//! CRUD operations for [`Page`] records and the [`VisitMark`]s pointing at them.

use rusqlite::{params, Connection};
use trellis_core::{Page, VisitMark};
use trellis_shared::{PageId, ProjectId, UserId};

use crate::database::Database;
use crate::error::{not_found, Result};
use crate::rows;

impl Database {
    /// Fetch a single page by id.
    pub fn get_page(&self, id: PageId) -> Result<Page> {
        self.conn()
            .query_row(
                "SELECT id, project_id, owner_id, parent_id, root_id, serial_number,
                        name, published, content, created_at, updated_at
                 FROM pages
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_page,
            )
            .map_err(not_found)
    }

    /// Every page of a project, grouped by parent and ordered by serial.
    pub fn list_pages(&self, project: ProjectId) -> Result<Vec<Page>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, project_id, owner_id, parent_id, root_id, serial_number,
                    name, published, content, created_at, updated_at
             FROM pages
             WHERE project_id = ?1
             ORDER BY parent_id, serial_number ASC",
        )?;

        let rows = stmt.query_map(params![project.to_string()], row_to_page)?;

        let mut pages = Vec::new();
        for row in rows {
            pages.push(row?);
        }
        Ok(pages)
    }

    pub fn list_all_pages(&self) -> Result<Vec<Page>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, project_id, owner_id, parent_id, root_id, serial_number,
                    name, published, content, created_at, updated_at
             FROM pages",
        )?;

        let rows = stmt.query_map([], row_to_page)?;

        let mut pages = Vec::new();
        for row in rows {
            pages.push(row?);
        }
        Ok(pages)
    }

    /// A user's recently visited pages, latest first.
    pub fn list_visit_marks(&self, user: UserId) -> Result<Vec<VisitMark>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, page_id, serial_number, visited_at
             FROM visit_marks
             WHERE user_id = ?1
             ORDER BY serial_number ASC",
        )?;
        let marks = stmt
            .query_map(params![user.to_string()], row_to_visit_mark)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(marks)
    }

    pub fn list_all_visit_marks(&self) -> Result<Vec<VisitMark>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT user_id, page_id, serial_number, visited_at FROM visit_marks")?;
        let marks = stmt
            .query_map([], row_to_visit_mark)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(marks)
    }
}

pub(crate) fn upsert_page(conn: &Connection, page: &Page) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO pages
             (id, project_id, owner_id, parent_id, root_id, serial_number,
              name, published, content, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(id) DO UPDATE SET
             parent_id = excluded.parent_id,
             root_id = excluded.root_id,
             serial_number = excluded.serial_number,
             name = excluded.name,
             published = excluded.published,
             content = excluded.content,
             updated_at = excluded.updated_at",
        params![
            page.id.to_string(),
            page.project.to_string(),
            page.owner.to_string(),
            page.parent.map(|p| p.to_string()),
            page.root.map(|p| p.to_string()),
            page.serial_number,
            page.name,
            page.published,
            page.content,
            page.created_at.to_rfc3339(),
            page.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_page(conn: &Connection, id: PageId) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM pages WHERE id = ?1", params![id.to_string()])
}

fn row_to_page(row: &rusqlite::Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: rows::id(row, 0, PageId::parse)?,
        project: rows::id(row, 1, ProjectId::parse)?,
        owner: rows::id(row, 2, UserId::parse)?,
        parent: rows::opt_id(row, 3, PageId::parse)?,
        root: rows::opt_id(row, 4, PageId::parse)?,
        serial_number: row.get(5)?,
        name: row.get(6)?,
        published: row.get(7)?,
        content: row.get(8)?,
        created_at: rows::timestamp(row, 9)?,
        updated_at: rows::timestamp(row, 10)?,
    })
}

pub(crate) fn upsert_visit_mark(conn: &Connection, mark: &VisitMark) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO visit_marks (user_id, page_id, serial_number, visited_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id, page_id) DO UPDATE SET
             serial_number = excluded.serial_number,
             visited_at = excluded.visited_at",
        params![
            mark.user.to_string(),
            mark.page.to_string(),
            mark.serial_number,
            mark.visited_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_visit_mark(conn: &Connection, user: UserId, page: PageId) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM visit_marks WHERE user_id = ?1 AND page_id = ?2",
        params![user.to_string(), page.to_string()],
    )
}

fn row_to_visit_mark(row: &rusqlite::Row<'_>) -> rusqlite::Result<VisitMark> {
    Ok(VisitMark {
        user: rows::id(row, 0, UserId::parse)?,
        page: rows::id(row, 1, PageId::parse)?,
        serial_number: row.get(2)?,
        visited_at: rows::timestamp(row, 3)?,
    })
}
