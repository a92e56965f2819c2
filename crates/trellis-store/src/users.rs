//! CRUD operations for [`User`] records.

use rusqlite::{params, Connection};
use trellis_core::User;
use trellis_shared::UserId;

use crate::database::Database;
use crate::error::{not_found, Result};
use crate::rows;

impl Database {
    /// Fetch a single user by id.
    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, display_name, email
                 FROM users
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Fetch a single user by login.
    pub fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, display_name, email
                 FROM users
                 WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// List all users, ordered by username.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, username, display_name, email
             FROM users
             ORDER BY username ASC",
        )?;

        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}

pub(crate) fn upsert_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, display_name, email)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             username = excluded.username,
             display_name = excluded.display_name,
             email = excluded.email",
        params![user.id.to_string(), user.username, user.display_name, user.email],
    )?;
    Ok(())
}

pub(crate) fn delete_user(conn: &Connection, id: UserId) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: rows::id(row, 0, UserId::parse)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        email: row.get(3)?,
    })
}
