//! The SQLite file behind a trellis workspace.
//!
//! Every constructor of [`Database`] migrates the schema before handing the
//! connection out, so the query modules can assume the latest tables.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// An open, migrated trellis database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open `trellis.db` under [`Database::default_dir`], creating it on first use.
    pub fn new() -> Result<Self> {
        let path = Self::default_dir()?.join("trellis.db");
        tracing::info!(path = %path.display(), "opening workspace database");
        Self::open_at(&path)
    }

    /// Per-user data directory, e.g. `~/.local/share/trellis` on Linux.
    pub fn default_dir() -> Result<PathBuf> {
        ProjectDirs::from("org", "trellis", "trellis")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(StoreError::NoDataDir)
    }

    /// Open the database file at `path`. Missing parent directories are created.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::prepare(conn)
    }

    /// A throwaway database living only as long as the value.
    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Mutable access, needed to open a transaction.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// File backing the connection; `None` for in-memory databases.
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().filter(|p| !p.is_empty()).map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_creates_directories_and_migrates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("workspace.db");

        let db = Database::open_at(&path).unwrap();
        assert!(path.exists());
        assert!(db.path().is_some());

        let version: u32 = db
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, migrations::latest_version());
        assert_eq!(version, 2);
    }

    #[test]
    fn in_memory_databases_have_no_path() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.path().is_none());
    }
}
