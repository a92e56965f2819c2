//! Schema versions, tracked in `PRAGMA user_version`.
//!
//! [`MIGRATIONS`] lists every step in order. Opening a database applies the
//! steps above its recorded version, each one followed by a version bump, and
//! refuses a file written by a newer build.

pub mod v001_initial;
pub mod v002_comments_and_visits;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

struct Migration {
    version: u32,
    name: &'static str,
    up: fn(&Connection) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "v001_initial",
        up: v001_initial::up,
    },
    Migration {
        version: 2,
        name: "v002_comments_and_visits",
        up: v002_comments_and_visits::up,
    },
];

/// Version of the newest schema this build knows.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Bring the schema behind `conn` up to [`latest_version`].
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let on_disk: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let latest = latest_version();
    if on_disk > latest {
        return Err(StoreError::Migration(format!(
            "schema v{on_disk} was written by a newer build (this one knows v{latest})"
        )));
    }

    for step in MIGRATIONS.iter().filter(|m| m.version > on_disk) {
        tracing::info!(version = step.version, migration = step.name, "upgrading schema");
        (step.up)(conn).map_err(|e| StoreError::Migration(format!("{}: {e}", step.name)))?;
        conn.pragma_update(None, "user_version", step.version)?;
    }

    tracing::debug!(from = on_disk, to = latest, "schema up to date");
    Ok(())
}
