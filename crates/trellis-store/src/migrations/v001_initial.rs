//! v001 -- Initial schema creation.
//!
//! Users and projects, project memberships, custom roles with their kanban
//! and page grants, kanban boards (kanbans, columns, elements) and pages.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    username     TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    email        TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Projects
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS projects (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL                  -- RFC-3339
);

-- ----------------------------------------------------------------
-- Custom roles and their grants
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS custom_roles (
    id                 TEXT PRIMARY KEY NOT NULL,
    project_id         TEXT NOT NULL,
    name               TEXT NOT NULL,
    can_edit_resources INTEGER NOT NULL DEFAULT 0,

    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_custom_roles_project ON custom_roles(project_id);

-- ----------------------------------------------------------------
-- Memberships
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS memberships (
    project_id TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    role_type  TEXT NOT NULL,                 -- ADMIN | STANDARD_USER | CUSTOM_ROLE
    role_id    TEXT,                          -- set iff role_type = CUSTOM_ROLE

    PRIMARY KEY (project_id, user_id),
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id)    REFERENCES users(id)    ON DELETE CASCADE,
    FOREIGN KEY (role_id)    REFERENCES custom_roles(id)
);

CREATE INDEX IF NOT EXISTS idx_memberships_user ON memberships(user_id);

-- ----------------------------------------------------------------
-- Kanbans
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS kanbans (
    id         TEXT PRIMARY KEY NOT NULL,
    project_id TEXT NOT NULL,
    name       TEXT NOT NULL,

    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS kanban_columns (
    id            TEXT PRIMARY KEY NOT NULL,
    kanban_id     TEXT NOT NULL,
    name          TEXT NOT NULL,
    serial_number INTEGER NOT NULL,

    FOREIGN KEY (kanban_id) REFERENCES kanbans(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_kanban_columns_kanban ON kanban_columns(kanban_id);

CREATE TABLE IF NOT EXISTS kanban_elements (
    id               TEXT PRIMARY KEY NOT NULL,
    column_id        TEXT NOT NULL,
    owner_id         TEXT NOT NULL,
    last_redactor_id TEXT NOT NULL,
    serial_number    INTEGER NOT NULL,
    name             TEXT NOT NULL,
    tag              TEXT,
    content          TEXT NOT NULL,
    photo            BLOB,
    status           TEXT NOT NULL,           -- ALIVE | ARCHIVED | UTILISE
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,

    FOREIGN KEY (column_id)        REFERENCES kanban_columns(id) ON DELETE CASCADE,
    FOREIGN KEY (owner_id)         REFERENCES users(id),
    FOREIGN KEY (last_redactor_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_kanban_elements_column
    ON kanban_elements(column_id, status, serial_number);

-- ----------------------------------------------------------------
-- Pages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS pages (
    id            TEXT PRIMARY KEY NOT NULL,
    project_id    TEXT NOT NULL,
    owner_id      TEXT NOT NULL,
    parent_id     TEXT,                       -- NULL for root pages
    root_id       TEXT,                       -- NULL iff parent_id is NULL
    serial_number INTEGER NOT NULL,
    name          TEXT NOT NULL,
    published     INTEGER NOT NULL DEFAULT 0,
    content       TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,

    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
    FOREIGN KEY (owner_id)   REFERENCES users(id),
    FOREIGN KEY (parent_id)  REFERENCES pages(id) ON DELETE CASCADE,
    FOREIGN KEY (root_id)    REFERENCES pages(id)
);

CREATE INDEX IF NOT EXISTS idx_pages_parent ON pages(project_id, parent_id, serial_number);

-- ----------------------------------------------------------------
-- Grants
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS kanban_grants (
    role_id   TEXT NOT NULL,
    kanban_id TEXT NOT NULL,
    can_edit  INTEGER NOT NULL DEFAULT 0,
    position  INTEGER NOT NULL,

    PRIMARY KEY (role_id, kanban_id),
    FOREIGN KEY (role_id)   REFERENCES custom_roles(id) ON DELETE CASCADE,
    FOREIGN KEY (kanban_id) REFERENCES kanbans(id)      ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS page_grants (
    role_id  TEXT NOT NULL,
    page_id  TEXT NOT NULL,
    can_edit INTEGER NOT NULL DEFAULT 0,
    position INTEGER NOT NULL,

    PRIMARY KEY (role_id, page_id),
    FOREIGN KEY (role_id) REFERENCES custom_roles(id) ON DELETE CASCADE,
    FOREIGN KEY (page_id) REFERENCES pages(id)        ON DELETE CASCADE
);
"#;

/// Apply the initial schema.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
