//! v002 -- Element comments and per-user page visit marks.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS element_comments (
    id         TEXT PRIMARY KEY NOT NULL,
    element_id TEXT NOT NULL,
    owner_id   TEXT NOT NULL,
    text       TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (element_id) REFERENCES kanban_elements(id) ON DELETE CASCADE,
    FOREIGN KEY (owner_id)   REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_element_comments_element
    ON element_comments(element_id, created_at);

-- serial_number 0 is the user's latest visit
CREATE TABLE IF NOT EXISTS visit_marks (
    user_id       TEXT NOT NULL,
    page_id       TEXT NOT NULL,
    serial_number INTEGER NOT NULL,
    visited_at    TEXT NOT NULL,

    PRIMARY KEY (user_id, page_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (page_id) REFERENCES pages(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_visit_marks_page ON visit_marks(page_id);
"#;

pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
