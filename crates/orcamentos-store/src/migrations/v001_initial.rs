//! v001 -- Initial schema creation.
//!
//! A single key/value table holds every record collection as a JSON document.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    key        TEXT PRIMARY KEY NOT NULL,   -- "quotes", "folders", "attachments:<id>"
    value      TEXT NOT NULL,               -- JSON array
    updated_at TEXT NOT NULL                -- RFC-3339
);
"#;

pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
