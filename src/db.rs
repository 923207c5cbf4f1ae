use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Make a collection name usable as a SQLite table name: hyphens, dots and
/// spaces become underscores. Nothing else is rewritten or quoted.
pub fn sanitize_table_name(name: &str) -> String {
    name.replace(['-', '.', ' '], "_")
}

/// Destination side of the import: one SQLite connection, one table named
/// after the collection, one row per document.
pub struct LoadSink {
    conn: Connection,
    table: String,
}

impl LoadSink {
    /// Open (or create) the database file and the destination table.
    pub fn open(path: &Path, collection: &str) -> Result<Self> {
        tracing::debug!("Creating SQLite database {}", path.display());
        let conn = Connection::open(path)
            .with_context(|| format!("opening sqlite at {}", path.display()))?;
        Self::with_connection(conn, collection)
    }

    /// In-memory variant, used by tests.
    pub fn open_in_memory(collection: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, collection)
    }

    fn with_connection(conn: Connection, collection: &str) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(30))?;
        let table = sanitize_table_name(collection);
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id TEXT UNIQUE,
                data TEXT
            );
            "#
        ))
        .with_context(|| format!("failed to create table {table}"))?;
        tracing::info!("Database table ready: {}", table);
        Ok(LoadSink { conn, table })
    }

    /// Insert a document, replacing any existing row with the same
    /// `document_id`. An empty id is a legal key: documents without an `_id`
    /// all land on the same row.
    pub fn upsert(&self, document_id: &str, data: &str) -> rusqlite::Result<()> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT OR REPLACE INTO {} (document_id, data) VALUES (?1, ?2)",
            self.table
        ))?;
        stmt.execute(params![document_id, data])?;
        Ok(())
    }

    /// Stored JSON text for a document id, if present.
    pub fn get(&self, document_id: &str) -> rusqlite::Result<Option<String>> {
        self.conn
            .query_row(
                &format!("SELECT data FROM {} WHERE document_id = ?1", self.table),
                [document_id],
                |row| row.get(0),
            )
            .optional()
    }

    /// Number of rows in the destination table.
    pub fn row_count(&self) -> rusqlite::Result<u64> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
                row.get(0)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_table_names() {
        assert_eq!(sanitize_table_name("user-profiles"), "user_profiles");
        assert_eq!(sanitize_table_name("app.events v2"), "app_events_v2");
        assert_eq!(sanitize_table_name("plain"), "plain");
    }

    #[test]
    fn upsert_replaces_by_document_id() -> Result<()> {
        let sink = LoadSink::open_in_memory("c")?;
        sink.upsert("a", r#"{"v": 1}"#)?;
        sink.upsert("a", r#"{"v": 2}"#)?;
        assert_eq!(sink.row_count()?, 1);
        assert_eq!(sink.get("a")?.as_deref(), Some(r#"{"v": 2}"#));
        Ok(())
    }

    #[test]
    fn empty_document_id_is_a_single_key() -> Result<()> {
        let sink = LoadSink::open_in_memory("c")?;
        sink.upsert("", "first")?;
        sink.upsert("", "second")?;
        assert_eq!(sink.row_count()?, 1);
        assert_eq!(sink.get("")?.as_deref(), Some("second"));
        Ok(())
    }

    #[test]
    fn reopening_reuses_the_table() -> Result<()> {
        let path = std::env::temp_dir().join(format!("bson2sqlite-reopen-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let sink = LoadSink::open(&path, "c")?;
            sink.upsert("a", "{}")?;
        }
        let sink = LoadSink::open(&path, "c")?;
        assert_eq!(sink.row_count()?, 1);
        drop(sink);
        let _ = std::fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn table_named_after_sanitized_collection() -> Result<()> {
        let sink = LoadSink::open_in_memory("user-profiles")?;
        assert_eq!(sink.table, "user_profiles");
        sink.upsert("a", "{}")?;
        assert_eq!(sink.row_count()?, 1);
        Ok(())
    }
}
