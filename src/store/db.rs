//! SQLite persistence
//!
//! One append-only table; each row carries the page, the table's position on
//! the page, and the shaped row mapping serialized as a JSON text blob.
//! Reruns append, nothing is ever updated or deleted.

use crate::error::Result;
use crate::extract::TableRecord;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pdf_extracted_tables (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    source      TEXT    NOT NULL,
    page        INTEGER NOT NULL,
    table_index INTEGER NOT NULL,
    data        TEXT    NOT NULL,
    created_at  TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_pdf_extracted_tables_source
    ON pdf_extracted_tables (source);
"#;

/// Append-only store for extracted tables
pub struct TableStore {
    conn: Arc<Mutex<Connection>>,
}

impl TableStore {
    /// Open (or create) a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, used in tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_connection(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Append one shaped table for `source`. The row mapping is stored as a
    /// JSON text blob.
    pub fn insert_record(&self, source: &str, record: &TableRecord) -> Result<()> {
        let data = serde_json::to_string(&record.data)?;
        let created_at = chrono::Utc::now().to_rfc3339();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO pdf_extracted_tables (source, page, table_index, data, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![source, record.page, record.table_index, data, created_at],
        )?;
        Ok(())
    }

    /// Append all records for one source
    pub fn insert_records(&self, source: &str, records: &[TableRecord]) -> Result<usize> {
        for record in records {
            self.insert_record(source, record)?;
        }
        Ok(records.len())
    }

    /// Total number of stored rows
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: u64 =
            conn.query_row("SELECT COUNT(*) FROM pdf_extracted_tables", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    /// Load every record stored for `source`, in insertion order
    pub fn records_for_source(&self, source: &str) -> Result<Vec<TableRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT page, table_index, data
            FROM pdf_extracted_tables
            WHERE source = ?1
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map([source], |row| {
            let page: u32 = row.get(0)?;
            let table_index: u32 = row.get(1)?;
            let data: String = row.get(2)?;
            Ok((page, table_index, data))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (page, table_index, data) = row?;
            records.push(TableRecord {
                page,
                table_index,
                data: serde_json::from_str(&data)?,
            });
        }
        Ok(records)
    }
}
