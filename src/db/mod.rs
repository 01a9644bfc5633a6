// src/db/mod.rs
// SQLite persistence layer for complaints

mod complaints;
mod schema;
pub mod types;

pub use complaints::{TriageUpdate, parse_complaint_row};
pub use types::*;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Database wrapper around a single SQLite connection
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open database at path, creating it (and parent directories) if needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        // WAL mode for concurrent readers alongside the SLA monitor
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Get a lock on the connection
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Database mutex poisoned")
    }

    /// Initialize schema (idempotent)
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(schema::SCHEMA)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::NewComplaint;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().expect("Failed to open in-memory db");
        let id = db
            .insert_complaint(&NewComplaint {
                customer_name: Some("Alice".to_string()),
                customer_email: None,
                channel: "Web".to_string(),
                subject: None,
                description: "test complaint".to_string(),
            })
            .unwrap();
        assert!(id > 0);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("complaints.db");
        let db = Database::open(&path).unwrap();
        drop(db);
        assert!(path.exists());
    }
}
