//! SQLite database management

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use super::migrations;
use crate::error::{VaultError, VaultResult};

/// Shared handle to the relational store
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    /// `None` for in-memory databases
    pub path: Option<PathBuf>,
}

impl Database {
    /// Open or create a database at the specified path and run migrations
    pub fn open(path: PathBuf) -> VaultResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VaultError::Io(format!("Failed to create data directory: {}", e)))?;
        }

        let conn = Connection::open(&path)?;
        Self::init(conn, Some(path))
    }

    /// Private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> VaultResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(mut conn: Connection, path: Option<PathBuf>) -> VaultResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::run_migrations(&mut conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    fn lock(&self) -> VaultResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| VaultError::Database("Lock poisoned".into()))
    }

    /// Execute a closure with the connection
    pub fn with_connection<F, T>(&self, f: F) -> VaultResult<T>
    where
        F: FnOnce(&Connection) -> VaultResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Execute a closure that needs to open transactions
    pub fn with_connection_mut<F, T>(&self, f: F) -> VaultResult<T>
    where
        F: FnOnce(&mut Connection) -> VaultResult<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .finish()
    }
}

/// Fixed-width UTC text so that lexical order equals chronological order
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|dt| dt.with_timezone(&Utc))
}

/// Adapt a column decoding failure into a rusqlite error
pub(crate) fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    #[test]
    fn test_database_creation() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");
        let db = Database::open(db_path.clone()).unwrap();
        assert!(db_path.exists());
        assert_eq!(db.path.as_deref(), Some(db_path.as_path()));
    }

    #[test]
    fn test_schema_initialization() {
        let db = Database::open_in_memory().unwrap();

        db.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table'")?;
            let tables: Vec<String> = stmt
                .query_map([], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            assert!(tables.contains(&"backup_metadata".to_string()));
            assert!(tables.contains(&"transaction_log".to_string()));
            assert!(tables.contains(&"taken".to_string()));
            assert!(tables.contains(&"users".to_string()));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_timestamp_text_sorts_chronologically() {
        let early = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let late = early + Duration::microseconds(1);
        let a = format_timestamp(early);
        let b = format_timestamp(late);
        assert_eq!(a, "2026-01-02T03:04:05.000000Z");
        assert!(a < b);
        assert_eq!(parse_timestamp(&b).unwrap(), late);
    }
}
