//! Storage layer for taskvault
//!
//! A SQLite database holds the application tables, backup bookkeeping and the
//! transaction log. Settings live beside it as a JSON file written atomically.

pub mod backups;
pub mod database;
pub mod file_io;
pub mod migrations;
pub mod tables;
pub mod transaction_log;

pub use backups::BackupStore;
pub use database::{format_timestamp, parse_timestamp, Database};
pub use file_io::{read_json_required, write_bytes_atomic, write_json_atomic};

use crate::config::VaultPaths;
use crate::error::VaultResult;

/// Prepare the data directory and open the database
pub fn initialize(paths: &VaultPaths) -> VaultResult<Database> {
    paths.ensure_directories()?;
    let db = Database::open(paths.database_file())?;
    tracing::debug!(path = %paths.database_file().display(), "Database ready");
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let db = initialize(&paths).unwrap();

        assert!(paths.database_file().exists());
        assert!(paths.object_store_dir().exists());
        assert_eq!(db.path.as_deref(), Some(paths.database_file().as_path()));
    }
}
