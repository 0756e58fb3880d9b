//! Custom error types for taskvault
//!
//! This module defines the error hierarchy for the backup and transaction-log
//! engine using thiserror for ergonomic error definitions.

use thiserror::Error;

/// The main error type for taskvault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Rejected input: unknown operation, untracked table, malformed snapshot
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Relational store errors
    #[error("Database error: {0}")]
    Database(String),

    /// Object store errors (unavailable, checksum mismatch, missing blob)
    #[error("Object store error: {0}")]
    ObjectStore(String),

    /// Gzip encode/decode errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Local storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Failures that abort a restore as a whole and roll it back
    #[error("Restore aborted: {0}")]
    Structural(String),
}

impl VaultError {
    /// Create a "not found" error for backups
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for transaction log entries
    pub fn log_entry_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Transaction log entry",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for rows in a tracked table
    pub fn record_not_found(table: impl std::fmt::Display, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Record",
            identifier: format!("{}:{}", table, identifier.into()),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error aborted a restore
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<rusqlite::Error> for VaultError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for taskvault operations
pub type VaultResult<T> = Result<T, VaultError>;
