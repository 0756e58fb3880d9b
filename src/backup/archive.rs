//! Backup document format
//!
//! A backup is one JSON object with a row array per table plus a `_metadata`
//! manifest, gzip-compressed before upload.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::BackupType;
use crate::error::{VaultError, VaultResult};
use crate::models::BackupId;

/// Manifest embedded in every backup document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    pub backup_id: BackupId,
    /// Captured before the first table is read; replay starts after it
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    /// Table names in export order
    pub tables: Vec<String>,
    pub record_counts: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    #[serde(flatten)]
    pub tables: BTreeMap<String, Vec<Value>>,
    #[serde(rename = "_metadata")]
    pub metadata: BackupManifest,
}

impl BackupDocument {
    /// Serialize and gzip
    pub fn to_gzip(&self) -> VaultResult<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        compress(&json)
    }

    /// Gunzip and parse
    pub fn from_gzip(data: &[u8]) -> VaultResult<Self> {
        let json = decompress(data)?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Rows for `table`, if the snapshot contains it
    pub fn rows(&self, table: &str) -> Option<&[Value]> {
        self.tables.get(table).map(Vec::as_slice)
    }
}

pub fn compress(data: &[u8]) -> VaultResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| VaultError::Compression(format!("Failed to compress backup: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| VaultError::Compression(format!("Failed to finish compression: {}", e)))
}

pub fn decompress(data: &[u8]) -> VaultResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| VaultError::Compression(format!("Failed to decompress backup: {}", e)))?;
    Ok(out)
}
