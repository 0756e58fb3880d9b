//! Transaction log entry data structures
//!
//! Defines the mutation kinds, the request a write path hands to the logger,
//! the persisted entry and the query options for reading the log back.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::diff::generate_diff;
use crate::error::{VaultError, VaultResult};
use crate::models::{LogEntryId, Row, TrackedTable};

/// Types of mutations that are logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INSERT" => Ok(Operation::Insert),
            "UPDATE" => Ok(Operation::Update),
            "DELETE" => Ok(Operation::Delete),
            _ => Err(VaultError::Validation(format!("Invalid operation: {}", s))),
        }
    }
}

/// A mutation reported by an application write path
#[derive(Debug, Clone, PartialEq)]
pub struct LogRequest {
    /// `None` for system-triggered mutations
    pub user_id: Option<String>,
    pub operation: Operation,
    pub table: TrackedTable,
    pub record_id: String,
    pub old_data: Option<Value>,
    pub new_data: Option<Value>,
    pub request_path: Option<String>,
}

impl LogRequest {
    fn new(operation: Operation, table: TrackedTable, record_id: impl Into<String>) -> Self {
        Self {
            user_id: None,
            operation,
            table,
            record_id: record_id.into(),
            old_data: None,
            new_data: None,
            request_path: None,
        }
    }

    /// Request for a freshly inserted row
    pub fn insert(table: TrackedTable, record_id: impl Into<String>, new_data: Value) -> Self {
        Self::new(Operation::Insert, table, record_id).with_new_data(new_data)
    }

    /// Request for an updated row
    pub fn update(
        table: TrackedTable,
        record_id: impl Into<String>,
        old_data: Value,
        new_data: Value,
    ) -> Self {
        Self::new(Operation::Update, table, record_id)
            .with_old_data(old_data)
            .with_new_data(new_data)
    }

    /// Request for a deleted row
    pub fn delete(table: TrackedTable, record_id: impl Into<String>, old_data: Value) -> Self {
        Self::new(Operation::Delete, table, record_id).with_old_data(old_data)
    }

    /// Build a request from untyped operation and table names
    pub fn parse(operation: &str, table_name: &str, record_id: impl Into<String>) -> VaultResult<Self> {
        let operation = operation.parse::<Operation>()?;
        let table = table_name.parse::<TrackedTable>()?;
        Ok(Self::new(operation, table, record_id))
    }

    pub fn with_old_data(mut self, old_data: Value) -> Self {
        self.old_data = Some(old_data);
        self
    }

    pub fn with_new_data(mut self, new_data: Value) -> Self {
        self.new_data = Some(new_data);
        self
    }

    pub fn by_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn from_path(mut self, request_path: impl Into<String>) -> Self {
        self.request_path = Some(request_path.into());
        self
    }

    /// Check the audit whitelist and the snapshot shape required by the operation
    pub fn validate(&self) -> VaultResult<()> {
        if !self.table.is_audited() {
            return Err(VaultError::Validation(format!(
                "Table {} is not tracked for transaction logging",
                self.table
            )));
        }
        if self.record_id.trim().is_empty() {
            return Err(VaultError::Validation("record_id must not be empty".into()));
        }

        let (old_expected, new_expected) = match self.operation {
            Operation::Insert => (false, true),
            Operation::Update => (true, true),
            Operation::Delete => (true, false),
        };
        check_snapshot("old_data", self.operation, &self.old_data, old_expected)?;
        check_snapshot("new_data", self.operation, &self.new_data, new_expected)?;
        Ok(())
    }
}

fn check_snapshot(
    field: &str,
    operation: Operation,
    snapshot: &Option<Value>,
    expected: bool,
) -> VaultResult<()> {
    match (snapshot, expected) {
        (Some(Value::Object(_)), true) | (None, false) => Ok(()),
        (Some(_), true) => Err(VaultError::Validation(format!(
            "{} for {} must be a JSON object",
            field, operation
        ))),
        (None, true) => Err(VaultError::Validation(format!(
            "{} requires {}",
            operation, field
        ))),
        (Some(_), false) => Err(VaultError::Validation(format!(
            "{} must not carry {}",
            operation, field
        ))),
    }
}

/// A persisted transaction log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    pub id: LogEntryId,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub operation: Operation,
    #[serde(rename = "table_name")]
    pub table: TrackedTable,
    pub record_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,
}

impl TransactionLogEntry {
    /// The pre-change snapshot as a schema-checked row
    pub fn old_row(&self) -> VaultResult<Row> {
        let data = self
            .old_data
            .as_ref()
            .ok_or_else(|| VaultError::Validation("No old_data available to restore".into()))?;
        Row::from_json(self.table, data)
    }

    /// The post-change snapshot as a schema-checked row
    pub fn new_row(&self) -> VaultResult<Row> {
        let data = self
            .new_data
            .as_ref()
            .ok_or_else(|| VaultError::Validation("No new_data available to apply".into()))?;
        Row::from_json(self.table, data)
    }

    /// Field-level summary of an UPDATE, e.g. `lijst: "inbox" -> "vandaag"`
    pub fn change_summary(&self) -> Option<String> {
        match (&self.old_data, &self.new_data) {
            (Some(old), Some(new)) => generate_diff(old, new),
            _ => None,
        }
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "#{} [{}] {} {}:{}",
            self.id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.table,
            self.record_id
        );

        if let Some(user) = &self.user_id {
            output.push_str(&format!(" by {}", user));
        }

        if let Some(diff) = self.change_summary() {
            output.push_str(&format!("\n  Changes: {}", diff));
        }

        output
    }
}

/// Filters for reading the transaction log; every field is optional
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    /// Inclusive lower bound on `timestamp`
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`
    pub until: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub table: Option<TrackedTable>,
    pub operation: Option<Operation>,
    pub limit: Option<u32>,
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn table(mut self, table: TrackedTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One page of log entries, newest first, plus the unpaged match count
#[derive(Debug, Clone)]
pub struct LogPage {
    pub entries: Vec<TransactionLogEntry>,
    pub total: u64,
}
