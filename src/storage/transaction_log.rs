//! Data access for the `transaction_log` table

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;

use super::database::{conversion_error, format_timestamp, parse_timestamp};
use crate::audit::{LogQuery, LogRequest, TransactionLogEntry};
use crate::error::VaultResult;
use crate::models::LogEntryId;

const SELECT_COLUMNS: &str = "SELECT id, timestamp, user_id, operation, table_name, record_id, \
     old_data, new_data, request_path FROM transaction_log";

/// Append one entry stamped with `at`
pub fn insert(
    conn: &Connection,
    request: &LogRequest,
    at: DateTime<Utc>,
) -> VaultResult<TransactionLogEntry> {
    let old_data = request.old_data.as_ref().map(serde_json::to_string).transpose()?;
    let new_data = request.new_data.as_ref().map(serde_json::to_string).transpose()?;

    conn.execute(
        "INSERT INTO transaction_log (timestamp, user_id, operation, table_name, record_id, \
         old_data, new_data, request_path)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            format_timestamp(at),
            request.user_id,
            request.operation.as_str(),
            request.table.name(),
            request.record_id,
            old_data,
            new_data,
            request.request_path,
        ],
    )?;

    Ok(TransactionLogEntry {
        id: LogEntryId::new(conn.last_insert_rowid()),
        timestamp: at,
        user_id: request.user_id.clone(),
        operation: request.operation,
        table: request.table,
        record_id: request.record_id.clone(),
        old_data: request.old_data.clone(),
        new_data: request.new_data.clone(),
        request_path: request.request_path.clone(),
    })
}

pub fn get(conn: &Connection, id: LogEntryId) -> VaultResult<Option<TransactionLogEntry>> {
    let entry = conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_COLUMNS),
            params![id.value()],
            row_to_entry,
        )
        .optional()?;
    Ok(entry)
}

/// Build the shared WHERE clause for a query
fn filters(query: &LogQuery) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    let mut push = |clause: &str, value: SqlValue| {
        values.push(value);
        clauses.push(format!("{} ?{}", clause, values.len()));
    };

    if let Some(since) = query.since {
        push("timestamp >=", SqlValue::Text(format_timestamp(since)));
    }
    if let Some(until) = query.until {
        push("timestamp <=", SqlValue::Text(format_timestamp(until)));
    }
    if let Some(user) = &query.user_id {
        push("user_id =", SqlValue::Text(user.clone()));
    }
    if let Some(table) = query.table {
        push("table_name =", SqlValue::Text(table.name().to_string()));
    }
    if let Some(operation) = query.operation {
        push("operation =", SqlValue::Text(operation.as_str().to_string()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (where_clause, values)
}

/// Matching entries newest first, capped at `limit`, plus the unpaged count
pub fn query(
    conn: &Connection,
    query: &LogQuery,
    limit: u32,
) -> VaultResult<(Vec<TransactionLogEntry>, u64)> {
    let (where_clause, values) = filters(query);

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM transaction_log{}", where_clause),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{}{} ORDER BY timestamp DESC, id DESC LIMIT {}",
        SELECT_COLUMNS, where_clause, limit
    ))?;
    let entries = stmt
        .query_map(params_from_iter(values.iter()), row_to_entry)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok((entries, total.max(0) as u64))
}

/// Entries strictly after `after`, in replay order
pub fn entries_after(
    conn: &Connection,
    after: DateTime<Utc>,
) -> VaultResult<Vec<TransactionLogEntry>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE timestamp > ?1 ORDER BY timestamp ASC, id ASC",
        SELECT_COLUMNS
    ))?;
    let entries = stmt
        .query_map(params![format_timestamp(after)], row_to_entry)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

/// Remove entries with `timestamp` strictly before `cutoff`
pub fn delete_older_than(conn: &Connection, cutoff: DateTime<Utc>) -> VaultResult<usize> {
    Ok(conn.execute(
        "DELETE FROM transaction_log WHERE timestamp < ?1",
        params![format_timestamp(cutoff)],
    )?)
}

fn parse_snapshot(index: usize, text: Option<String>) -> rusqlite::Result<Option<Value>> {
    text.map(|t| serde_json::from_str(&t).map_err(|e| conversion_error(index, e)))
        .transpose()
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionLogEntry> {
    let timestamp: String = row.get(1)?;
    let operation: String = row.get(3)?;
    let table: String = row.get(4)?;

    Ok(TransactionLogEntry {
        id: LogEntryId::new(row.get(0)?),
        timestamp: parse_timestamp(&timestamp).map_err(|e| conversion_error(1, e))?,
        user_id: row.get(2)?,
        operation: operation.parse().map_err(|e| conversion_error(3, e))?,
        table: table.parse().map_err(|e| conversion_error(4, e))?,
        record_id: row.get(5)?,
        old_data: parse_snapshot(6, row.get(6)?)?,
        new_data: parse_snapshot(7, row.get(7)?)?,
        request_path: row.get(8)?,
    })
}
