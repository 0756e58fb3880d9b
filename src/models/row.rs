//! Schema-checked row snapshots
//!
//! Snapshots travel as JSON objects (in backups and in the transaction log),
//! but are always converted through the owning table's column list before they
//! touch the database.

use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Number, Value};

use super::table::{Column, ColumnKind, TrackedTable};
use crate::error::{VaultError, VaultResult};

/// One row of a tracked table, values in schema column order
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    table: TrackedTable,
    values: Vec<SqlValue>,
}

impl Row {
    /// Build a row from a JSON object snapshot
    ///
    /// Unknown keys are dropped, missing columns become NULL. The primary key
    /// must be present and non-null.
    pub fn from_json(table: TrackedTable, snapshot: &Value) -> VaultResult<Self> {
        let object = snapshot.as_object().ok_or_else(|| {
            VaultError::Validation(format!("{} snapshot must be a JSON object", table))
        })?;

        let schema = table.schema();
        for key in object.keys() {
            if schema.column(key).is_none() {
                tracing::debug!(table = %table, column = %key, "Dropping unknown snapshot column");
            }
        }

        let values = schema
            .columns
            .iter()
            .map(|column| json_to_sql(column, object.get(column.name)))
            .collect();

        let row = Self { table, values };
        if matches!(row.key(), SqlValue::Null) {
            return Err(VaultError::Validation(format!(
                "{} snapshot is missing primary key '{}'",
                table, schema.primary_key
            )));
        }
        Ok(row)
    }

    /// Read a row produced by one of the table's `SELECT` statements
    pub fn from_sql(table: TrackedTable, row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let values = (0..table.schema().columns.len())
            .map(|i| row.get::<_, SqlValue>(i))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Self { table, values })
    }

    pub fn table(&self) -> TrackedTable {
        self.table
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn key(&self) -> &SqlValue {
        &self.values[self.table.schema().key_index()]
    }

    /// Replace the primary key value
    pub fn with_key(mut self, key: SqlValue) -> Self {
        let index = self.table.schema().key_index();
        self.values[index] = key;
        self
    }

    /// Key rendered as the text stored in `transaction_log.record_id`
    pub fn key_string(&self) -> String {
        match self.key() {
            SqlValue::Integer(i) => i.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Real(f) => f.to_string(),
            SqlValue::Null => String::new(),
            SqlValue::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    /// Parameters for the table's `update` statement: key first, then the other columns
    pub fn update_params(&self) -> Vec<&SqlValue> {
        let key_index = self.table.schema().key_index();
        std::iter::once(&self.values[key_index])
            .chain(
                self.values
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != key_index)
                    .map(|(_, v)| v),
            )
            .collect()
    }

    /// JSON object keyed by column name
    pub fn to_json(&self) -> Value {
        let object: Map<String, Value> = self
            .table
            .schema()
            .columns
            .iter()
            .zip(&self.values)
            .map(|(column, value)| (column.name.to_string(), sql_to_json(column, value)))
            .collect();
        Value::Object(object)
    }
}

/// Typed conversion of one snapshot value
///
/// Values that do not fit the declared kind are kept as text, the way SQLite
/// keeps them in a column whose affinity cannot convert them.
fn json_to_sql(column: &Column, value: Option<&Value>) -> SqlValue {
    let value = match value {
        None | Some(Value::Null) => return SqlValue::Null,
        Some(v) => v,
    };

    match (column.kind, value) {
        (ColumnKind::Json, Value::String(s)) => SqlValue::Text(s.clone()),
        (ColumnKind::Json, other) => SqlValue::Text(other.to_string()),
        (ColumnKind::Integer | ColumnKind::Boolean, Value::Bool(b)) => {
            SqlValue::Integer(i64::from(*b))
        }
        (ColumnKind::Boolean, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => SqlValue::Integer(1),
            "false" => SqlValue::Integer(0),
            _ => numeric_text(s),
        },
        (ColumnKind::Integer | ColumnKind::Real | ColumnKind::Boolean, Value::Number(n)) => {
            number_to_sql(column.kind, n)
        }
        (ColumnKind::Integer | ColumnKind::Real, Value::String(s)) => numeric_text(s),
        (_, Value::String(s)) => SqlValue::Text(s.clone()),
        (_, other) => SqlValue::Text(other.to_string()),
    }
}

fn number_to_sql(kind: ColumnKind, n: &Number) -> SqlValue {
    match (kind, n.as_i64(), n.as_f64()) {
        (ColumnKind::Real, _, Some(f)) => SqlValue::Real(f),
        (_, Some(i), _) => SqlValue::Integer(i),
        (_, None, Some(f)) => SqlValue::Real(f),
        _ => SqlValue::Text(n.to_string()),
    }
}

/// Numeric text becomes a number, anything else stays text
fn numeric_text(s: &str) -> SqlValue {
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        SqlValue::Integer(i)
    } else if let Ok(f) = trimmed.parse::<f64>() {
        SqlValue::Real(f)
    } else {
        SqlValue::Text(s.to_string())
    }
}

fn sql_to_json(column: &Column, value: &SqlValue) -> Value {
    match (column.kind, value) {
        (_, SqlValue::Null) => Value::Null,
        (ColumnKind::Boolean, SqlValue::Integer(i @ (0 | 1))) => Value::Bool(*i == 1),
        (_, SqlValue::Integer(i)) => Value::Number((*i).into()),
        (_, SqlValue::Real(f)) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        // JSON text is embedded as a value; plain or string-literal text stays verbatim
        (ColumnKind::Json, SqlValue::Text(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::String(_)) | Err(_) => Value::String(s.clone()),
            Ok(parsed) => parsed,
        },
        (_, SqlValue::Text(s)) => Value::String(s.clone()),
        (_, SqlValue::Blob(b)) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}
