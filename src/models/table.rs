//! Tracked tables and their static schemas
//!
//! Every table the engine exports, restores, logs or undoes is a member of the
//! closed [`TrackedTable`] enum. Statement text is derived once per table from
//! the static column list, so no caller-provided string ever reaches SQL.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Storage class of a column, used to convert between JSON snapshots and SQL values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    /// Stored as 0/1, exported as a JSON bool
    Boolean,
    /// RFC 3339 / ISO-8601 text
    Timestamp,
    /// Stored as JSON text, exported as a nested JSON value
    Json,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Text => "text",
            ColumnKind::Integer => "integer",
            ColumnKind::Real => "real",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Timestamp => "timestamp",
            ColumnKind::Json => "json",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

/// Static description of one tracked table
#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    /// Position of the primary-key column within `columns`
    pub fn key_index(&self) -> usize {
        self.columns
            .iter()
            .position(|c| c.name == self.primary_key)
            .unwrap_or(0)
    }

    pub fn key_column(&self) -> &Column {
        &self.columns[self.key_index()]
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

use ColumnKind::*;

const USERS: TableSchema = TableSchema {
    name: "users",
    primary_key: "id",
    columns: &[
        col("id", Text),
        col("email", Text),
        col("naam", Text),
        col("rol", Text),
        col("actief", Boolean),
        col("aangemaakt", Timestamp),
    ],
};

const PROJECTS: TableSchema = TableSchema {
    name: "projecten",
    primary_key: "id",
    columns: &[
        col("id", Text),
        col("naam", Text),
        col("user_id", Text),
        col("aangemaakt", Timestamp),
    ],
};

const CONTEXTS: TableSchema = TableSchema {
    name: "contexten",
    primary_key: "id",
    columns: &[
        col("id", Text),
        col("naam", Text),
        col("user_id", Text),
        col("aangemaakt", Timestamp),
    ],
};

const TASKS: TableSchema = TableSchema {
    name: "taken",
    primary_key: "id",
    columns: &[
        col("id", Text),
        col("tekst", Text),
        col("aangemaakt", Timestamp),
        col("lijst", Text),
        col("project_id", Text),
        col("verschijndatum", Text),
        col("context_id", Text),
        col("duur", Integer),
        col("type", Text),
        col("afgewerkt", Timestamp),
        col("herhaling_type", Text),
        col("herhaling_waarde", Integer),
        col("herhaling_actief", Boolean),
        col("opmerkingen", Text),
        col("user_id", Text),
    ],
};

const SUBTASKS: TableSchema = TableSchema {
    name: "subtaken",
    primary_key: "id",
    columns: &[
        col("id", Integer),
        col("parent_taak_id", Text),
        col("titel", Text),
        col("voltooid", Boolean),
        col("volgorde", Integer),
        col("created_at", Timestamp),
    ],
};

const DAILY_PLANNING: TableSchema = TableSchema {
    name: "dagelijkse_planning",
    primary_key: "id",
    columns: &[
        col("id", Integer),
        col("actie_id", Text),
        col("datum", Text),
        col("uur", Integer),
        col("duur_minuten", Integer),
        col("type", Text),
        col("naam", Text),
        col("positie", Integer),
        col("user_id", Text),
        col("aangemaakt", Timestamp),
    ],
};

const ATTACHMENTS: TableSchema = TableSchema {
    name: "bijlagen",
    primary_key: "id",
    columns: &[
        col("id", Text),
        col("taak_id", Text),
        col("bestandsnaam", Text),
        col("bestandsgrootte", Integer),
        col("mimetype", Text),
        col("storage_type", Text),
        col("storage_path", Text),
        col("user_id", Text),
        col("geupload", Timestamp),
    ],
};

const MIND_DUMP_PREFERENCES: TableSchema = TableSchema {
    name: "mind_dump_preferences",
    primary_key: "user_id",
    columns: &[
        col("user_id", Text),
        col("preferences", Json),
        col("updated_at", Timestamp),
    ],
};

const FEEDBACK: TableSchema = TableSchema {
    name: "feedback",
    primary_key: "id",
    columns: &[
        col("id", Text),
        col("user_id", Text),
        col("type", Text),
        col("titel", Text),
        col("beschrijving", Text),
        col("status", Text),
        col("context", Json),
        col("aangemaakt", Timestamp),
    ],
};

/// A table included in backups (and, for a subset, in the transaction log)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrackedTable {
    #[serde(rename = "users")]
    Users,
    #[serde(rename = "projecten")]
    Projects,
    #[serde(rename = "contexten")]
    Contexts,
    #[serde(rename = "taken")]
    Tasks,
    #[serde(rename = "subtaken")]
    Subtasks,
    #[serde(rename = "dagelijkse_planning")]
    DailyPlanning,
    #[serde(rename = "bijlagen")]
    Attachments,
    #[serde(rename = "mind_dump_preferences")]
    MindDumpPreferences,
    #[serde(rename = "feedback")]
    Feedback,
}

impl TrackedTable {
    /// Export order. Restore truncates in the reverse of this order.
    pub const ALL: [TrackedTable; 9] = [
        TrackedTable::Users,
        TrackedTable::Projects,
        TrackedTable::Contexts,
        TrackedTable::Tasks,
        TrackedTable::Subtasks,
        TrackedTable::DailyPlanning,
        TrackedTable::Attachments,
        TrackedTable::MindDumpPreferences,
        TrackedTable::Feedback,
    ];

    /// Tables whose mutations are recorded in the transaction log
    pub const AUDITED: [TrackedTable; 5] = [
        TrackedTable::Tasks,
        TrackedTable::Projects,
        TrackedTable::Contexts,
        TrackedTable::DailyPlanning,
        TrackedTable::Subtasks,
    ];

    pub fn schema(self) -> &'static TableSchema {
        match self {
            TrackedTable::Users => &USERS,
            TrackedTable::Projects => &PROJECTS,
            TrackedTable::Contexts => &CONTEXTS,
            TrackedTable::Tasks => &TASKS,
            TrackedTable::Subtasks => &SUBTASKS,
            TrackedTable::DailyPlanning => &DAILY_PLANNING,
            TrackedTable::Attachments => &ATTACHMENTS,
            TrackedTable::MindDumpPreferences => &MIND_DUMP_PREFERENCES,
            TrackedTable::Feedback => &FEEDBACK,
        }
    }

    pub fn name(self) -> &'static str {
        self.schema().name
    }

    /// The identity table is never truncated or overwritten by a restore
    pub fn is_identity(self) -> bool {
        self == TrackedTable::Users
    }

    /// Whether the transaction logger accepts entries for this table
    pub fn is_audited(self) -> bool {
        Self::AUDITED.contains(&self)
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    /// Cached statement text for this table
    pub fn statements(self) -> &'static TableStatements {
        static STATEMENTS: OnceLock<Vec<TableStatements>> = OnceLock::new();
        let all = STATEMENTS.get_or_init(|| {
            Self::ALL
                .iter()
                .map(|t| TableStatements::build(t.schema()))
                .collect()
        });
        &all[self.index()]
    }

    /// Convert a log entry's textual record id into a key value of the right type
    pub fn key_value(self, record_id: &str) -> VaultResult<SqlValue> {
        let key = self.schema().key_column();
        match key.kind {
            ColumnKind::Integer => record_id.trim().parse::<i64>().map(SqlValue::Integer).map_err(
                |_| {
                    VaultError::Validation(format!(
                        "{}.{} expects an integer key, got '{}'",
                        self, key.name, record_id
                    ))
                },
            ),
            _ => Ok(SqlValue::Text(record_id.to_string())),
        }
    }
}

impl fmt::Display for TrackedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrackedTable {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| VaultError::Validation(format!("Table {} is not tracked", s)))
    }
}

/// Statement text for one table, built from its static schema
#[derive(Debug)]
pub struct TableStatements {
    pub select_all: String,
    pub select_one: String,
    pub insert: String,
    pub insert_or_ignore: String,
    /// `?1` is the key, `?2..` the non-key columns in schema order
    pub update: String,
    pub delete: String,
    pub clear: String,
    pub count: String,
}

impl TableStatements {
    fn build(schema: &TableSchema) -> Self {
        let columns: Vec<&str> = schema.columns.iter().map(|c| c.name).collect();
        let column_list = columns.join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let assignments = columns
            .iter()
            .filter(|c| **c != schema.primary_key)
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", c, i + 2))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            select_all: format!(
                "SELECT {} FROM {} ORDER BY {}",
                column_list, schema.name, schema.primary_key
            ),
            select_one: format!(
                "SELECT {} FROM {} WHERE {} = ?1",
                column_list, schema.name, schema.primary_key
            ),
            insert: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                schema.name, column_list, placeholders
            ),
            insert_or_ignore: format!(
                "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
                schema.name, column_list, placeholders
            ),
            update: format!(
                "UPDATE {} SET {} WHERE {} = ?1",
                schema.name, assignments, schema.primary_key
            ),
            delete: format!("DELETE FROM {} WHERE {} = ?1", schema.name, schema.primary_key),
            clear: format!("DELETE FROM {}", schema.name),
            count: format!("SELECT COUNT(*) FROM {}", schema.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_round_trip() {
        for table in TrackedTable::ALL {
            assert_eq!(table.name().parse::<TrackedTable>().unwrap(), table);
        }
    }

    #[test]
    fn test_untracked_table_rejected() {
        let err = "sessions".parse::<TrackedTable>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_audited_subset() {
        assert!(TrackedTable::Tasks.is_audited());
        assert!(TrackedTable::Subtasks.is_audited());
        assert!(!TrackedTable::Users.is_audited());
        assert!(!TrackedTable::Feedback.is_audited());
        for table in TrackedTable::AUDITED {
            assert!(TrackedTable::ALL.contains(&table));
        }
    }

    #[test]
    fn test_only_users_is_identity() {
        let identity: Vec<_> = TrackedTable::ALL
            .iter()
            .filter(|t| t.is_identity())
            .collect();
        assert_eq!(identity, vec![&TrackedTable::Users]);
    }

    #[test]
    fn test_every_schema_contains_its_key() {
        for table in TrackedTable::ALL {
            let schema = table.schema();
            assert!(
                schema.column(schema.primary_key).is_some(),
                "{} lacks key column",
                table
            );
        }
    }

    #[test]
    fn test_update_statement_skips_key() {
        let sql = &TrackedTable::Projects.statements().update;
        assert_eq!(
            sql,
            "UPDATE projecten SET naam = ?2, user_id = ?3, aangemaakt = ?4 WHERE id = ?1"
        );
    }

    #[test]
    fn test_insert_or_ignore_statement() {
        let sql = &TrackedTable::MindDumpPreferences.statements().insert_or_ignore;
        assert_eq!(
            sql,
            "INSERT OR IGNORE INTO mind_dump_preferences (user_id, preferences, updated_at) VALUES (?1, ?2, ?3)"
        );
    }

    #[test]
    fn test_key_value_respects_kind() {
        assert_eq!(
            TrackedTable::Subtasks.key_value("17").unwrap(),
            SqlValue::Integer(17)
        );
        assert_eq!(
            TrackedTable::Tasks.key_value("t1").unwrap(),
            SqlValue::Text("t1".into())
        );
        assert!(TrackedTable::Subtasks.key_value("abc").is_err());
    }

    #[test]
    fn test_serde_uses_table_name() {
        let json = serde_json::to_string(&TrackedTable::DailyPlanning).unwrap();
        assert_eq!(json, "\"dagelijkse_planning\"");
    }
}
