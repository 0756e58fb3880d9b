//! Versioned schema migrations
//!
//! Each migration runs exactly once and is recorded in `schema_migrations`.

use std::collections::HashSet;

use rusqlite::{params, Connection};

/// A database migration with a version number, name, and SQL to execute.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    /// May contain several statements
    pub sql: &'static str,
}

/// All migrations in order. New migrations go at the end.
pub const MIGRATIONS: &[Migration] = &[
    // Application tables covered by backups
    Migration {
        version: 1,
        name: "create_users_table",
        sql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT,
                naam TEXT,
                rol TEXT,
                actief INTEGER,
                aangemaakt TEXT
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_projecten_and_contexten_tables",
        sql: r#"
            CREATE TABLE IF NOT EXISTS projecten (
                id TEXT PRIMARY KEY,
                naam TEXT,
                user_id TEXT,
                aangemaakt TEXT
            );
            CREATE TABLE IF NOT EXISTS contexten (
                id TEXT PRIMARY KEY,
                naam TEXT,
                user_id TEXT,
                aangemaakt TEXT
            );
        "#,
    },
    Migration {
        version: 3,
        name: "create_taken_and_subtaken_tables",
        sql: r#"
            CREATE TABLE IF NOT EXISTS taken (
                id TEXT PRIMARY KEY,
                tekst TEXT,
                aangemaakt TEXT,
                lijst TEXT,
                project_id TEXT,
                verschijndatum TEXT,
                context_id TEXT,
                duur INTEGER,
                type TEXT,
                afgewerkt TEXT,
                herhaling_type TEXT,
                herhaling_waarde INTEGER,
                herhaling_actief INTEGER,
                opmerkingen TEXT,
                user_id TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_taken_user ON taken(user_id);
            CREATE TABLE IF NOT EXISTS subtaken (
                id INTEGER PRIMARY KEY,
                parent_taak_id TEXT,
                titel TEXT,
                voltooid INTEGER,
                volgorde INTEGER,
                created_at TEXT
            );
        "#,
    },
    Migration {
        version: 4,
        name: "create_dagelijkse_planning_table",
        sql: r#"
            CREATE TABLE IF NOT EXISTS dagelijkse_planning (
                id INTEGER PRIMARY KEY,
                actie_id TEXT,
                datum TEXT,
                uur INTEGER,
                duur_minuten INTEGER,
                type TEXT,
                naam TEXT,
                positie INTEGER,
                user_id TEXT,
                aangemaakt TEXT
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_bijlagen_preferences_feedback_tables",
        sql: r#"
            CREATE TABLE IF NOT EXISTS bijlagen (
                id TEXT PRIMARY KEY,
                taak_id TEXT,
                bestandsnaam TEXT,
                bestandsgrootte INTEGER,
                mimetype TEXT,
                storage_type TEXT,
                storage_path TEXT,
                user_id TEXT,
                geupload TEXT
            );
            CREATE TABLE IF NOT EXISTS mind_dump_preferences (
                user_id TEXT PRIMARY KEY,
                preferences TEXT,
                updated_at TEXT
            );
            CREATE TABLE IF NOT EXISTS feedback (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                type TEXT,
                titel TEXT,
                beschrijving TEXT,
                status TEXT,
                context TEXT,
                aangemaakt TEXT
            );
        "#,
    },
    // Backup bookkeeping and audit log
    Migration {
        version: 6,
        name: "create_backup_metadata_table",
        sql: r#"
            CREATE TABLE IF NOT EXISTS backup_metadata (
                id TEXT PRIMARY KEY,
                backup_id TEXT NOT NULL UNIQUE,
                backup_type TEXT NOT NULL DEFAULT 'scheduled',
                storage_path TEXT NOT NULL,
                status TEXT NOT NULL
                    CHECK (status IN ('in_progress', 'completed', 'failed')),
                size_bytes INTEGER,
                record_counts TEXT NOT NULL DEFAULT '{}',
                expires_at TEXT NOT NULL,
                error_message TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_backup_metadata_created ON backup_metadata(created_at);
            CREATE INDEX IF NOT EXISTS idx_backup_metadata_expires ON backup_metadata(expires_at);
        "#,
    },
    Migration {
        version: 7,
        name: "create_transaction_log_table",
        sql: r#"
            CREATE TABLE IF NOT EXISTS transaction_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                user_id TEXT,
                operation TEXT NOT NULL
                    CHECK (operation IN ('INSERT', 'UPDATE', 'DELETE')),
                table_name TEXT NOT NULL,
                record_id TEXT NOT NULL,
                old_data TEXT,
                new_data TEXT,
                request_path TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_transaction_log_timestamp ON transaction_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_transaction_log_record
                ON transaction_log(table_name, record_id);
            CREATE INDEX IF NOT EXISTS idx_transaction_log_user ON transaction_log(user_id);
        "#,
    },
];

fn ensure_migrations_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );
        "#,
    )
}

fn get_applied_versions(conn: &Connection) -> rusqlite::Result<HashSet<i64>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<HashSet<i64>>>()?;
    Ok(versions)
}

/// Apply every pending migration, each in its own transaction
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    ensure_migrations_table(conn)?;
    let applied = get_applied_versions(conn)?;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let now = chrono::Utc::now().to_rfc3339();
        let tx = conn.transaction()?;
        let result = tx.execute_batch(migration.sql).and_then(|_| {
            tx.execute(
                "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, now],
            )
        });
        if let Err(e) = result.and_then(|_| tx.commit()) {
            tracing::error!(
                version = migration.version,
                name = migration.name,
                error = %e,
                "Migration failed"
            );
            return Err(e);
        }

        tracing::debug!(version = migration.version, "Migration applied");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackedTable;

    #[test]
    fn test_migrations_are_ordered() {
        let mut last_version = 0;
        for migration in MIGRATIONS {
            assert!(
                migration.version > last_version,
                "Migrations must be in ascending order: {} should come after {}",
                migration.version,
                last_version
            );
            last_version = migration.version;
        }
    }

    #[test]
    fn test_fresh_database_migrations() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        let applied = get_applied_versions(&conn).unwrap();
        assert_eq!(applied.len(), MIGRATIONS.len());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count as usize, MIGRATIONS.len());
    }

    #[test]
    fn test_tracked_table_statements_prepare() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        for table in TrackedTable::ALL {
            let statements = table.statements();
            for sql in [
                &statements.select_all,
                &statements.select_one,
                &statements.insert,
                &statements.insert_or_ignore,
                &statements.update,
                &statements.delete,
                &statements.clear,
                &statements.count,
            ] {
                conn.prepare(sql)
                    .unwrap_or_else(|e| panic!("{}: {} ({})", table, sql, e));
            }
        }
    }
}
