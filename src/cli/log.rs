//! Transaction log CLI commands
//!
//! Implements CLI commands for browsing, undoing and purging logged mutations.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Subcommand;

use crate::audit::{LogQuery, Operation, TransactionLogger};
use crate::config::Settings;
use crate::display::{format_log_page, format_undo_result};
use crate::error::{VaultError, VaultResult};
use crate::models::{LogEntryId, TrackedTable};
use crate::storage::Database;

/// Transaction log subcommands
#[derive(Subcommand)]
pub enum LogCommands {
    /// List logged transactions, newest first
    List {
        /// Only entries at or after this time (RFC 3339, YYYY-MM-DD, or 30m/12h/7d ago)
        #[arg(short, long)]
        since: Option<String>,

        /// Only entries at or before this time
        #[arg(short, long)]
        until: Option<String>,

        /// Only entries made by this user
        #[arg(long)]
        user: Option<String>,

        /// Only entries for this table
        #[arg(short, long)]
        table: Option<TrackedTable>,

        /// Only entries of this operation (INSERT, UPDATE, DELETE)
        #[arg(short, long)]
        operation: Option<Operation>,

        /// Maximum number of entries to show
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Undo one logged transaction
    Undo {
        /// Entry id, as shown by `log list`
        entry: LogEntryId,
    },

    /// Delete entries past the retention window
    Cleanup,
}

/// Handle a transaction log command
pub fn handle_log_command(settings: &Settings, db: &Database, cmd: LogCommands) -> VaultResult<()> {
    let logger = TransactionLogger::new(db.clone(), settings.transaction_log.clone());

    match cmd {
        LogCommands::List {
            since,
            until,
            user,
            table,
            operation,
            limit,
        } => {
            let now = Utc::now();
            let query = LogQuery {
                since: since.as_deref().map(|s| parse_time_arg(s, now)).transpose()?,
                until: until.as_deref().map(|s| parse_time_arg(s, now)).transpose()?,
                user_id: user,
                table,
                operation,
                limit,
            };

            let page = logger.get_log_since(&query)?;
            print!("{}", format_log_page(&page));
            if page.entries.is_empty() {
                println!();
            }
        }

        LogCommands::Undo { entry } => {
            let result = logger.undo_operation(entry)?;
            print!("{}", format_undo_result(&result));
        }

        LogCommands::Cleanup => {
            let removed = logger.cleanup()?;
            println!(
                "Removed {} transaction(s) older than {} hours.",
                removed, settings.transaction_log.retention_hours
            );
        }
    }

    Ok(())
}

/// Parse a time filter: RFC 3339, a calendar date (midnight UTC), or a
/// relative `<n>m`, `<n>h` or `<n>d` meaning that long before `now`
pub fn parse_time_arg(input: &str, now: DateTime<Utc>) -> VaultResult<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    let invalid = || {
        VaultError::Validation(format!(
            "Invalid time '{}': expected RFC 3339, YYYY-MM-DD, or a relative value like 12h",
            input
        ))
    };

    if input.len() < 2 || !input.is_char_boundary(input.len() - 1) {
        return Err(invalid());
    }
    let (amount, unit) = input.split_at(input.len() - 1);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;
    if amount < 0 {
        return Err(invalid());
    }

    let span = match unit {
        "m" => Duration::minutes(amount),
        "h" => Duration::hours(amount),
        "d" => Duration::days(amount),
        _ => return Err(invalid()),
    };
    Ok(now - span)
}
