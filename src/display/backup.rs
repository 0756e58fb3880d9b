//! Backup display formatting
//!
//! Formats backup records, backup outcomes and restore reports.

use chrono::{DateTime, Utc};

use super::{format_duration, format_size, truncate};
use crate::backup::{
    BackupOutcome, BackupPage, BackupRecord, BackupStatus, ReplayOutcome, RestoreReport,
    TableReport,
};

/// Format a page of backups as a table
pub fn format_backup_list(page: &BackupPage, now: DateTime<Utc>) -> String {
    if page.backups.is_empty() {
        return "No backups found.".to_string();
    }

    let id_width = page
        .backups
        .iter()
        .map(|b| b.backup_id.as_str().len())
        .max()
        .unwrap_or(9)
        .max(9);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<id_width$}  {:<9}  {:<11}  {:>10}  {:>8}  {:>8}  {}\n",
        "Backup ID",
        "Type",
        "Status",
        "Size",
        "Records",
        "Age",
        "Expires",
        id_width = id_width,
    ));
    output.push_str(&format!(
        "{:-<id_width$}  {:-<9}  {:-<11}  {:->10}  {:->8}  {:->8}  {:-<8}\n",
        "",
        "",
        "",
        "",
        "",
        "",
        "",
        id_width = id_width,
    ));

    for backup in &page.backups {
        let size = backup.size_bytes.map(format_size).unwrap_or_else(|| "-".into());
        let expires = if backup.is_expired_at(now) {
            "expired".to_string()
        } else {
            format_duration(now.signed_duration_since(backup.expires_at))
        };

        output.push_str(&format!(
            "{:<id_width$}  {:<9}  {:<11}  {:>10}  {:>8}  {:>8}  {}\n",
            backup.backup_id.as_str(),
            backup.backup_type.as_str(),
            backup.status.as_str(),
            size,
            backup.total_records(),
            format_duration(now.signed_duration_since(backup.created_at)),
            expires,
            id_width = id_width,
        ));
    }

    if page.total > page.backups.len() as u64 {
        output.push_str(&format!(
            "\nShowing {} of {} backup(s)\n",
            page.backups.len(),
            page.total
        ));
    } else {
        output.push_str(&format!("\nTotal: {} backup(s)\n", page.total));
    }

    output
}

/// Format a single backup's details
pub fn format_backup_details(backup: &BackupRecord, now: DateTime<Utc>) -> String {
    let mut output = String::new();

    output.push_str(&format!("Backup: {}\n", backup.backup_id));
    output.push_str(&format!("  ID:         {}\n", backup.id));
    output.push_str(&format!("  Type:       {}\n", backup.backup_type));
    output.push_str(&format!("  Status:     {}\n", backup.status));
    output.push_str(&format!(
        "  Created:    {} ({} ago)\n",
        backup.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        format_duration(now.signed_duration_since(backup.created_at))
    ));
    output.push_str(&format!(
        "  Expires:    {}\n",
        backup.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("  Location:   {}\n", backup.storage_path));
    if let Some(size) = backup.size_bytes {
        output.push_str(&format!("  Size:       {}\n", format_size(size)));
    }
    if let Some(error) = &backup.error_message {
        output.push_str(&format!("  Error:      {}\n", error));
    }

    if backup.status == BackupStatus::Completed {
        output.push_str("  Records:\n");
        for (table, count) in &backup.record_counts {
            output.push_str(&format!("    {:<24} {:>8}\n", table, count));
        }
    }

    output
}

fn push_table_reports(output: &mut String, heading: &str, reports: &[TableReport]) {
    output.push_str(&format!("{}\n", heading));
    for report in reports {
        let mut line = format!(
            "  {:<24} {:>8}  {}",
            report.table.name(),
            report.rows,
            report.outcome.label()
        );
        if let Some(reason) = report.outcome.reason() {
            line.push_str(&format!(" ({})", truncate(reason, 60)));
        }
        output.push_str(&line);
        output.push('\n');
    }
}

/// Format the result of `create_backup`
pub fn format_backup_outcome(outcome: &BackupOutcome) -> String {
    let record = &outcome.record;
    let mut output = format!("Backup created: {}\n", record.backup_id);
    output.push_str(&format!("Location: {}\n", record.storage_path));
    if let Some(size) = record.size_bytes {
        output.push_str(&format!("Size: {}\n", format_size(size)));
    }
    output.push('\n');
    push_table_reports(&mut output, "Tables:", &outcome.tables);

    if outcome.is_partial() {
        output.push_str("\nWARNING: some tables could not be exported and were stored empty.\n");
    }
    output
}

/// Format the result of `restore_backup`
pub fn format_restore_report(report: &RestoreReport) -> String {
    let mut output = format!("Restored backup {}\n", report.backup_id);
    output.push_str(&format!("  Tables restored:        {}\n", report.tables_restored));
    output.push_str(&format!(
        "  Transactions replayed:  {}\n",
        report.transactions_replayed
    ));
    if report.duplicates_ignored > 0 {
        output.push_str(&format!(
            "  Duplicate rows ignored: {}\n",
            report.duplicates_ignored
        ));
    }
    if report.rows_failed > 0 {
        output.push_str(&format!("  Rows not restored:      {}\n", report.rows_failed));
    }
    output.push('\n');

    push_table_reports(&mut output, "Truncated:", &report.truncations);
    push_table_reports(&mut output, "Inserted:", &report.tables);

    let failures: Vec<_> = report
        .replayed
        .iter()
        .filter_map(|r| match &r.outcome {
            ReplayOutcome::Failed { reason } => Some((r, reason)),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        output.push_str(&format!("\n{} replayed transaction(s) failed:\n", failures.len()));
        for (entry, reason) in failures {
            output.push_str(&format!(
                "  #{} {} {}:{} ({})\n",
                entry.entry_id,
                entry.operation,
                entry.table,
                entry.record_id,
                truncate(reason, 60)
            ));
        }
    }

    output
}
