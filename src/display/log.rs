//! Transaction log display formatting

use super::truncate;
use crate::audit::{LogPage, UndoResult};

/// Format a page of log entries as a table, with field changes under updates
pub fn format_log_page(page: &LogPage) -> String {
    if page.entries.is_empty() {
        return "No transactions found.".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:>6}  {:<19}  {:<6}  {:<22}  {:<24}  {}\n",
        "ID", "Time (UTC)", "Op", "Table", "Record", "User"
    ));
    output.push_str(&format!(
        "{:->6}  {:-<19}  {:-<6}  {:-<22}  {:-<24}  {:-<10}\n",
        "", "", "", "", "", ""
    ));

    for entry in &page.entries {
        output.push_str(&format!(
            "{:>6}  {:<19}  {:<6}  {:<22}  {:<24}  {}\n",
            entry.id.value(),
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.operation.as_str(),
            entry.table.name(),
            truncate(&entry.record_id, 24),
            entry.user_id.as_deref().unwrap_or("-"),
        ));
        if let Some(diff) = entry.change_summary() {
            output.push_str(&format!("{:>8}{}\n", "", truncate(&diff, 100)));
        }
    }

    if page.total > page.entries.len() as u64 {
        output.push_str(&format!(
            "\nShowing {} of {} transaction(s)\n",
            page.entries.len(),
            page.total
        ));
    } else {
        output.push_str(&format!("\nTotal: {} transaction(s)\n", page.total));
    }

    output
}

pub fn format_undo_result(result: &UndoResult) -> String {
    let verb = if result.changed { "Undone" } else { "Nothing to undo" };
    format!(
        "{}: #{} {} {}:{}\n  {}\n",
        verb, result.entry_id, result.operation, result.table, result.record_id, result.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{Operation, TransactionLogEntry};
    use crate::models::{LogEntryId, TrackedTable};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn entry(id: i64, operation: Operation) -> TransactionLogEntry {
        TransactionLogEntry {
            id: LogEntryId::new(id),
            timestamp: Utc.with_ymd_and_hms(2026, 10, 16, 9, 15, 0).unwrap(),
            user_id: Some("u1".into()),
            operation,
            table: TrackedTable::Tasks,
            record_id: "t1".into(),
            old_data: Some(json!({"id": "t1", "lijst": "inbox"})),
            new_data: Some(json!({"id": "t1", "lijst": "vandaag"})),
            request_path: None,
        }
    }

    #[test]
    fn test_empty_page() {
        let page = LogPage {
            entries: vec![],
            total: 0,
        };
        assert_eq!(format_log_page(&page), "No transactions found.");
    }

    #[test]
    fn test_page_with_update_diff() {
        let page = LogPage {
            entries: vec![entry(12, Operation::Update)],
            total: 40,
        };
        let output = format_log_page(&page);
        assert!(output.contains("2026-10-16 09:15:00"));
        assert!(output.contains("UPDATE"));
        assert!(output.contains("taken"));
        assert!(output.contains("lijst"));
        assert!(output.contains("Showing 1 of 40 transaction(s)"));
    }

    #[test]
    fn test_undo_result() {
        let result = UndoResult {
            entry_id: LogEntryId::new(3),
            operation: Operation::Insert,
            table: TrackedTable::Tasks,
            record_id: "t1".into(),
            changed: false,
            message: "taken record t1 was already absent".into(),
        };
        let output = format_undo_result(&result);
        assert!(output.starts_with("Nothing to undo: #3 INSERT taken:t1"));
    }
}
