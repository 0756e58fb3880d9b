//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup manager and
//! the transaction logger.

pub mod backup;
pub mod log;

pub use backup::{backup_manager, handle_backup_command, BackupCommands};
pub use log::{handle_log_command, parse_time_arg, LogCommands};
