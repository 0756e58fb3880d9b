//! Backup CLI commands
//!
//! Implements CLI commands for creating, inspecting, restoring and expiring
//! backups held in the local object store.

use clap::Subcommand;
use std::path::PathBuf;
use std::sync::Arc;

use crate::backup::{BackupManager, BackupStatus, BackupType, ListOptions};
use crate::config::{Settings, VaultPaths};
use crate::display::{
    format_backup_details, format_backup_list, format_backup_outcome, format_restore_report,
};
use crate::error::VaultResult;
use crate::object_store::FsObjectStore;
use crate::storage::{write_bytes_atomic, Database};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup of every tracked table
    Create {
        /// What triggered the backup (scheduled or manual)
        #[arg(short = 't', long = "type", default_value = "manual")]
        backup_type: BackupType,
    },

    /// List backups, newest first
    List {
        /// Maximum number of backups to show
        #[arg(short, long)]
        limit: Option<u32>,

        /// Only show backups with this status (in_progress, completed, failed)
        #[arg(short, long)]
        status: Option<BackupStatus>,
    },

    /// Show details of one backup
    Show {
        /// Backup id or internal key
        backup: String,
    },

    /// Save the compressed backup blob to a local file
    Download {
        /// Backup id or internal key
        backup: String,

        /// Output path (defaults to `<backup-id>.json.gz` in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore the tracked tables from a backup
    Restore {
        /// Backup id or internal key
        backup: String,

        /// Do not replay transaction log entries recorded after the backup
        #[arg(long)]
        no_replay: bool,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete backups past their expiry
    Cleanup,
}

/// Build the backup manager for the configured object store
pub fn backup_manager(
    paths: &VaultPaths,
    settings: &Settings,
    db: &Database,
) -> VaultResult<BackupManager> {
    let store = FsObjectStore::open(paths.object_store_dir(), settings.backup.bucket.as_str())?;
    Ok(BackupManager::new(
        db.clone(),
        Arc::new(store),
        settings.backup.clone(),
    ))
}

/// Handle a backup command
pub fn handle_backup_command(
    paths: &VaultPaths,
    settings: &Settings,
    db: &Database,
    cmd: BackupCommands,
) -> VaultResult<()> {
    let manager = backup_manager(paths, settings, db)?;

    match cmd {
        BackupCommands::Create { backup_type } => {
            println!("Creating backup...");
            let outcome = manager.create_backup(backup_type)?;
            print!("{}", format_backup_outcome(&outcome));
        }

        BackupCommands::List { limit, status } => {
            let page = manager.list_backups(&ListOptions { limit, status })?;
            if page.backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: taskvault backup create");
                return Ok(());
            }
            print!("{}", format_backup_list(&page, chrono::Utc::now()));
        }

        BackupCommands::Show { backup } => {
            let record = manager.get_backup(&backup)?;
            print!("{}", format_backup_details(&record, chrono::Utc::now()));
        }

        BackupCommands::Download { backup, output } => {
            let record = manager.get_backup(&backup)?;
            let data = manager.download_backup(record.id.as_str())?;
            let target = output
                .unwrap_or_else(|| PathBuf::from(format!("{}.json.gz", record.backup_id)));
            write_bytes_atomic(&target, &data)?;
            println!("Downloaded {} to {}", record.backup_id, target.display());
        }

        BackupCommands::Restore {
            backup,
            no_replay,
            force,
        } => {
            let record = manager.get_backup(&backup)?;
            print!("{}", format_backup_details(&record, chrono::Utc::now()));
            println!();

            if !force {
                println!("WARNING: This will replace all task data except user accounts!");
                if !no_replay {
                    println!(
                        "Transactions logged after {} will be replayed on top.",
                        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
                println!("To proceed, run again with --force flag:");
                println!("  taskvault backup restore {} --force", backup);
                return Ok(());
            }

            println!("Restoring...");
            let report = manager.restore_backup(record.id.as_str(), !no_replay)?;
            print!("{}", format_restore_report(&report));
        }

        BackupCommands::Cleanup => {
            let deleted = manager.cleanup_expired()?;
            if deleted == 0 {
                println!("No expired backups.");
            } else {
                println!("Deleted {} expired backup(s).", deleted);
            }
        }
    }

    Ok(())
}
