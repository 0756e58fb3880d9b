use anyhow::Result;
use clap::{Parser, Subcommand};

use taskvault::cli::{handle_backup_command, handle_log_command, BackupCommands, LogCommands};
use taskvault::config::{Settings, VaultPaths};

#[derive(Parser)]
#[command(
    name = "taskvault",
    version,
    about = "Point-in-time backups and transaction-log replay for the task database",
    long_about = "taskvault snapshots the task database into compressed backups and \
                  audits every change to the task tables. Restoring a backup uses \
                  transaction-log replay to bring back the changes logged after it."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, settings file and database
    Init,

    /// Show current configuration and paths
    Config,

    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Transaction log commands
    #[command(subcommand, alias = "txlog")]
    Log(LogCommands),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = VaultPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing taskvault at: {}", paths.base_dir().display());
            settings.save(&paths)?;
            taskvault::storage::initialize(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Database:     {}", paths.database_file().display());
            println!("Object store: {}", paths.object_store_dir().display());
            println!();
            println!("Run 'taskvault backup create' to take the first backup.");
        }
        Some(Commands::Config) => {
            println!("taskvault Configuration");
            println!("=======================");
            println!("Data directory: {}", paths.base_dir().display());
            println!("Settings file:  {}", paths.settings_file().display());
            println!("Database:       {}", paths.database_file().display());
            println!("Object store:   {}", paths.object_store_dir().display());
            println!("Initialized:    {}", paths.is_initialized());
            println!();
            println!("Backups:");
            println!("  Bucket:          {}", settings.backup.bucket);
            println!("  Folder:          {}", settings.backup.folder);
            println!("  Retention:       {} hours", settings.backup.retention_hours);
            println!("  List limit:      {}", settings.backup.list_limit);
            println!("Transaction log:");
            println!(
                "  Retention:       {} hours",
                settings.transaction_log.retention_hours
            );
            println!("  Query limit:     {}", settings.transaction_log.query_limit);
        }
        Some(Commands::Backup(cmd)) => {
            let db = taskvault::storage::initialize(&paths)?;
            handle_backup_command(&paths, &settings, &db, cmd)?;
        }
        Some(Commands::Log(cmd)) => {
            let db = taskvault::storage::initialize(&paths)?;
            handle_log_command(&settings, &db, cmd)?;
        }
        None => {
            println!("taskvault - backups and transaction-log replay for the task database");
            println!();
            println!("Run 'taskvault --help' for usage information.");
            println!("Run 'taskvault init' to get started.");
        }
    }

    Ok(())
}
