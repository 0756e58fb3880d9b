//! Configuration module for taskvault
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - Settings persistence (retention windows, object-store placement)

pub mod paths;
pub mod settings;

pub use paths::VaultPaths;
pub use settings::{BackupSettings, Settings, TransactionLogSettings};
