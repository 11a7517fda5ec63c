//! Persisted configuration model for logincmd.
//!
//! Defines the settings document (profiles, command entries, execution
//! journal), the sanitizer that repairs persisted data before the scheduler
//! trusts it, the file-backed settings store, and the import/export transfer
//! payload.

pub mod models;
pub mod sanitize;
pub mod store;
pub mod transfer;

pub use models::{
    CommandEntry, CommandStatus, LogEntry, Profile, RunMode, Settings, TransferPayload,
    SETTINGS_SCHEMA_VERSION,
};
pub use sanitize::{
    sanitize_commands, sanitize_logs, sanitize_profiles, sanitize_settings, sanitize_transfer,
    TransferCounts, LOG_RETENTION_MAX, MAX_DELAY_MS,
};
pub use store::{default_settings_path, SettingsStore};
pub use transfer::{apply_transfer, export_transfer, import_transfer};
