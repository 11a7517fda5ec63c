use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const SETTINGS_SCHEMA_VERSION: u32 = 1;

fn settings_schema_version() -> u32 {
    SETTINGS_SCHEMA_VERSION
}

fn default_enabled() -> bool {
    true
}

fn default_profile_label() -> String {
    "New Profile".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Enumerates supported `RunMode` values.
pub enum RunMode {
    EveryLogin,
    OncePerSession,
}

impl RunMode {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "EveryLogin" => Some(Self::EveryLogin),
            "OncePerSession" => Some(Self::OncePerSession),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EveryLogin => "EveryLogin",
            Self::OncePerSession => "OncePerSession",
        }
    }
}

impl Default for RunMode {
    fn default() -> Self {
        Self::EveryLogin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Enumerates supported `CommandStatus` values.
pub enum CommandStatus {
    Pending,
    Sent,
    Skipped,
    Error,
}

impl CommandStatus {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Sent" => Some(Self::Sent),
            "Skipped" => Some(Self::Skipped),
            "Error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Sent => "Sent",
            Self::Skipped => "Skipped",
            Self::Error => "Error",
        }
    }
}

impl Default for CommandStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// A single configured text command with its replay policy.
pub struct CommandEntry {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub command_text: String,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default, deserialize_with = "run_mode_or_default")]
    pub run_mode: RunMode,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for CommandEntry {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            command_text: String::new(),
            delay_ms: 0,
            run_mode: RunMode::EveryLogin,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Per-identity configuration bundle of commands.
pub struct Profile {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default = "default_profile_label")]
    pub label: String,
    #[serde(default)]
    pub character_name: String,
    #[serde(default)]
    pub world_id: u16,
    #[serde(default)]
    pub world_name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "seq_skip_null")]
    pub commands: Vec<CommandEntry>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            label: default_profile_label(),
            character_name: String::new(),
            world_id: 0,
            world_name: String::new(),
            enabled: true,
            commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Durable record of one attempted command execution.
pub struct LogEntry {
    #[serde(default)]
    pub timestamp_unix_ms: u64,
    #[serde(default)]
    pub character_key: String,
    #[serde(default)]
    pub command_text: String,
    #[serde(default, deserialize_with = "status_or_error")]
    pub status: CommandStatus,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// The persisted configuration document.
pub struct Settings {
    #[serde(default = "settings_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub log_output_enabled: bool,
    #[serde(default, deserialize_with = "seq_skip_null")]
    pub profiles: Vec<Profile>,
    #[serde(default, deserialize_with = "seq_skip_null")]
    pub global_commands: Vec<CommandEntry>,
    #[serde(default, deserialize_with = "seq_skip_null")]
    pub logs: Vec<LogEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            log_output_enabled: false,
            profiles: Vec::new(),
            global_commands: Vec::new(),
            logs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Import/export wire shape: profiles plus global commands, nothing else.
pub struct TransferPayload {
    #[serde(default, deserialize_with = "seq_skip_null")]
    pub profiles: Vec<Profile>,
    #[serde(default, deserialize_with = "seq_skip_null")]
    pub global_commands: Vec<CommandEntry>,
}

// Boundary decoders: persisted documents may carry values written by older or
// foreign builds. Unknown enum strings collapse to a safe default and null
// list elements are dropped here, so the closed enum types never hold an
// out-of-set value.

fn run_mode_or_default<'de, D>(deserializer: D) -> Result<RunMode, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .and_then(RunMode::from_wire)
        .unwrap_or_default())
}

fn status_or_error<'de, D>(deserializer: D) -> Result<CommandStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .and_then(CommandStatus::from_wire)
        .unwrap_or(CommandStatus::Error))
}

fn seq_skip_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw = Option::<Vec<Option<T>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.into_iter().flatten().collect())
}
