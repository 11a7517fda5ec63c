use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use logincmd_core::write_json_document_atomic;

use crate::models::{Settings, SETTINGS_SCHEMA_VERSION};

pub fn default_settings_path() -> Result<PathBuf> {
    Ok(std::env::current_dir()
        .context("failed to resolve current working directory")?
        .join(".logincmd")
        .join("settings.json"))
}

/// File-backed settings document store.
///
/// Loading never fails on document corruption: a missing file yields the
/// default document, and an unparsable or wrong-schema file is replaced by
/// the default document with a diagnostic. I/O failures still propagate.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read settings {}", self.path.display()))?;
        match serde_json::from_str::<Settings>(&raw) {
            Ok(settings) if settings.schema_version == SETTINGS_SCHEMA_VERSION => Ok(settings),
            Ok(settings) => {
                tracing::warn!(
                    "unsupported settings schema_version {} in {}, starting from defaults",
                    settings.schema_version,
                    self.path.display()
                );
                Ok(Settings::default())
            }
            Err(error) => {
                tracing::warn!(
                    "settings parse failed, starting from defaults: path={} error={error}",
                    self.path.display()
                );
                Ok(Settings::default())
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        write_json_document_atomic(&self.path, settings)
            .with_context(|| format!("failed to write settings {}", self.path.display()))
    }
}
