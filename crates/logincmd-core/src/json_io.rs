use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::time_utils::unix_now_seconds;

/// Serializes `document` as pretty JSON with a trailing newline and writes it
/// through a temp file + rename so readers never observe partial data.
pub fn write_json_document_atomic<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("destination path cannot be empty");
    }
    if path.exists() && path.is_dir() {
        bail!("destination path '{}' is a directory", path.display());
    }

    let mut payload =
        serde_json::to_string_pretty(document).context("failed to serialize JSON document")?;
    payload.push('\n');

    let parent_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("failed to create {}", parent_dir.display()))?;

    let temp_name = format!(
        ".{}.tmp-{}-{}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document"),
        std::process::id(),
        unix_now_seconds()
    );
    let temp_path = parent_dir.join(temp_name);
    std::fs::write(&temp_path, payload)
        .with_context(|| format!("failed to write temporary file {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}

/// Appends one compact JSON record plus newline to a JSONL journal file.
pub fn append_jsonl_line<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let line = serde_json::to_string(record).context("failed to serialize JSONL record")?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writeln!(file, "{line}").with_context(|| format!("failed to append {}", path.display()))?;
    file.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}
