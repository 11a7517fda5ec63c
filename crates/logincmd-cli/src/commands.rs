use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use logincmd_config::{
    apply_transfer, export_transfer, import_transfer, sanitize_settings, Settings, SettingsStore,
};
use logincmd_core::unix_now_ms;
use logincmd_scheduler::{build_plan, find_profile_index, Identity};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct InspectProfileRow {
    label: String,
    character_name: String,
    world: String,
    enabled: bool,
    commands: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct InspectReport {
    settings_path: String,
    profiles: usize,
    global_commands: usize,
    journal_entries: usize,
    log_output_enabled: bool,
    rows: Vec<InspectProfileRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct PlanRow {
    sequence_index: usize,
    status: String,
    offset_ms: u64,
    name: String,
    command_text: String,
    message: String,
}

/// Print a one-line posture report plus per-profile rows.
pub fn execute_inspect(settings_path: &Path, json: bool) -> Result<()> {
    let settings = SettingsStore::new(settings_path.to_path_buf()).load()?;
    let report = build_inspect_report(&settings, settings_path);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to render inspect json")?
        );
    } else {
        println!("{}", render_inspect_report(&report));
    }
    Ok(())
}

/// Run the sanitizer and report whether the stored document needed repair.
pub fn execute_validate(settings_path: &Path, write: bool) -> Result<()> {
    let store = SettingsStore::new(settings_path.to_path_buf());
    let mut settings = store.load()?;
    let repaired = sanitize_settings(&mut settings);

    println!(
        "validate: path={} profiles={} global_commands={} journal_entries={} repaired={}",
        settings_path.display(),
        settings.profiles.len(),
        settings.global_commands.len(),
        settings.logs.len(),
        repaired,
    );

    if repaired && write {
        store.save(&settings)?;
        println!("validate: repaired document written");
    }
    Ok(())
}

/// Dry-run a login: build and print the execution plan without dispatching.
pub fn execute_plan(
    settings_path: &Path,
    character: &str,
    world_id: u16,
    world_name: &str,
    json: bool,
) -> Result<()> {
    let mut settings = SettingsStore::new(settings_path.to_path_buf()).load()?;
    sanitize_settings(&mut settings);

    let identity = Identity {
        name: character.to_string(),
        world_id,
        world_name: world_name.to_string(),
    };
    let rows = build_plan_rows(&settings, &identity, unix_now_ms());

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("failed to render plan json")?
        );
    } else {
        println!(
            "plan: path={} character={} world_id={} world_name={} rows={}",
            settings_path.display(),
            character,
            world_id,
            if world_name.is_empty() { "none" } else { world_name },
            rows.len(),
        );
        for row in &rows {
            println!(
                "plan row: seq={} status={} offset_ms={} name={} command={} message={}",
                row.sequence_index,
                row.status,
                row.offset_ms,
                if row.name.is_empty() { "none" } else { &row.name },
                row.command_text,
                if row.message.is_empty() { "none" } else { &row.message },
            );
        }
    }
    Ok(())
}

/// Write the transfer payload to stdout or a file.
pub fn execute_export(settings_path: &Path, out: Option<&Path>) -> Result<()> {
    let settings = SettingsStore::new(settings_path.to_path_buf()).load()?;
    let payload = export_transfer(&settings)?;
    match out {
        Some(path) => {
            std::fs::write(path, &payload)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("export: written to {}", path.display());
        }
        None => print!("{payload}"),
    }
    Ok(())
}

/// Replace profiles and global commands with an imported transfer payload.
/// The stored document is untouched when the payload does not parse.
pub fn execute_import(settings_path: &Path, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let (payload, counts) = match import_transfer(&raw) {
        Ok(result) => result,
        Err(error) => bail!("import failed: {error:#}"),
    };

    let store = SettingsStore::new(settings_path.to_path_buf());
    let mut settings = store.load()?;
    apply_transfer(&mut settings, payload);
    store.save(&settings)?;

    println!(
        "import complete: profiles={} commands={}",
        counts.profiles, counts.commands
    );
    Ok(())
}

/// Render the most recent execution journal entries.
pub fn execute_logs(settings_path: &Path, limit: usize) -> Result<()> {
    let settings = SettingsStore::new(settings_path.to_path_buf()).load()?;
    let entries = &settings.logs;
    let start = entries.len().saturating_sub(limit.max(1));

    println!(
        "logs: path={} total={} shown={}",
        settings_path.display(),
        entries.len(),
        entries.len() - start,
    );
    for entry in &entries[start..] {
        println!(
            "log: time={} character={} status={} command={} message={}",
            format_timestamp(entry.timestamp_unix_ms),
            if entry.character_key.is_empty() {
                "none"
            } else {
                &entry.character_key
            },
            entry.status.as_str(),
            entry.command_text,
            if entry.message.is_empty() {
                "none"
            } else {
                &entry.message
            },
        );
    }
    Ok(())
}

fn build_inspect_report(settings: &Settings, settings_path: &Path) -> InspectReport {
    InspectReport {
        settings_path: settings_path.display().to_string(),
        profiles: settings.profiles.len(),
        global_commands: settings.global_commands.len(),
        journal_entries: settings.logs.len(),
        log_output_enabled: settings.log_output_enabled,
        rows: settings
            .profiles
            .iter()
            .map(|profile| InspectProfileRow {
                label: profile.label.clone(),
                character_name: profile.character_name.clone(),
                world: if profile.world_name.is_empty() {
                    format!("World {}", profile.world_id)
                } else {
                    profile.world_name.clone()
                },
                enabled: profile.enabled,
                commands: profile.commands.len(),
            })
            .collect(),
    }
}

fn render_inspect_report(report: &InspectReport) -> String {
    let mut lines = vec![format!(
        "inspect: path={} profiles={} global_commands={} journal_entries={} log_output_enabled={}",
        report.settings_path,
        report.profiles,
        report.global_commands,
        report.journal_entries,
        report.log_output_enabled,
    )];

    for row in &report.rows {
        lines.push(format!(
            "inspect profile: label={} character={} world={} enabled={} commands={}",
            if row.label.is_empty() { "none" } else { &row.label },
            if row.character_name.is_empty() {
                "none"
            } else {
                &row.character_name
            },
            row.world,
            row.enabled,
            row.commands,
        ));
    }

    lines.join("\n")
}

fn build_plan_rows(settings: &Settings, identity: &Identity, now_unix_ms: u64) -> Vec<PlanRow> {
    let profile = find_profile_index(&settings.profiles, identity)
        .and_then(|index| settings.profiles.get(index));
    let build = build_plan(
        &settings.global_commands,
        profile,
        identity,
        &HashSet::new(),
        now_unix_ms,
    );

    build
        .entries
        .into_iter()
        .map(|entry| PlanRow {
            sequence_index: entry.sequence_index,
            status: entry.status.as_str().to_string(),
            offset_ms: entry.scheduled_unix_ms.saturating_sub(now_unix_ms),
            name: entry.command.name,
            command_text: entry.command.command_text,
            message: entry.message,
        })
        .collect()
}

fn format_timestamp(timestamp_unix_ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_unix_ms as i64)
        .map(|moment| moment.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| format!("unix_ms {timestamp_unix_ms}"))
}
