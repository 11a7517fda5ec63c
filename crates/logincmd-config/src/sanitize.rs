use std::collections::HashSet;

use uuid::Uuid;

use crate::models::{CommandEntry, LogEntry, Profile, Settings, TransferPayload};

/// Upper bound for a per-command replay delay (ten minutes).
pub const MAX_DELAY_MS: u64 = 10 * 60 * 1000;

/// Maximum execution-journal entries retained in the settings document.
pub const LOG_RETENTION_MAX: usize = 500;

/// Counts reported back to the caller after sanitizing an imported payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCounts {
    pub profiles: usize,
    pub commands: usize,
}

/// Repairs a settings document in place and reports whether anything changed.
///
/// Applied bottom-up: commands inside profiles, then profiles, then the log
/// journal. Never fails; structural corruption is handled earlier, at the
/// decode boundary.
pub fn sanitize_settings(settings: &mut Settings) -> bool {
    let mut changed = false;
    changed |= sanitize_commands(&mut settings.global_commands);
    changed |= sanitize_profiles(&mut settings.profiles);
    changed |= sanitize_logs(&mut settings.logs);
    changed
}

/// Sanitizes a standalone import payload and reports resulting counts
/// (profiles, plus global and per-profile commands) for caller feedback.
/// The live configuration is untouched until the caller applies the payload.
pub fn sanitize_transfer(payload: &mut TransferPayload) -> TransferCounts {
    sanitize_profiles(&mut payload.profiles);
    sanitize_commands(&mut payload.global_commands);

    let profile_commands: usize = payload
        .profiles
        .iter()
        .map(|profile| profile.commands.len())
        .sum();
    TransferCounts {
        profiles: payload.profiles.len(),
        commands: payload.global_commands.len().saturating_add(profile_commands),
    }
}

pub fn sanitize_profiles(profiles: &mut Vec<Profile>) -> bool {
    let mut changed = false;
    let mut seen_ids = HashSet::new();

    for profile in profiles.iter_mut() {
        if profile.id.is_nil() || !seen_ids.insert(profile.id) {
            profile.id = Uuid::new_v4();
            seen_ids.insert(profile.id);
            changed = true;
        }

        changed |= trim_in_place(&mut profile.label);
        changed |= trim_in_place(&mut profile.character_name);
        changed |= trim_in_place(&mut profile.world_name);
        changed |= sanitize_commands(&mut profile.commands);
    }

    changed
}

pub fn sanitize_commands(commands: &mut Vec<CommandEntry>) -> bool {
    let mut changed = false;
    let mut seen_ids = HashSet::new();

    for command in commands.iter_mut() {
        if command.id.is_nil() || !seen_ids.insert(command.id) {
            command.id = Uuid::new_v4();
            seen_ids.insert(command.id);
            changed = true;
        }

        changed |= trim_in_place(&mut command.name);
        changed |= trim_in_place(&mut command.command_text);

        let clamped = command.delay_ms.min(MAX_DELAY_MS);
        if command.delay_ms != clamped {
            command.delay_ms = clamped;
            changed = true;
        }
    }

    changed
}

pub fn sanitize_logs(logs: &mut Vec<LogEntry>) -> bool {
    if logs.len() <= LOG_RETENTION_MAX {
        return false;
    }
    let excess = logs.len() - LOG_RETENTION_MAX;
    logs.drain(..excess);
    true
}

fn trim_in_place(value: &mut String) -> bool {
    let trimmed = value.trim();
    if trimmed.len() == value.len() {
        return false;
    }
    *value = trimmed.to_string();
    true
}
