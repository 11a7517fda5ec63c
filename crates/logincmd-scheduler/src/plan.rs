use std::collections::HashSet;

use uuid::Uuid;

use logincmd_config::{CommandEntry, CommandStatus, Profile, MAX_DELAY_MS};

use crate::Identity;

/// Derived, ephemeral record for one planned command execution. Created at
/// plan-build time, mutated in place as it is dispatched or overridden, and
/// discarded when the plan is rebuilt or the identity logs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEntry {
    pub sequence_index: usize,
    pub character_key: String,
    pub command: CommandEntry,
    pub scheduled_unix_ms: u64,
    pub status: CommandStatus,
    pub message: String,
}

/// Result of building an execution plan: every candidate in sequence order,
/// plus the indices of the entries that start out `Pending`. The pending
/// indices are in ascending scheduled-time order because the delay cursor
/// only moves forward.
#[derive(Debug, Default)]
pub struct PlanBuild {
    pub entries: Vec<ExecutionEntry>,
    pub pending: Vec<usize>,
}

/// Resolved display key for an identity, `name@world`. Falls back to the
/// numeric world id when the world name is not populated.
pub fn character_key(identity: &Identity) -> String {
    let world = identity.world_name.trim();
    if world.is_empty() {
        format!("{}@World {}", identity.name, identity.world_id)
    } else {
        format!("{}@{}", identity.name, world)
    }
}

/// Index of the first enabled profile matching the identity: character name
/// case-insensitively, then world name when the profile carries one, else
/// world id.
pub fn find_profile_index(profiles: &[Profile], identity: &Identity) -> Option<usize> {
    profiles.iter().position(|profile| {
        profile.enabled
            && eq_ignore_case(&profile.character_name, &identity.name)
            && if profile.world_name.trim().is_empty() {
                profile.world_id == identity.world_id
            } else {
                eq_ignore_case(&profile.world_name, &identity.world_name)
            }
    })
}

fn eq_ignore_case(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}

/// Builds the execution plan for a ready identity.
///
/// Candidates are the global commands in configured order followed by the
/// matched profile's commands (when the profile is enabled). Disabled
/// commands, empty command text, and once-per-session commands already in the
/// dedup ledger stay in the plan as `Skipped` and do not advance the delay
/// cursor; everything else becomes `Pending` with the cursor advanced by the
/// command's clamped delay before its scheduled time is assigned, so the
/// first runnable command's delay still applies.
pub fn build_plan(
    global_commands: &[CommandEntry],
    profile: Option<&Profile>,
    identity: &Identity,
    session_executed: &HashSet<Uuid>,
    now_unix_ms: u64,
) -> PlanBuild {
    let key = character_key(identity);

    let mut candidates: Vec<&CommandEntry> = global_commands.iter().collect();
    if let Some(profile) = profile.filter(|profile| profile.enabled) {
        candidates.extend(profile.commands.iter());
    }

    let mut build = PlanBuild::default();
    let mut cursor_unix_ms = now_unix_ms;

    for (sequence_index, command) in candidates.into_iter().enumerate() {
        let mut entry = ExecutionEntry {
            sequence_index,
            character_key: key.clone(),
            command: command.clone(),
            scheduled_unix_ms: cursor_unix_ms,
            status: CommandStatus::Pending,
            message: String::new(),
        };

        if !command.enabled {
            entry.status = CommandStatus::Skipped;
            entry.message = "Disabled".to_string();
            build.entries.push(entry);
            continue;
        }

        if command.command_text.trim().is_empty() {
            entry.status = CommandStatus::Skipped;
            entry.message = "Empty command".to_string();
            build.entries.push(entry);
            continue;
        }

        if command.run_mode == logincmd_config::RunMode::OncePerSession
            && session_executed.contains(&command.id)
        {
            entry.status = CommandStatus::Skipped;
            entry.message = "Already sent this session".to_string();
            build.entries.push(entry);
            continue;
        }

        cursor_unix_ms = cursor_unix_ms.saturating_add(command.delay_ms.min(MAX_DELAY_MS));
        entry.scheduled_unix_ms = cursor_unix_ms;
        build.pending.push(entry.sequence_index);
        build.entries.push(entry);
    }

    build
}
