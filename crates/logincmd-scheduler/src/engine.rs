use std::collections::{HashSet, VecDeque};

use anyhow::Result;
use uuid::Uuid;

use logincmd_config::{
    sanitize_logs, sanitize_settings, CommandStatus, LogEntry, RunMode, Settings, SettingsStore,
};

use crate::plan::{build_plan, character_key, find_profile_index, ExecutionEntry};
use crate::poller::{PollOutcome, PollerState, ReadinessPoller};
use crate::{CommandSink, Identity, IdentityProbe};

/// Debounce window for configuration saves.
pub const SAVE_DEBOUNCE_MS: u64 = 500;

const NOT_LOGGED_IN: &str = "Not logged in";

/// Persistence seam for the debounced save gate.
pub trait SettingsWriter {
    fn persist(&mut self, settings: &Settings) -> Result<()>;
}

impl SettingsWriter for SettingsStore {
    fn persist(&mut self, settings: &Settings) -> Result<()> {
        self.save(settings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Timing knobs for the scheduler; defaults match the production windows.
pub struct SchedulerConfig {
    pub save_debounce_ms: u64,
    pub readiness_poll_interval_ms: u64,
    pub readiness_timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: SAVE_DEBOUNCE_MS,
            readiness_poll_interval_ms: crate::poller::READINESS_POLL_INTERVAL_MS,
            readiness_timeout_ms: crate::poller::READINESS_TIMEOUT_MS,
        }
    }
}

/// Owned scheduler state for one login→logout session stream.
///
/// Constructed once, then driven exclusively through `tick`, the
/// login/logout edges, and the manual override surface — all on one logical
/// thread, so no locking is involved anywhere in the scheduler.
pub struct LoginScheduler {
    config: SchedulerConfig,
    settings: Settings,
    writer: Box<dyn SettingsWriter>,
    probe: Box<dyn IdentityProbe>,
    sink: Box<dyn CommandSink>,
    plan: Vec<ExecutionEntry>,
    pending: VecDeque<usize>,
    session_executed: HashSet<Uuid>,
    poller: ReadinessPoller,
    save_pending: bool,
    save_not_before_unix_ms: u64,
    active_character: Option<String>,
}

impl LoginScheduler {
    /// Builds a scheduler around loaded settings. The settings are sanitized
    /// first; when the sanitizer repaired anything the corrected document is
    /// persisted immediately.
    pub fn new(
        mut settings: Settings,
        probe: Box<dyn IdentityProbe>,
        sink: Box<dyn CommandSink>,
        writer: Box<dyn SettingsWriter>,
        config: SchedulerConfig,
        now_unix_ms: u64,
    ) -> Self {
        let repaired = sanitize_settings(&mut settings);
        let mut scheduler = Self {
            poller: ReadinessPoller::new(
                config.readiness_poll_interval_ms,
                config.readiness_timeout_ms,
            ),
            config,
            settings,
            writer,
            probe,
            sink,
            plan: Vec::new(),
            pending: VecDeque::new(),
            session_executed: HashSet::new(),
            save_pending: false,
            save_not_before_unix_ms: 0,
            active_character: None,
        };
        if repaired {
            scheduler.queue_save(now_unix_ms, true);
            scheduler.save_now(now_unix_ms);
        }
        scheduler
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn execution_plan(&self) -> &[ExecutionEntry] {
        &self.plan
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Read-only view of the pending queue in dispatch order.
    pub fn pending_entries(&self) -> Vec<&ExecutionEntry> {
        self.pending
            .iter()
            .filter_map(|&index| self.plan.get(index))
            .collect()
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller.state()
    }

    pub fn active_character_display(&self) -> &str {
        self.active_character.as_deref().unwrap_or(NOT_LOGGED_IN)
    }

    /// Identity-became-active edge.
    pub fn on_login(&mut self, now_unix_ms: u64) {
        self.poller.arm(now_unix_ms);
    }

    /// Identity-became-inactive edge: unconditional cancellation. The plan,
    /// the pending queue, the dedup ledger, and any in-flight readiness wait
    /// are all discarded.
    pub fn on_logout(&mut self) {
        self.active_character = None;
        self.plan.clear();
        self.pending.clear();
        self.session_executed.clear();
        self.poller.disarm();
    }

    /// One scheduler cycle: readiness poller, then the save gate, then the
    /// queue drainer. The caller samples the wall clock exactly once and
    /// passes it in.
    pub fn tick(&mut self, now_unix_ms: u64) {
        match self.poller.poll(now_unix_ms, self.probe.as_ref()) {
            PollOutcome::Ready(identity) => self.install_plan(&identity, now_unix_ms),
            PollOutcome::TimedOut => {
                tracing::warn!("login detected but identity data never became ready");
            }
            PollOutcome::Idle | PollOutcome::NotDue | PollOutcome::NotReady => {}
        }

        if self.save_pending && now_unix_ms >= self.save_not_before_unix_ms {
            self.save_now(now_unix_ms);
        }

        // Drain every due entry, not just one: after a stall several entries
        // may share an elapsed scheduled time and must all go out in order.
        loop {
            let Some(&head_index) = self.pending.front() else {
                break;
            };
            let due = self
                .plan
                .get(head_index)
                .is_some_and(|entry| entry.scheduled_unix_ms <= now_unix_ms);
            if !due {
                break;
            }
            self.pending.pop_front();
            self.execute_entry(head_index, now_unix_ms);
        }
    }

    /// Dispatches a `Pending` entry immediately, out of queue order. Any
    /// other status is a no-op.
    pub fn run_entry_now(&mut self, sequence_index: usize, now_unix_ms: u64) {
        let Some(entry) = self.plan.get_mut(sequence_index) else {
            return;
        };
        if entry.status != CommandStatus::Pending {
            return;
        }
        entry.scheduled_unix_ms = now_unix_ms;
        self.pending.retain(|&index| index != sequence_index);
        self.execute_entry(sequence_index, now_unix_ms);
    }

    /// Skips a `Pending` entry with a caller-supplied reason. Any other
    /// status is a no-op.
    pub fn skip_entry(&mut self, sequence_index: usize, reason: &str, now_unix_ms: u64) {
        let Some(entry) = self.plan.get_mut(sequence_index) else {
            return;
        };
        if entry.status != CommandStatus::Pending {
            return;
        }
        entry.status = CommandStatus::Skipped;
        entry.message = reason.to_string();
        self.pending.retain(|&index| index != sequence_index);
        let journaled = self.plan[sequence_index].clone();
        self.write_execution_log(&journaled, now_unix_ms);
    }

    /// Skips every currently pending entry with reason "Cleared".
    pub fn clear_pending(&mut self, now_unix_ms: u64) {
        let indices: Vec<usize> = self.pending.drain(..).collect();
        for index in indices {
            let Some(entry) = self.plan.get_mut(index) else {
                continue;
            };
            entry.status = CommandStatus::Skipped;
            entry.message = "Cleared".to_string();
            let journaled = entry.clone();
            self.write_execution_log(&journaled, now_unix_ms);
        }
    }

    /// Marks the configuration dirty. Debounced by default so bursts of
    /// edits collapse into one save; `immediate` arms the gate for the next
    /// tick.
    pub fn queue_save(&mut self, now_unix_ms: u64, immediate: bool) {
        self.save_pending = true;
        self.save_not_before_unix_ms = if immediate {
            now_unix_ms
        } else {
            now_unix_ms.saturating_add(self.config.save_debounce_ms)
        };
    }

    /// Persists now when a save is pending. A failed persist re-arms the
    /// gate one debounce window later instead of hot-retrying every tick.
    pub fn save_now(&mut self, now_unix_ms: u64) {
        if !self.save_pending {
            return;
        }
        match self.writer.persist(&self.settings) {
            Ok(()) => {
                self.save_pending = false;
            }
            Err(error) => {
                tracing::error!("settings save failed, retrying after debounce: {error:#}");
                self.save_not_before_unix_ms =
                    now_unix_ms.saturating_add(self.config.save_debounce_ms);
            }
        }
    }

    /// Scoped shutdown: forces a pending save synchronously.
    pub fn shutdown(&mut self, now_unix_ms: u64) {
        self.save_now(now_unix_ms);
    }

    fn install_plan(&mut self, identity: &Identity, now_unix_ms: u64) {
        self.plan.clear();
        self.pending.clear();

        let profile_index = find_profile_index(&self.settings.profiles, identity);
        if let Some(index) = profile_index {
            if self.settings.profiles[index].world_id != identity.world_id {
                self.settings.profiles[index].world_id = identity.world_id;
                self.queue_save(now_unix_ms, false);
            }
        }

        self.active_character = Some(character_key(identity));

        let profile = profile_index.and_then(|index| self.settings.profiles.get(index));
        let build = build_plan(
            &self.settings.global_commands,
            profile,
            identity,
            &self.session_executed,
            now_unix_ms,
        );
        self.plan = build.entries;
        self.pending = build.pending.into_iter().collect();

        // Dedup hits are journaled at build time; other skip kinds stay
        // plan-only unless surfaced later.
        let dedup_skips: Vec<ExecutionEntry> = self
            .plan
            .iter()
            .filter(|entry| {
                entry.status == CommandStatus::Skipped
                    && entry.message == "Already sent this session"
            })
            .cloned()
            .collect();
        for entry in dedup_skips {
            self.write_execution_log(&entry, now_unix_ms);
        }
    }

    fn execute_entry(&mut self, index: usize, now_unix_ms: u64) {
        let command = self.plan[index].command.clone();
        let outcome = self.sink.dispatch(&command.command_text);

        let sent = outcome.is_ok();
        {
            let entry = &mut self.plan[index];
            match outcome {
                Ok(()) => {
                    entry.status = CommandStatus::Sent;
                    entry.message = "Sent".to_string();
                }
                Err(error) => {
                    entry.status = CommandStatus::Error;
                    entry.message = error.message;
                }
            }
        }

        // Once-per-session only counts on a successful dispatch; an errored
        // attempt stays eligible for the next plan build.
        if sent && command.run_mode == RunMode::OncePerSession {
            self.session_executed.insert(command.id);
        }

        let journaled = self.plan[index].clone();
        self.write_execution_log(&journaled, now_unix_ms);
    }

    fn write_execution_log(&mut self, entry: &ExecutionEntry, now_unix_ms: u64) {
        self.settings.logs.push(LogEntry {
            timestamp_unix_ms: now_unix_ms,
            character_key: entry.character_key.clone(),
            command_text: entry.command.command_text.clone(),
            status: entry.status,
            message: entry.message.clone(),
        });
        sanitize_logs(&mut self.settings.logs);
        self.queue_save(now_unix_ms, false);

        if self.settings.log_output_enabled {
            let line = format!(
                "[{}] #{} '{}': {} -> {} ({})",
                entry.character_key,
                entry.sequence_index,
                entry.command.name,
                entry.command.command_text,
                entry.status.as_str(),
                entry.message
            );
            match entry.status {
                CommandStatus::Error => tracing::error!("{line}"),
                CommandStatus::Skipped => tracing::warn!("{line}"),
                _ => tracing::info!("{line}"),
            }
        }
    }
}
