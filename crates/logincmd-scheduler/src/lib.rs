//! Login-triggered command execution scheduler for logincmd.
//!
//! Detects when a character identity becomes ready, builds a deterministic
//! time-offset execution plan from the configured commands, drains that plan
//! against the wall clock, and reconciles manual overrides against the same
//! queue. All scheduler state lives in one owned struct driven from a single
//! periodic tick; every time-dependent operation takes an explicit
//! `now_unix_ms` so the wall clock is sampled once per tick by the caller.

pub mod engine;
pub mod plan;
pub mod poller;


pub use engine::{LoginScheduler, SchedulerConfig, SettingsWriter, SAVE_DEBOUNCE_MS};
pub use plan::{build_plan, character_key, find_profile_index, ExecutionEntry, PlanBuild};
pub use poller::{
    PollOutcome, PollerState, ReadinessPoller, READINESS_POLL_INTERVAL_MS, READINESS_TIMEOUT_MS,
};

/// The character+world combination an execution plan is built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub world_id: u16,
    pub world_name: String,
}

/// Readiness query over the external identity source.
///
/// Returns `None` while the identity's data is not yet populated; the poller
/// keeps asking until it gets an answer or its deadline passes.
pub trait IdentityProbe {
    fn current_identity(&self) -> Option<Identity>;
}

/// Failure surfaced by the external command execution sink.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DispatchError {
    pub message: String,
}

impl DispatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External sink that actually executes a command string.
pub trait CommandSink {
    fn dispatch(&mut self, command_text: &str) -> Result<(), DispatchError>;
}
