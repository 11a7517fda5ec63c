use crate::{Identity, IdentityProbe};

/// Interval between readiness checks while a login is being absorbed.
pub const READINESS_POLL_INTERVAL_MS: u64 = 250;

/// How long a login may stay not-ready before the attempt is abandoned.
pub const READINESS_TIMEOUT_MS: u64 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates `ReadinessPoller` states.
pub enum PollerState {
    Idle,
    AwaitingReadiness {
        next_check_unix_ms: u64,
        deadline_unix_ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of a single poller step.
pub enum PollOutcome {
    Idle,
    NotDue,
    NotReady,
    Ready(Identity),
    TimedOut,
}

/// Login readiness state machine.
///
/// Identity data may not be populated synchronously with the login signal;
/// the poller re-queries the probe on a fixed interval until it answers or a
/// deadline passes, without ever blocking the tick that drives it.
#[derive(Debug)]
pub struct ReadinessPoller {
    poll_interval_ms: u64,
    timeout_ms: u64,
    state: PollerState,
}

impl ReadinessPoller {
    pub fn new(poll_interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            poll_interval_ms,
            timeout_ms,
            state: PollerState::Idle,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, PollerState::AwaitingReadiness { .. })
    }

    /// Arms the poller on an identity-became-active signal. The first check
    /// is due immediately; the deadline is fixed from this instant.
    pub fn arm(&mut self, now_unix_ms: u64) {
        self.state = PollerState::AwaitingReadiness {
            next_check_unix_ms: now_unix_ms,
            deadline_unix_ms: now_unix_ms.saturating_add(self.timeout_ms),
        };
    }

    /// Returns the poller to `Idle` unconditionally (logout path).
    pub fn disarm(&mut self) {
        self.state = PollerState::Idle;
    }

    /// Runs one step against the probe. Terminal outcomes (`Ready`,
    /// `TimedOut`) return the poller to `Idle`.
    pub fn poll(&mut self, now_unix_ms: u64, probe: &dyn IdentityProbe) -> PollOutcome {
        let PollerState::AwaitingReadiness {
            next_check_unix_ms,
            deadline_unix_ms,
        } = self.state
        else {
            return PollOutcome::Idle;
        };

        if now_unix_ms < next_check_unix_ms {
            return PollOutcome::NotDue;
        }

        if let Some(identity) = probe.current_identity() {
            self.state = PollerState::Idle;
            return PollOutcome::Ready(identity);
        }

        if now_unix_ms >= deadline_unix_ms {
            self.state = PollerState::Idle;
            return PollOutcome::TimedOut;
        }

        self.state = PollerState::AwaitingReadiness {
            next_check_unix_ms: now_unix_ms.saturating_add(self.poll_interval_ms),
            deadline_unix_ms,
        };
        PollOutcome::NotReady
    }
}
