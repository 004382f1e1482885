//! Per-claim timing gate.
//!
//! The tracker performs no I/O. Callers feed it the current unix time and it
//! answers whether the next stage may run. Two wait lengths exist because the
//! outcome is known before waiting: a located transaction waits for attestation
//! finality, a missing one only backs off briefly before the next attempt.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome the caller expects once the wait elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpectedOutcome {
    /// A transaction was located and an attestation request was submitted.
    Found,
    /// No transaction was located; fail fast and allow a new attempt.
    NotFound,
}

/// Wait lengths in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerWindows {
    /// Approximates attestation finality.
    pub success_secs: u64,
    pub failure_secs: u64,
}

impl Default for TrackerWindows {
    fn default() -> Self {
        Self {
            success_secs: 180,
            failure_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    AttestationPending {
        started_at: u64,
        expected: ExpectedOutcome,
    },
    /// Finality window elapsed; the proof may be fetched and submitted.
    Succeeded,
}

impl TrackerState {
    /// Short label for logs and metrics.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AttestationPending {
                expected: ExpectedOutcome::Found,
                ..
            } => "pending_success",
            Self::AttestationPending {
                expected: ExpectedOutcome::NotFound,
                ..
            } => "pending_failure",
            Self::Succeeded => "succeeded",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("attempt started at {started_at} is still pending")]
    AttemptPending { started_at: u64 },

    #[error("attestation already succeeded")]
    AlreadySucceeded,
}

#[derive(Debug, Clone)]
pub struct ClaimStatusTracker {
    state: TrackerState,
    windows: TrackerWindows,
}

impl Default for ClaimStatusTracker {
    fn default() -> Self {
        Self::new(TrackerWindows::default())
    }
}

impl ClaimStatusTracker {
    pub const fn new(windows: TrackerWindows) -> Self {
        Self {
            state: TrackerState::Idle,
            windows,
        }
    }

    pub const fn state(&self) -> TrackerState {
        self.state
    }

    const fn window_for(&self, expected: ExpectedOutcome) -> u64 {
        match expected {
            ExpectedOutcome::Found => self.windows.success_secs,
            ExpectedOutcome::NotFound => self.windows.failure_secs,
        }
    }

    /// Idle -> AttestationPending. Rejected while an attempt is in flight.
    pub fn start_attempt(&mut self, now: u64, expected: ExpectedOutcome) -> Result<(), TrackerError> {
        match self.state {
            TrackerState::Idle => {
                self.state = TrackerState::AttestationPending {
                    started_at: now,
                    expected,
                };
                Ok(())
            }
            TrackerState::AttestationPending { started_at, .. } => {
                Err(TrackerError::AttemptPending { started_at })
            }
            TrackerState::Succeeded => Err(TrackerError::AlreadySucceeded),
        }
    }

    /// Advance the state for the current time and return it.
    ///
    /// An elapsed success window moves to Succeeded; an elapsed failure window
    /// clears the attempt and returns to Idle.
    pub fn poll(&mut self, now: u64) -> TrackerState {
        if let TrackerState::AttestationPending {
            started_at,
            expected,
        } = self.state
        {
            if now >= started_at.saturating_add(self.window_for(expected)) {
                self.state = match expected {
                    ExpectedOutcome::Found => TrackerState::Succeeded,
                    ExpectedOutcome::NotFound => TrackerState::Idle,
                };
            }
        }
        self.state
    }

    /// Seconds left in the current window, if one is running.
    pub fn remaining(&self, now: u64) -> Option<u64> {
        match self.state {
            TrackerState::AttestationPending {
                started_at,
                expected,
            } => Some(
                started_at
                    .saturating_add(self.window_for(expected))
                    .saturating_sub(now),
            ),
            _ => None,
        }
    }

    /// Drop any progress and allow a fresh attempt.
    pub const fn reset(&mut self) {
        self.state = TrackerState::Idle;
    }
}
