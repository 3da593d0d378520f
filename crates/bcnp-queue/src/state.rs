//! Activation state machine.
//!
//! ```text
//!            promote(next, now)
//!   Idle ─────────────────────────→ Active { command, started_at }
//!    ↑                                   │
//!    └──── expire(now) / clear() ────────┘
//! ```
//!
//! - **Idle**: no command is being executed. The consumer must stop.
//! - **Active**: one command is being executed. It is immutable until it
//!   expires or the queue is cleared.
//!
//! Everything here is a pure function of the current state and `now`.

use std::fmt;
use std::time::{Duration, Instant};

use bcnp_protocol::Command;

/// Whether a command is currently active, and since when.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ActivationState {
    #[default]
    Idle,
    Active {
        command: Command,
        started_at: Instant,
    },
}

impl ActivationState {
    /// Returns `true` if no command is active.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The active command, if any.
    pub fn command(&self) -> Option<Command> {
        match self {
            Self::Idle => None,
            Self::Active { command, .. } => Some(*command),
        }
    }

    /// When the active command started, if any.
    pub fn started_at(&self) -> Option<Instant> {
        match self {
            Self::Idle => None,
            Self::Active { started_at, .. } => Some(*started_at),
        }
    }

    /// How long the active command has been running at `now`.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started_at()
            .map(|start| now.saturating_duration_since(start))
    }

    /// Returns `true` if the active command has run for its full duration.
    ///
    /// A zero duration means "hold until replaced" and never expires.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self {
            Self::Idle => false,
            Self::Active { command, started_at } => {
                !command.is_persistent()
                    && now.saturating_duration_since(*started_at) >= command.duration
            }
        }
    }

    /// Drops the active command if it has expired at `now`.
    ///
    /// Returns the new state and the command that expired, if any.
    pub fn expire(self, now: Instant) -> (Self, Option<Command>) {
        if self.is_expired(now) {
            (Self::Idle, self.command())
        } else {
            (self, None)
        }
    }

    /// Starts `next` at `now` if currently idle.
    ///
    /// An active state is returned unchanged, and `next` is handed back so
    /// the caller can leave it where it was.
    pub fn promote(self, next: Command, now: Instant) -> Result<Self, Command> {
        match self {
            Self::Idle => Ok(Self::Active {
                command: next,
                started_at: now,
            }),
            Self::Active { .. } => Err(next),
        }
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Active { .. } => write!(f, "Active"),
        }
    }
}
