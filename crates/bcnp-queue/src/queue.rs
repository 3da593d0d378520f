//! The command queue: backlog plus activation state.
//!
//! Per tick the owner drives the queue in this order:
//!
//! 1. [`clear`](CommandQueue::clear) if the packet asked for it
//! 2. [`admit`](CommandQueue::admit) the packet's commands
//! 3. [`advance`](CommandQueue::advance) once, which expires the active
//!    command if its time is up and then promotes the next one
//!
//! Clearing before admitting means a stop request always beats stale
//! backlog. Expiring before promoting means the next command starts in
//! the same tick the previous one ends, with no idle gap.

use std::time::Instant;

use bcnp_protocol::Command;
use tracing::{debug, trace};

use crate::{ActivationState, Backlog};

/// Outcome of admitting a batch of commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Admission {
    /// Commands appended to the backlog.
    pub admitted: usize,
    /// Commands refused because the backlog was full.
    pub dropped: usize,
}

/// What [`CommandQueue::advance`] did.
///
/// Both fields can be set in the same tick: the old command expired and
/// the next one was promoted straight away.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transition {
    pub expired: Option<Command>,
    pub promoted: Option<Command>,
}

impl Transition {
    /// Returns `true` if nothing changed.
    pub fn is_noop(&self) -> bool {
        self.expired.is_none() && self.promoted.is_none()
    }
}

/// Bounded, ordered, time-aware store of drive commands.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    backlog: Backlog,
    state: ActivationState,
}

impl CommandQueue {
    /// Creates an idle queue whose backlog holds at most `capacity` commands.
    pub fn new(capacity: usize) -> Self {
        Self {
            backlog: Backlog::new(capacity),
            state: ActivationState::Idle,
        }
    }

    /// Appends commands in order, dropping any that do not fit.
    ///
    /// A full backlog refuses the *incoming* command; queued commands are
    /// never evicted. One refusal does not stop the rest of the batch, so
    /// a later command is still refused too unless space was freed.
    pub fn admit(&mut self, commands: impl IntoIterator<Item = Command>) -> Admission {
        let mut outcome = Admission::default();
        for command in commands {
            match self.backlog.push(command) {
                Ok(()) => outcome.admitted += 1,
                Err(e) => {
                    debug!(error = %e, "dropping incoming command");
                    outcome.dropped += 1;
                }
            }
        }
        outcome
    }

    /// Empties the backlog and discards the active command.
    ///
    /// Takes effect immediately. Returns how many commands were discarded,
    /// counting the active one.
    pub fn clear(&mut self) -> usize {
        let active = usize::from(!self.state.is_idle());
        let queued = self.backlog.clear();
        self.state = ActivationState::Idle;
        if active + queued > 0 {
            debug!(queued, active, "command queue cleared");
        }
        active + queued
    }

    /// Runs one expiry/promotion step at `now`.
    pub fn advance(&mut self, now: Instant) -> Transition {
        let mut transition = Transition::default();

        let (state, expired) = self.state.expire(now);
        self.state = state;
        transition.expired = expired;

        if let Some(&next) = self.backlog.front() {
            if let Ok(state) = self.state.promote(next, now) {
                self.backlog.pop_front();
                self.state = state;
                transition.promoted = Some(next);
            }
        }

        if !transition.is_noop() {
            trace!(
                expired = transition.expired.is_some(),
                promoted = transition.promoted.is_some(),
                backlog = self.backlog.len(),
                "queue advanced"
            );
        }
        transition
    }

    /// The active command, if any. Never mutates.
    pub fn active(&self) -> Option<Command> {
        self.state.command()
    }

    /// When the active command started, if any.
    pub fn active_since(&self) -> Option<Instant> {
        self.state.started_at()
    }

    /// The current activation state.
    pub fn state(&self) -> &ActivationState {
        &self.state
    }

    /// The queued commands, not counting the active one.
    pub fn backlog(&self) -> &Backlog {
        &self.backlog
    }

    /// Number of queued commands, not counting the active one.
    pub fn len(&self) -> usize {
        self.backlog.len()
    }

    /// Returns `true` if nothing is queued and nothing is active.
    pub fn is_empty(&self) -> bool {
        self.backlog.is_empty() && self.state.is_idle()
    }

    pub fn capacity(&self) -> usize {
        self.backlog.capacity()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn cmd(vx: f32, ms: u16) -> Command {
        Command::from_millis(vx, 0.0, ms)
    }

    #[test]
    fn test_new_queue_is_idle_and_empty() {
        let q = CommandQueue::new(4);
        assert!(q.is_empty());
        assert_eq!(q.active(), None);
        assert_eq!(q.capacity(), 4);
    }

    #[test]
    fn test_admit_counts_overflow() {
        let mut q = CommandQueue::new(2);
        let outcome = q.admit([cmd(1.0, 10), cmd(2.0, 10), cmd(3.0, 10)]);
        assert_eq!(outcome, Admission { admitted: 2, dropped: 1 });
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_advance_promotes_immediately() {
        let t0 = Instant::now();
        let mut q = CommandQueue::new(4);
        q.admit([cmd(1.0, 100)]);
        let t = q.advance(t0);
        assert_eq!(t.promoted, Some(cmd(1.0, 100)));
        assert_eq!(t.expired, None);
        assert_eq!(q.active(), Some(cmd(1.0, 100)));
        assert_eq!(q.active_since(), Some(t0));
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_expire_then_promote_same_tick() {
        let t0 = Instant::now();
        let mut q = CommandQueue::new(4);
        q.admit([cmd(1.0, 100), cmd(2.0, 100)]);
        q.advance(t0);

        assert!(q.advance(t0 + Duration::from_millis(50)).is_noop());
        assert_eq!(q.active(), Some(cmd(1.0, 100)));

        let later = t0 + Duration::from_millis(150);
        let t = q.advance(later);
        assert_eq!(t.expired, Some(cmd(1.0, 100)));
        assert_eq!(t.promoted, Some(cmd(2.0, 100)));
        assert_eq!(q.active_since(), Some(later));
    }

    #[test]
    fn test_expiry_without_backlog_goes_idle() {
        let t0 = Instant::now();
        let mut q = CommandQueue::new(4);
        q.admit([cmd(1.0, 20)]);
        q.advance(t0);
        let t = q.advance(t0 + Duration::from_millis(20));
        assert!(t.expired.is_some());
        assert!(t.promoted.is_none());
        assert_eq!(q.active(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn test_persistent_command_held_until_cleared() {
        let t0 = Instant::now();
        let mut q = CommandQueue::new(4);
        q.admit([cmd(1.0, 0), cmd(2.0, 100)]);
        q.advance(t0);
        q.advance(t0 + Duration::from_secs(60));
        assert_eq!(q.active(), Some(cmd(1.0, 0)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_clear_discards_active_and_backlog() {
        let t0 = Instant::now();
        let mut q = CommandQueue::new(4);
        q.admit([cmd(1.0, 100), cmd(2.0, 100), cmd(3.0, 100)]);
        q.advance(t0);
        assert_eq!(q.clear(), 3);
        assert!(q.is_empty());
        assert_eq!(q.active(), None);
        assert_eq!(q.clear(), 0);
    }

    #[test]
    fn test_active_does_not_mutate() {
        let t0 = Instant::now();
        let mut q = CommandQueue::new(4);
        q.admit([cmd(1.0, 100)]);
        q.advance(t0);
        for _ in 0..3 {
            assert_eq!(q.active(), Some(cmd(1.0, 100)));
        }
        assert_eq!(q.active_since(), Some(t0));
    }
}
