//! Connection monitor: liveness from the last accepted packet.
//!
//! Only one fact is stored, the time of the last structurally accepted
//! packet. "Connected" is recomputed from it on every query and never
//! cached, so it can't go stale between ticks.

use std::time::{Duration, Instant};

/// Derives connected/disconnected from packet recency.
#[derive(Debug, Clone)]
pub struct ConnectionMonitor {
    last_accepted: Option<Instant>,
    timeout: Duration,
}

impl ConnectionMonitor {
    /// Creates a monitor that has never seen a packet.
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_accepted: None,
            timeout,
        }
    }

    /// Register one accepted packet at `now`.
    pub fn record_accepted(&mut self, now: Instant) {
        self.last_accepted = Some(now);
    }

    /// `true` if a packet was accepted less than `timeout` before `now`.
    /// Always `false` before the first packet.
    pub fn is_connected(&self, now: Instant) -> bool {
        self.time_since_last(now)
            .is_some_and(|elapsed| elapsed < self.timeout)
    }

    /// Time since the last accepted packet, if there has been one.
    pub fn time_since_last(&self, now: Instant) -> Option<Duration> {
        self.last_accepted
            .map(|t| now.saturating_duration_since(t))
    }

    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
