//! Protocol counters owned by one engine.
//!
//! The counters only ever go up, and they saturate instead of wrapping,
//! so a flood of garbage cannot roll them back to zero. The engine
//! updates them as a side effect of decode and admission outcomes; the
//! outside world only gets read access.

use serde::Serialize;

/// Monotonic counters for one engine instance.
#[derive(Debug, Default)]
pub struct Metrics {
    packets_received: u64,
    parse_errors: u64,
    queue_overflows: u64,
    commands_dropped: u64,
}

impl Metrics {
    /// Packets that passed structural validation.
    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    /// Structural rejections plus skipped records.
    pub fn parse_errors(&self) -> u64 {
        self.parse_errors
    }

    /// Incoming commands refused because the backlog was full.
    pub fn queue_overflows(&self) -> u64 {
        self.queue_overflows
    }

    /// Commands discarded at admission.
    pub fn commands_dropped(&self) -> u64 {
        self.commands_dropped
    }

    /// A copy of all counters, for telemetry.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_received: self.packets_received,
            parse_errors: self.parse_errors,
            queue_overflows: self.queue_overflows,
            commands_dropped: self.commands_dropped,
        }
    }

    pub(crate) fn record_packet(&mut self) {
        self.packets_received = self.packets_received.saturating_add(1);
    }

    pub(crate) fn record_parse_errors(&mut self, n: usize) {
        self.parse_errors = self.parse_errors.saturating_add(n as u64);
    }

    pub(crate) fn record_overflow(&mut self, dropped: usize) {
        self.queue_overflows = self.queue_overflows.saturating_add(dropped as u64);
        self.commands_dropped = self.commands_dropped.saturating_add(dropped as u64);
    }
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub packets_received: u64,
    pub parse_errors: u64,
    pub queue_overflows: u64,
    pub commands_dropped: u64,
}
