//! The engine: one synchronous pass per control tick.
//!
//! ```text
//! tick(now):
//!   for each ready packet (bounded per tick):
//!       decode ──rejected──→ parse_errors += 1, nothing else changes
//!         │
//!       accepted → liveness refreshed, packets_received += 1
//!                → skipped records counted as parse errors
//!                → clear flag applied
//!                → commands admitted (overflow drops the newest)
//!   advance queue once (expire, then promote)
//!   report active command + connected
//! ```
//!
//! All state lives in the engine and is only touched through `&mut self`,
//! so there is exactly one writer and no locking. Time comes from the
//! caller; the engine never reads a clock.

use std::time::Instant;

use bcnp_protocol::{Command, PacketCodec, ProtocolError};
use bcnp_queue::{CommandQueue, Transition};
use bcnp_transport::{Transport, TransportError};
use tracing::{debug, error, info, trace};

use crate::{ConnectionMonitor, EngineConfig, Metrics};

/// What happened during one [`Engine::tick`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickReport {
    /// The command to execute this cycle. `None` means stop.
    pub active: Option<Command>,
    /// Whether the link is alive. `false` means stop, whatever `active` says.
    pub connected: bool,
    /// Packets pulled from the transport this tick.
    pub datagrams: usize,
    /// Of those, how many passed structural validation.
    pub accepted: usize,
    /// Of those, how many were rejected outright.
    pub rejected: usize,
    /// Expiry/promotion performed this tick.
    pub transition: Transition,
    /// `true` while the transport is in a failed state.
    pub transport_faulted: bool,
}

impl TickReport {
    /// The command to drive with, or `None` if the consumer must stop.
    ///
    /// Combines both safety signals: a command is only returned while the
    /// link is alive.
    pub fn drive_command(&self) -> Option<Command> {
        if self.connected { self.active } else { None }
    }
}

/// Tick-driven command delivery over a [`Transport`].
pub struct Engine<T: Transport> {
    config: EngineConfig,
    codec: PacketCodec,
    queue: CommandQueue,
    monitor: ConnectionMonitor,
    metrics: Metrics,
    transport: T,
    fault: Option<TransportError>,
}

impl<T: Transport> Engine<T> {
    /// Creates an engine reading from `transport`.
    ///
    /// The config is validated first; see [`EngineConfig::validated`].
    pub fn new(config: EngineConfig, transport: T) -> Self {
        let config = config.validated();
        info!(
            transport = %transport.kind(),
            version = ?config.protocol.version(),
            capacity = config.max_queue_capacity,
            timeout_ms = config.connection_timeout.as_millis() as u64,
            "command engine created"
        );
        Self {
            codec: PacketCodec::new(config.protocol.clone()),
            queue: CommandQueue::new(config.max_queue_capacity),
            monitor: ConnectionMonitor::new(config.connection_timeout),
            metrics: Metrics::default(),
            transport,
            fault: None,
            config,
        }
    }

    /// Runs one control cycle at `now`.
    ///
    /// Drains up to `max_datagrams_per_tick` packets, then advances the
    /// queue exactly once, even when nothing arrived, so commands still
    /// expire without traffic.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        if self.fault.is_none() {
            for _ in 0..self.config.max_datagrams_per_tick {
                match self.transport.try_receive() {
                    Ok(Some(bytes)) => {
                        report.datagrams += 1;
                        match self.ingest(&bytes, now) {
                            Ok(()) => report.accepted += 1,
                            Err(_) => report.rejected += 1,
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        self.fail_transport(e);
                        break;
                    }
                }
            }
        }

        report.transition = self.queue.advance(now);
        if let Some(command) = report.transition.promoted {
            debug!(
                vx = command.vx,
                omega = command.omega,
                duration_ms = command.duration.as_millis() as u64,
                "command activated"
            );
        }

        report.active = self.queue.active();
        report.connected = self.is_connected(now);
        report.transport_faulted = self.fault.is_some();

        trace!(
            datagrams = report.datagrams,
            accepted = report.accepted,
            rejected = report.rejected,
            backlog = self.queue.len(),
            connected = report.connected,
            "tick"
        );
        report
    }

    /// Decodes one packet and applies it to the queue.
    fn ingest(&mut self, bytes: &[u8], now: Instant) -> Result<(), ProtocolError> {
        let decoded = match self.codec.decode(bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.metrics.record_parse_errors(1);
                debug!(error = %e, len = bytes.len(), "packet rejected");
                return Err(e);
            }
        };

        self.metrics.record_packet();
        self.monitor.record_accepted(now);

        if !decoded.skipped.is_empty() {
            self.metrics.record_parse_errors(decoded.skipped.len());
            for e in &decoded.skipped {
                debug!(error = %e, "command record skipped");
            }
        }

        // Clear before admit: a stop in the same packet beats stale backlog.
        if decoded.clear {
            self.queue.clear();
        }

        let admission = self.queue.admit(decoded.commands);
        if admission.dropped > 0 {
            self.metrics.record_overflow(admission.dropped);
            debug!(
                admitted = admission.admitted,
                dropped = admission.dropped,
                capacity = self.queue.capacity(),
                "command queue overflow"
            );
        }
        Ok(())
    }

    fn fail_transport(&mut self, e: TransportError) {
        let discarded = self.queue.clear();
        error!(
            error = %e,
            transport = %self.transport.kind(),
            discarded,
            "transport failed, holding stop until it is replaced"
        );
        self.fault = Some(e);
        // Traffic from before the fault must not count once it is cleared.
        self.monitor = ConnectionMonitor::new(self.config.connection_timeout);
    }

    /// Empties the queue and drops the active command, immediately.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// The active command, if any. Does not mutate.
    pub fn active(&self) -> Option<Command> {
        self.queue.active()
    }

    /// When the active command started.
    pub fn active_since(&self) -> Option<Instant> {
        self.queue.active_since()
    }

    /// Whether a packet was accepted within the connection timeout and the
    /// transport is healthy.
    pub fn is_connected(&self, now: Instant) -> bool {
        self.fault.is_none() && self.monitor.is_connected(now)
    }

    /// Number of queued commands, not counting the active one.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The error that took the transport down, if it is down.
    pub fn transport_fault(&self) -> Option<&TransportError> {
        self.fault.as_ref()
    }

    /// Installs a replacement transport and resumes polling.
    ///
    /// Returns the fault that was cleared, if there was one. The queue and
    /// counters carry over; liveness comes back with the next accepted packet.
    pub fn restore_transport(&mut self, transport: T) -> Option<TransportError> {
        info!(transport = %transport.kind(), "transport replaced");
        self.transport = transport;
        self.fault.take()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bcnp_transport::{bus, BusSender, BusTransport};

    use super::*;

    fn engine() -> (BusSender, Engine<BusTransport>) {
        let (tx, rx) = bus(16, 1024);
        (tx, Engine::new(EngineConfig::default(), rx))
    }

    fn encode(engine: &Engine<BusTransport>, commands: &[Command]) -> Vec<u8> {
        let codec = PacketCodec::new(engine.config().protocol.clone());
        codec
            .encode(&codec.packet().with_commands(commands.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_idle_tick_reports_nothing() {
        let (_tx, mut e) = engine();
        let report = e.tick(Instant::now());
        assert_eq!(report.datagrams, 0);
        assert_eq!(report.active, None);
        assert!(!report.connected);
        assert!(report.transition.is_noop());
    }

    #[test]
    fn test_drive_command_requires_connection() {
        let cmd = Command::from_millis(1.0, 0.0, 0);
        let report = TickReport {
            active: Some(cmd),
            connected: false,
            ..TickReport::default()
        };
        assert_eq!(report.drive_command(), None);
        let report = TickReport {
            connected: true,
            ..report
        };
        assert_eq!(report.drive_command(), Some(cmd));
    }

    #[test]
    fn test_drain_is_bounded_per_tick() {
        let (tx, rx) = bus(16, 1024);
        let mut e = Engine::new(
            EngineConfig {
                max_datagrams_per_tick: 2,
                ..EngineConfig::default()
            },
            rx,
        );
        let packet = encode(&e, &[Command::from_millis(0.1, 0.0, 10)]);
        for _ in 0..3 {
            tx.try_send(packet.clone()).unwrap();
        }

        let t0 = Instant::now();
        assert_eq!(e.tick(t0).datagrams, 2);
        assert_eq!(e.tick(t0 + Duration::from_millis(1)).datagrams, 1);
        assert_eq!(e.metrics().packets_received(), 3);
    }

    #[test]
    fn test_clear_api_is_immediate() {
        let (tx, mut e) = engine();
        tx.try_send(encode(
            &e,
            &[Command::from_millis(1.0, 0.0, 0), Command::from_millis(0.5, 0.0, 0)],
        ))
        .unwrap();
        e.tick(Instant::now());
        assert!(e.active().is_some());
        assert_eq!(e.queue_len(), 1);

        e.clear();
        assert_eq!(e.active(), None);
        assert_eq!(e.queue_len(), 0);
    }
}
