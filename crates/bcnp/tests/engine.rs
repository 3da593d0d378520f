//! End-to-end engine behaviour over the in-memory bus transport.
//!
//! Time is simulated: every test picks a base `Instant` and passes
//! offsets from it to `tick`, so expiry and liveness are exact.

use std::time::{Duration, Instant};

use bcnp::prelude::*;
use bcnp::transport::{bus, BusSender, BusTransport};

// =========================================================================
// Helpers
// =========================================================================

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn cmd(vx: f32, duration_ms: u16) -> Command {
    Command::from_millis(vx, 0.0, duration_ms)
}

struct Harness {
    tx: BusSender,
    engine: Engine<BusTransport>,
    codec: PacketCodec,
    t0: Instant,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        let (tx, rx) = bus(64, config.max_packet_size.max(1024));
        let engine = Engine::new(config, rx);
        let codec = PacketCodec::new(engine.config().protocol.clone());
        Self {
            tx,
            engine,
            codec,
            t0: Instant::now(),
        }
    }

    fn send_raw(&self, bytes: Vec<u8>) {
        self.tx.try_send(bytes).unwrap();
    }

    fn send(&self, commands: &[Command]) {
        let packet = self.codec.packet().with_commands(commands.iter().copied());
        self.send_raw(self.codec.encode(&packet).unwrap());
    }

    fn send_clear(&self, commands: &[Command]) {
        let packet = self
            .codec
            .packet()
            .with_clear()
            .with_commands(commands.iter().copied());
        self.send_raw(self.codec.encode(&packet).unwrap());
    }

    fn tick_at(&mut self, offset_ms: u64) -> TickReport {
        self.engine.tick(self.t0 + ms(offset_ms))
    }
}

fn raw_record(vx: f32, omega: f32, duration_ms: u16) -> Vec<u8> {
    let mut r = Vec::new();
    r.extend_from_slice(&vx.to_be_bytes());
    r.extend_from_slice(&omega.to_be_bytes());
    r.extend_from_slice(&duration_ms.to_be_bytes());
    r
}

// =========================================================================
// Concrete scenario
// =========================================================================

#[test]
fn test_two_command_packet_activates_first_immediately() {
    let mut h = Harness::new();
    let mut bytes = vec![1, 1, 0x00, 2];
    bytes.extend(raw_record(1.0, 0.0, 500));
    bytes.extend(raw_record(-1.0, 0.5, 250));
    assert_eq!(bytes.len(), 24);
    h.send_raw(bytes);

    let report = h.tick_at(0);
    assert_eq!(report.datagrams, 1);
    assert_eq!(report.accepted, 1);
    assert!(report.connected);
    assert_eq!(report.active, Some(Command::from_millis(1.0, 0.0, 500)));
    assert_eq!(h.engine.active_since(), Some(h.t0));
    // Both were admitted; one has moved into the active slot.
    assert_eq!(h.engine.queue_len(), 1);
    assert_eq!(h.engine.metrics().packets_received(), 1);
    assert_eq!(h.engine.metrics().parse_errors(), 0);
}

// =========================================================================
// Structural rejection
// =========================================================================

#[test]
fn test_structural_rejection_is_atomic() {
    let mut h = Harness::new();
    h.send(&[cmd(0.1, 0), cmd(0.2, 0)]);
    h.tick_at(0);
    let before = h.engine.metrics().snapshot();
    let backlog_before = h.engine.queue_len();
    let active_before = h.engine.active();

    // Declares 3 records, carries 2.
    let mut bytes = vec![1, 1, 0x01, 3];
    bytes.extend(raw_record(0.5, 0.0, 10));
    bytes.extend(raw_record(0.6, 0.0, 10));
    h.send_raw(bytes);

    let report = h.tick_at(10);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.accepted, 0);

    let after = h.engine.metrics().snapshot();
    assert_eq!(after.parse_errors, before.parse_errors + 1);
    assert_eq!(after.packets_received, before.packets_received);
    assert_eq!(after.queue_overflows, before.queue_overflows);
    assert_eq!(after.commands_dropped, before.commands_dropped);
    // The clear flag in the rejected packet was never honoured.
    assert_eq!(h.engine.queue_len(), backlog_before);
    assert_eq!(h.engine.active(), active_before);
}

#[test]
fn test_every_structural_error_counts_once() {
    let mut h = Harness::new();
    h.send_raw(vec![]); // truncated header
    h.send_raw(vec![2, 0, 0, 0]); // version
    h.send_raw(vec![1, 1, 0, 200]); // too many
    h.send_raw(vec![1, 1, 0, 0, 0xEE]); // trailing byte

    let report = h.tick_at(0);
    assert_eq!(report.datagrams, 4);
    assert_eq!(report.rejected, 4);
    assert_eq!(h.engine.metrics().parse_errors(), 4);
    assert_eq!(h.engine.metrics().packets_received(), 0);
    assert!(!report.connected);
}

#[test]
fn test_rejected_packet_does_not_refresh_liveness() {
    let mut h = Harness::new();
    h.send(&[]);
    assert!(h.tick_at(0).connected);

    h.send_raw(vec![9, 9, 0, 0]);
    h.tick_at(150);
    // 200ms after the only accepted packet: gone, despite the bad one at 150.
    assert!(!h.tick_at(200).connected);
}

// =========================================================================
// Partial tolerance
// =========================================================================

#[test]
fn test_one_non_finite_record_among_five() {
    let mut h = Harness::new();
    let mut bytes = vec![1, 1, 0, 5];
    bytes.extend(raw_record(0.1, 0.0, 0));
    bytes.extend(raw_record(0.2, 0.0, 0));
    bytes.extend(raw_record(f32::NAN, 0.0, 0));
    bytes.extend(raw_record(0.4, 0.0, 0));
    bytes.extend(raw_record(0.5, 0.0, 0));
    h.send_raw(bytes);

    let report = h.tick_at(0);
    assert_eq!(report.accepted, 1);
    assert!(report.connected);
    // Four admitted: one active, three waiting.
    assert_eq!(report.active.map(|c| c.vx), Some(0.1));
    assert_eq!(h.engine.queue_len(), 3);
    assert_eq!(h.engine.metrics().parse_errors(), 1);
    assert_eq!(h.engine.metrics().packets_received(), 1);
}

#[test]
fn test_out_of_range_values_clamped_on_admission() {
    let mut h = Harness::new();
    h.send(&[Command::from_millis(99.0, -99.0, 0)]);
    let active = h.tick_at(0).active.unwrap();
    assert_eq!(active.vx, 1.5);
    assert_eq!(active.omega, -2.5);
}

// =========================================================================
// Clear precedence
// =========================================================================

#[test]
fn test_clear_flag_discards_backlog_and_active_before_admitting() {
    let mut h = Harness::new();
    h.send(&[cmd(1.0, 0), cmd(0.2, 0), cmd(0.3, 0)]);
    h.tick_at(0);
    assert_eq!(h.engine.active().map(|c| c.vx), Some(1.0));

    h.send_clear(&[cmd(0.7, 100), cmd(0.8, 100)]);
    let report = h.tick_at(20);

    assert_eq!(report.active.map(|c| c.vx), Some(0.7));
    assert_eq!(h.engine.active_since(), Some(h.t0 + ms(20)));
    assert_eq!(h.engine.queue_len(), 1);

    // 0.7 expires, 0.8 runs, then nothing. The old commands are gone.
    assert_eq!(h.tick_at(120).active.map(|c| c.vx), Some(0.8));
    assert_eq!(h.tick_at(220).active, None);
}

#[test]
fn test_clear_only_packet_stops_immediately() {
    let mut h = Harness::new();
    h.send(&[cmd(1.0, 0)]);
    h.tick_at(0);
    h.send_clear(&[]);
    let report = h.tick_at(20);
    assert_eq!(report.active, None);
    assert!(report.connected);
}

#[test]
fn test_clear_in_later_packet_same_tick() {
    let mut h = Harness::new();
    h.send(&[cmd(1.0, 0), cmd(0.2, 0)]);
    h.send_clear(&[cmd(0.5, 0)]);
    let report = h.tick_at(0);
    assert_eq!(report.datagrams, 2);
    assert_eq!(report.active.map(|c| c.vx), Some(0.5));
    assert_eq!(h.engine.queue_len(), 0);
}

// =========================================================================
// Expiry and promotion
// =========================================================================

#[test]
fn test_expire_then_promote_with_fresh_start_time() {
    let mut h = Harness::new();
    h.send(&[cmd(1.0, 100), cmd(0.5, 100)]);
    h.tick_at(0);

    assert_eq!(h.tick_at(50).active.map(|c| c.vx), Some(1.0));

    let report = h.tick_at(150);
    assert_eq!(report.active.map(|c| c.vx), Some(0.5));
    assert_eq!(report.transition.expired.map(|c| c.vx), Some(1.0));
    assert_eq!(report.transition.promoted.map(|c| c.vx), Some(0.5));
    assert_eq!(h.engine.active_since(), Some(h.t0 + ms(150)));
}

#[test]
fn test_command_expires_without_traffic() {
    let mut h = Harness::new();
    h.send(&[cmd(1.0, 40)]);
    h.tick_at(0);
    for t in [20, 39] {
        assert!(h.tick_at(t).active.is_some());
    }
    let report = h.tick_at(40);
    assert_eq!(report.datagrams, 0);
    assert_eq!(report.active, None);
}

#[test]
fn test_zero_duration_held_until_replaced_by_clear() {
    let mut h = Harness::new();
    h.send(&[cmd(1.0, 0), cmd(0.2, 0)]);
    h.tick_at(0);
    // Keep the link alive with empty packets; the hold command stays.
    for t in (100..=1000).step_by(100) {
        h.send(&[]);
        assert_eq!(h.tick_at(t).active.map(|c| c.vx), Some(1.0));
    }
    h.send_clear(&[cmd(0.3, 0)]);
    assert_eq!(h.tick_at(1100).active.map(|c| c.vx), Some(0.3));
}

// =========================================================================
// Overflow
// =========================================================================

#[test]
fn test_overflow_drops_newest_and_keeps_order() {
    let mut h = Harness::with_config(EngineConfig {
        max_queue_capacity: 4,
        ..EngineConfig::default()
    });
    let batch: Vec<Command> = (0..5).map(|i| cmd(i as f32 * 0.25, 10)).collect();
    h.send(&batch);

    let report = h.tick_at(0);
    assert_eq!(report.accepted, 1);
    assert_eq!(h.engine.metrics().queue_overflows(), 1);
    assert_eq!(h.engine.metrics().commands_dropped(), 1);

    // Exactly the first four run, in order.
    let mut seen = vec![report.active.map(|c| c.vx)];
    for t in [10, 20, 30, 40] {
        seen.push(h.tick_at(t).active.map(|c| c.vx));
    }
    assert_eq!(seen, vec![Some(0.0), Some(0.25), Some(0.5), Some(0.75), None]);
}

#[test]
fn test_overflow_across_packets() {
    let mut h = Harness::with_config(EngineConfig {
        max_queue_capacity: 2,
        ..EngineConfig::default()
    });
    h.send(&[cmd(0.1, 0), cmd(0.2, 0)]);
    h.send(&[cmd(0.3, 0), cmd(0.4, 0)]);
    h.tick_at(0);
    // Both packets admitted before the single promotion: two dropped.
    assert_eq!(h.engine.metrics().queue_overflows(), 2);
    assert_eq!(h.engine.active().map(|c| c.vx), Some(0.1));
    assert_eq!(h.engine.queue_len(), 1);
}

// =========================================================================
// Liveness
// =========================================================================

#[test]
fn test_liveness_lifecycle() {
    let mut h = Harness::new();
    assert!(!h.engine.is_connected(h.t0));
    assert!(!h.tick_at(0).connected);

    h.send(&[]);
    assert!(h.tick_at(10).connected);
    assert!(h.engine.is_connected(h.t0 + ms(209)));
    assert!(!h.engine.is_connected(h.t0 + ms(210)));
    assert!(!h.tick_at(210).connected);
}

#[test]
fn test_disconnect_hides_active_command_from_drive() {
    let mut h = Harness::new();
    h.send(&[cmd(1.0, 0)]);
    assert!(h.tick_at(0).drive_command().is_some());

    let report = h.tick_at(500);
    assert!(report.active.is_some());
    assert!(!report.connected);
    assert_eq!(report.drive_command(), None);
}

// =========================================================================
// Transport faults
// =========================================================================

#[test]
fn test_transport_fault_forces_safe_stop_until_replaced() {
    let Harness {
        tx,
        mut engine,
        codec,
        t0,
    } = Harness::new();
    let packet = codec.packet().with_commands([cmd(1.0, 0), cmd(0.2, 0)]);
    tx.try_send(codec.encode(&packet).unwrap()).unwrap();
    assert!(engine.tick(t0).connected);

    // The I/O side goes away: the bus reports Disconnected.
    drop(tx);
    let report = engine.tick(t0 + ms(20));
    assert!(report.transport_faulted);
    assert!(!report.connected);
    assert_eq!(report.active, None);
    assert_eq!(engine.queue_len(), 0);
    assert!(matches!(
        engine.transport_fault(),
        Some(TransportError::Disconnected)
    ));

    // Faulted transports are not polled again.
    assert!(engine.tick(t0 + ms(40)).transport_faulted);

    let (new_tx, new_rx) = bus(4, 1024);
    let cleared = engine.restore_transport(new_rx);
    assert!(matches!(cleared, Some(TransportError::Disconnected)));
    let packet = codec.packet().with_command(cmd(0.5, 0));
    new_tx.try_send(codec.encode(&packet).unwrap()).unwrap();

    let report = engine.tick(t0 + ms(60));
    assert!(!report.transport_faulted);
    assert!(report.connected);
    assert_eq!(report.active.map(|c| c.vx), Some(0.5));
}

#[test]
fn test_restored_transport_needs_fresh_traffic_to_connect() {
    let Harness {
        tx,
        mut engine,
        codec,
        t0,
    } = Harness::new();
    let packet = codec.packet().with_command(cmd(0.5, 0));
    tx.try_send(codec.encode(&packet).unwrap()).unwrap();
    assert!(engine.tick(t0).connected);

    drop(tx);
    assert!(engine.tick(t0 + ms(20)).transport_faulted);
    assert_eq!(engine.monitor().last_accepted(), None);

    let (_new_tx, new_rx) = bus(4, 1024);
    engine.restore_transport(new_rx);

    // Well inside the timeout of the pre-fault packet, but nothing new arrived.
    let report = engine.tick(t0 + ms(40));
    assert_eq!(report.accepted, 0);
    assert!(!report.transport_faulted);
    assert!(!report.connected);
    assert!(!engine.is_connected(t0 + ms(40)));
}

// =========================================================================
// Metrics export
// =========================================================================

#[test]
fn test_metrics_snapshot_json() {
    let mut h = Harness::new();
    h.send(&[cmd(0.1, 0)]);
    h.send_raw(vec![0]);
    h.tick_at(0);

    let json = serde_json::to_string(&h.engine.metrics().snapshot()).unwrap();
    assert_eq!(
        json,
        r#"{"packets_received":1,"parse_errors":1,"queue_overflows":0,"commands_dropped":0}"#
    );
}
