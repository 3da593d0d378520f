//! A 50 Hz drive loop fed over UDP.
//!
//! Usage: `udp-drive [engine.toml]`
//!
//! Binds the engine on 127.0.0.1:5808, starts a synthetic host that
//! streams short command batches at it, and prints what the drivetrain
//! would be told each tick. Set `RUST_LOG=debug` to see admissions and
//! rejections. Ctrl-C stops.

use std::net::SocketAddr;
use std::time::Duration;

use bcnp::prelude::*;
use bcnp_tick::{TickConfig, TickScheduler};
use tokio::net::UdpSocket;
use tracing::{info, warn};

const BIND_ADDR: &str = "127.0.0.1:5808";
const METRICS_EVERY: u64 = 250;

// ---------------------------------------------------------------------------
// Drivetrain stand-in
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Drivetrain {
    last: Option<Command>,
}

impl Drivetrain {
    /// Applies the tick's verdict. `None` is a zero-output stop.
    fn apply(&mut self, command: Option<Command>) {
        if command == self.last {
            return;
        }
        match command {
            Some(c) => info!(vx = c.vx, omega = c.omega, "drive"),
            None => info!("stop"),
        }
        self.last = command;
    }
}

// ---------------------------------------------------------------------------
// Synthetic host
// ---------------------------------------------------------------------------

/// Sends a batch every 100 ms, with a stop-and-replace every tenth batch
/// and a garbage datagram every seventh.
async fn run_host(target: SocketAddr, codec: PacketCodec) -> Result<(), BcnpError> {
    let socket = UdpSocket::bind("127.0.0.1:0")
        .await
        .map_err(TransportError::Bind)?;
    let mut interval = tokio::time::interval(Duration::from_millis(100));

    for n in 0u64.. {
        interval.tick().await;

        let speed = 0.25 * (n % 5) as f32;
        let mut packet = codec
            .packet()
            .with_command(Command::from_millis(speed, 0.0, 60))
            .with_command(Command::from_millis(speed, 0.5, 60));
        if n % 10 == 9 {
            packet = packet.with_clear();
        }
        let bytes = codec.encode(&packet)?;

        if let Err(e) = socket.send_to(&bytes, target).await {
            warn!(error = %e, "host send failed");
        }
        if n % 7 == 6 {
            if let Err(e) = socket.send_to(&[0xFF, 0x00], target).await {
                warn!(error = %e, "host garbage send failed");
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Control loop
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("udp_drive=info".parse()?),
        )
        .init();

    let mut builder = EngineBuilder::new();
    if let Some(path) = std::env::args().nth(1) {
        builder = builder.config_file(&path)?;
        info!(%path, "loaded engine config");
    }
    let mut engine = builder.bind_udp(BIND_ADDR).await?;
    let target = engine.transport().local_addr()?;
    info!(%target, "listening for command packets");

    let codec = PacketCodec::new(engine.config().protocol.clone());
    tokio::spawn(async move {
        if let Err(e) = run_host(target, codec).await {
            warn!(error = %e, "synthetic host stopped");
        }
    });

    let mut scheduler = TickScheduler::new(TickConfig::default());
    let mut drivetrain = Drivetrain::default();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            info = scheduler.wait_for_tick() => {
                let report = engine.tick(info.now);
                drivetrain.apply(report.drive_command());

                if info.tick % METRICS_EVERY == 0 {
                    let snapshot = serde_json::to_string(&engine.metrics().snapshot())?;
                    info!(tick = info.tick, connected = report.connected, metrics = %snapshot);
                }
                scheduler.record_tick_end();
            }
            _ = &mut shutdown => break,
        }
    }

    drivetrain.apply(None);
    let m = scheduler.metrics();
    info!(
        ticks = m.ticks,
        overruns = m.overruns,
        budget_exceeded = m.budget_exceeded,
        "control loop stopped"
    );
    Ok(())
}
