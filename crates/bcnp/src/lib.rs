//! # BCNP
//!
//! Loss-tolerant drive command delivery for a real-time robot control loop.
//!
//! A host streams small binary packets of timed velocity commands. The
//! link may drop, duplicate, reorder, or corrupt them. Once per control
//! cycle the [`Engine`] pulls whatever has arrived, validates it, queues
//! the commands, and tells the loop which single command is active right
//! now and whether the link is still alive.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Instant;
//! use bcnp::prelude::*;
//!
//! let (tx, mut engine) = EngineBuilder::new().bus(16);
//!
//! let codec = PacketCodec::new(engine.config().protocol.clone());
//! let packet = codec.packet().with_command(Command::from_millis(1.0, 0.0, 500));
//! tx.try_send(codec.encode(&packet).unwrap()).unwrap();
//!
//! let report = engine.tick(Instant::now());
//! assert!(report.connected);
//! assert_eq!(report.active.map(|c| c.vx), Some(1.0));
//! ```
//!
//! The consumer contract is simple: when [`TickReport::drive_command`]
//! is `None`, command a zero-output stop. The engine never invents a
//! command on its own.

mod builder;
mod config;
mod engine;
mod error;
mod metrics;
mod monitor;

pub use builder::EngineBuilder;
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, TickReport};
pub use error::BcnpError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use monitor::ConnectionMonitor;

pub use bcnp_protocol as protocol;
pub use bcnp_queue as queue;
pub use bcnp_transport as transport;

pub mod prelude {
    pub use crate::{
        BcnpError, ConnectionMonitor, Engine, EngineBuilder, EngineConfig, MetricsSnapshot,
        TickReport,
    };
    pub use bcnp_protocol::{Bounds, Command, PacketCodec, ProtocolConfig, ProtocolError};
    pub use bcnp_transport::{Transport, TransportError, TransportKind};
}
