//! `EngineBuilder`: configure once, then attach a transport.

use std::path::Path;
use std::time::Duration;

use bcnp_protocol::ProtocolConfig;
use bcnp_transport::{
    bus, BusSender, BusTransport, DatagramTransport, FramedStreamTransport, Transport,
};

use crate::{BcnpError, Engine, EngineConfig};

/// Builder for an [`Engine`].
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), bcnp::BcnpError> {
/// use bcnp::EngineBuilder;
/// use std::time::Duration;
///
/// let engine = EngineBuilder::new()
///     .queue_capacity(32)
///     .connection_timeout(Duration::from_millis(250))
///     .bind_udp("0.0.0.0:5808")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    /// Starts from the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads the configuration from a TOML file.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self, BcnpError> {
        self.config = EngineConfig::load(path)?;
        Ok(self)
    }

    /// Sets the accepted protocol version, caps, and clamp ranges.
    pub fn protocol(mut self, protocol: ProtocolConfig) -> Self {
        self.config.protocol = protocol;
        self
    }

    /// Sets the backlog bound.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.max_queue_capacity = capacity;
        self
    }

    /// Sets the liveness window.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Builds the engine on an existing transport.
    pub fn build<T: Transport>(self, transport: T) -> Engine<T> {
        Engine::new(self.config, transport)
    }

    /// Builds the engine on a new UDP socket bound to `addr`.
    pub async fn bind_udp(self, addr: &str) -> Result<Engine<DatagramTransport>, BcnpError> {
        let transport = DatagramTransport::bind(addr, self.config.max_packet_size).await?;
        Ok(self.build(transport))
    }

    /// Builds the engine on a framed TCP connection to `addr`.
    pub async fn connect_tcp(
        self,
        addr: &str,
    ) -> Result<Engine<FramedStreamTransport>, BcnpError> {
        let transport = FramedStreamTransport::connect(addr, self.config.max_packet_size).await?;
        Ok(self.build(transport))
    }

    /// Builds the engine on a polled-bus hand-off holding `capacity`
    /// chunks. Give the returned sender to the I/O thread.
    pub fn bus(self, capacity: usize) -> (BusSender, Engine<BusTransport>) {
        let (tx, rx) = bus(capacity, self.config.max_packet_size);
        (tx, self.build(rx))
    }
}
