//! Engine configuration.
//!
//! Every option has a default, so a config file only needs to mention
//! what it changes:
//!
//! ```toml
//! max_queue_capacity = 16
//! connection_timeout_ms = 250
//!
//! [protocol]
//! max_commands_per_packet = 8
//!
//! [protocol.vx_bounds]
//! min = -1.0
//! max = 1.0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use bcnp_protocol::{packet_len, Bounds, ProtocolConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Errors that can occur while loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The contents are not valid TOML for [`EngineConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Everything the engine needs to know at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of queued (not yet active) commands.
    pub max_queue_capacity: usize,

    /// How long after the last accepted packet the link counts as alive.
    #[serde(rename = "connection_timeout_ms", with = "duration_ms")]
    pub connection_timeout: Duration,

    /// Largest packet a transport will hand over, in bytes.
    pub max_packet_size: usize,

    /// Upper bound on packets processed in one tick.
    pub max_datagrams_per_tick: usize,

    /// What the decoder accepts. Kept last so it serializes as a trailing
    /// TOML table.
    pub protocol: ProtocolConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            connection_timeout: Self::DEFAULT_CONNECTION_TIMEOUT,
            max_packet_size: Self::DEFAULT_MAX_PACKET_SIZE,
            max_datagrams_per_tick: Self::DEFAULT_DATAGRAMS_PER_TICK,
            protocol: ProtocolConfig::default(),
        }
    }
}

impl EngineConfig {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
    pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(200);
    pub const DEFAULT_MAX_PACKET_SIZE: usize = 1024;
    pub const DEFAULT_DATAGRAMS_PER_TICK: usize = 8;

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Replaces nonsensical values so the engine can run safely.
    ///
    /// Called automatically by [`Engine::new`](crate::Engine::new). Rules:
    /// - non-finite or inverted bounds fall back to the defaults
    /// - a zero per-packet cap, queue capacity, timeout, or per-tick
    ///   drain count falls back to the default
    /// - `max_packet_size` is raised to fit a packet at the per-packet cap
    pub fn validated(mut self) -> Self {
        let defaults = ProtocolConfig::default();
        let p = &mut self.protocol;

        if !p.vx_bounds.is_valid() {
            warn!(bounds = ?p.vx_bounds, "invalid vx bounds, using defaults");
            p.vx_bounds = defaults.vx_bounds;
        }
        if !p.omega_bounds.is_valid() {
            warn!(bounds = ?p.omega_bounds, "invalid omega bounds, using defaults");
            p.omega_bounds = defaults.omega_bounds;
        }
        if p.max_commands_per_packet == 0 {
            warn!("max_commands_per_packet is 0, using default");
            p.max_commands_per_packet = defaults.max_commands_per_packet;
        }
        if self.max_queue_capacity == 0 {
            warn!("max_queue_capacity is 0, using default");
            self.max_queue_capacity = Self::DEFAULT_QUEUE_CAPACITY;
        }
        if self.connection_timeout.is_zero() {
            warn!("connection_timeout is 0, using default");
            self.connection_timeout = Self::DEFAULT_CONNECTION_TIMEOUT;
        }
        if self.max_datagrams_per_tick == 0 {
            warn!("max_datagrams_per_tick is 0, using 1");
            self.max_datagrams_per_tick = 1;
        }

        let needed = packet_len(usize::from(self.protocol.max_commands_per_packet));
        if self.max_packet_size < needed {
            warn!(
                max_packet_size = self.max_packet_size,
                needed, "max_packet_size cannot hold a full packet, raising"
            );
            self.max_packet_size = needed;
        }
        self
    }

    /// Convenience for tests and tools: set both clamp ranges at once.
    pub fn with_bounds(mut self, vx: Bounds, omega: Bounds) -> Self {
        self.protocol.vx_bounds = vx;
        self.protocol.omega_bounds = omega;
        self
    }
}

/// Serde adapter: `Duration` as integer milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
