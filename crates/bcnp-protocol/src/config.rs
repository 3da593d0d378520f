//! Protocol configuration.

use serde::{Deserialize, Serialize};

use crate::Bounds;

/// What the decoder accepts.
///
/// Loaded once at startup as part of the engine configuration; every
/// field has a default taken from the drivetrain's physical limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Accepted major version. Must match exactly.
    pub major: u8,

    /// Accepted minor version. Must match exactly.
    pub minor: u8,

    /// Structural cap on records per packet.
    pub max_commands_per_packet: u8,

    /// Clamp range for forward velocity (m/s).
    pub vx_bounds: Bounds,

    /// Clamp range for angular velocity (rad/s).
    pub omega_bounds: Bounds,
}

impl ProtocolConfig {
    /// Default accepted version.
    pub const DEFAULT_VERSION: (u8, u8) = (1, 1);

    /// Default cap on records per packet.
    pub const DEFAULT_MAX_COMMANDS: u8 = 32;

    /// Default forward speed limit (m/s).
    pub const DEFAULT_MAX_SPEED: f32 = 1.5;

    /// Default turn rate limit (rad/s).
    pub const DEFAULT_MAX_ANGULAR_SPEED: f32 = 2.5;

    /// The version as a `(major, minor)` pair.
    pub fn version(&self) -> (u8, u8) {
        (self.major, self.minor)
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            major: Self::DEFAULT_VERSION.0,
            minor: Self::DEFAULT_VERSION.1,
            max_commands_per_packet: Self::DEFAULT_MAX_COMMANDS,
            vx_bounds: Bounds::symmetric(Self::DEFAULT_MAX_SPEED),
            omega_bounds: Bounds::symmetric(Self::DEFAULT_MAX_ANGULAR_SPEED),
        }
    }
}
