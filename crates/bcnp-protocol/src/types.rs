//! Values carried by a BCNP packet.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A single timed drive command.
///
/// `vx` is forward velocity (m/s) and `omega` is angular velocity (rad/s).
/// Once a command has come out of [`PacketCodec::decode`](crate::PacketCodec::decode)
/// both are finite and inside the configured [`Bounds`].
///
/// A zero `duration` means "hold until replaced": the command never
/// expires on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub vx: f32,
    pub omega: f32,
    pub duration: Duration,
}

impl Command {
    /// Creates a command.
    pub fn new(vx: f32, omega: f32, duration: Duration) -> Self {
        Self { vx, omega, duration }
    }

    /// Shorthand for a command whose duration is given in milliseconds,
    /// which is the resolution used on the wire.
    pub fn from_millis(vx: f32, omega: f32, duration_ms: u16) -> Self {
        Self::new(vx, omega, Duration::from_millis(u64::from(duration_ms)))
    }

    /// Returns `true` if this command persists until it is replaced.
    pub fn is_persistent(&self) -> bool {
        self.duration.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Inclusive clamp range for one command axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    /// Creates a range from `min` to `max`.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A range centred on zero: `-limit..=limit`.
    pub const fn symmetric(limit: f32) -> Self {
        Self { min: -limit, max: limit }
    }

    /// Clamps `value` into the range.
    ///
    /// Unlike [`f32::clamp`] this never panics, even if the range itself
    /// is malformed; `max` wins when the bounds cross.
    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }

    /// Returns `true` if both ends are finite and `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Returns `true` if `value` lies inside the range.
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

// ---------------------------------------------------------------------------
// Packets
// ---------------------------------------------------------------------------

/// An outgoing packet, as built by a sender.
///
/// The receiving side never sees this type; it gets a [`DecodedPacket`]
/// instead, which has already been validated against its own config.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub major: u8,
    pub minor: u8,
    pub clear: bool,
    pub commands: Vec<Command>,
}

impl Packet {
    /// Creates an empty packet for the given protocol version.
    pub fn new(major: u8, minor: u8) -> Self {
        Self {
            major,
            minor,
            clear: false,
            commands: Vec::new(),
        }
    }

    /// Sets the clear-queue flag.
    pub fn with_clear(mut self) -> Self {
        self.clear = true;
        self
    }

    /// Appends one command.
    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Appends several commands, preserving their order.
    pub fn with_commands(mut self, commands: impl IntoIterator<Item = Command>) -> Self {
        self.commands.extend(commands);
        self
    }
}

/// The result of successfully decoding a packet.
///
/// `commands` holds the records that survived validation, in wire order.
/// `skipped` holds one soft error per record that did not.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedPacket {
    pub clear: bool,
    pub commands: Vec<Command>,
    pub skipped: Vec<crate::ProtocolError>,
}
