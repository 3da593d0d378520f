//! Packet codec: bytes to validated commands, and back.
//!
//! Decoding is defensive. The input comes straight off an unreliable,
//! unauthenticated link, so every length is checked before it is used
//! and every float is checked before it reaches the queue.
//!
//! # Validation order
//!
//! The checks run in a fixed order and stop at the first structural
//! failure:
//!
//! 1. at least a full header is present (`Truncated`)
//! 2. major/minor match exactly (`VersionMismatch`)
//! 3. the declared count is within the per-packet cap (`TooManyCommands`)
//! 4. the buffer holds every declared record (`Truncated`)
//! 5. nothing follows the last record (`TrailingBytes`)
//!
//! Only then are the flags read and the records decoded. A record with a
//! NaN or infinite value is skipped on its own (`NonFiniteValue`); the
//! rest of the packet still goes through. Finite values outside the
//! configured bounds are clamped, not rejected.

use std::time::Duration;

use crate::{
    Command, DecodedPacket, Packet, ProtocolConfig, ProtocolError, COMMAND_RECORD_SIZE,
    FLAG_CLEAR_QUEUE, HEADER_SIZE,
};

/// Total encoded length of a packet carrying `count` records.
pub const fn packet_len(count: usize) -> usize {
    HEADER_SIZE + count * COMMAND_RECORD_SIZE
}

/// Encodes and decodes BCNP packets against a fixed [`ProtocolConfig`].
///
/// ## Example
///
/// ```rust
/// use bcnp_protocol::{Command, PacketCodec, ProtocolConfig};
///
/// let codec = PacketCodec::new(ProtocolConfig::default());
///
/// let packet = codec
///     .packet()
///     .with_command(Command::from_millis(1.0, 0.0, 500))
///     .with_command(Command::from_millis(-1.0, 0.5, 250));
///
/// let bytes = codec.encode(&packet).unwrap();
/// assert_eq!(bytes.len(), 24);
///
/// let decoded = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded.commands, packet.commands);
/// assert!(!decoded.clear);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PacketCodec {
    config: ProtocolConfig,
}

impl PacketCodec {
    /// Creates a codec that accepts packets matching `config`.
    ///
    /// A clamp range that is inverted or not finite cannot hold the
    /// "result lies in `[min, max]`" guarantee, so it is replaced by the
    /// default range for that axis.
    pub fn new(mut config: ProtocolConfig) -> Self {
        let defaults = ProtocolConfig::default();
        if !config.vx_bounds.is_valid() {
            config.vx_bounds = defaults.vx_bounds;
        }
        if !config.omega_bounds.is_valid() {
            config.omega_bounds = defaults.omega_bounds;
        }
        Self { config }
    }

    /// The configuration this codec validates against.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// An empty outgoing packet stamped with this codec's version.
    pub fn packet(&self) -> Packet {
        Packet::new(self.config.major, self.config.minor)
    }

    /// Decodes one packet.
    ///
    /// # Errors
    /// Returns a structural [`ProtocolError`] if the packet as a whole is
    /// malformed. In that case nothing from the packet may be used.
    /// Per-record problems do not fail the call; they are reported in
    /// [`DecodedPacket::skipped`].
    pub fn decode(&self, data: &[u8]) -> Result<DecodedPacket, ProtocolError> {
        let &[major, minor, flags, count, ..] = data else {
            return Err(ProtocolError::Truncated {
                needed: HEADER_SIZE,
                actual: data.len(),
            });
        };

        if (major, minor) != self.config.version() {
            return Err(ProtocolError::VersionMismatch {
                expected: self.config.version(),
                actual: (major, minor),
            });
        }

        let count = usize::from(count);
        let max = usize::from(self.config.max_commands_per_packet);
        if count > max {
            return Err(ProtocolError::TooManyCommands { count, max });
        }

        let expected = packet_len(count);
        if data.len() < expected {
            return Err(ProtocolError::Truncated {
                needed: expected,
                actual: data.len(),
            });
        }
        if data.len() > expected {
            return Err(ProtocolError::TrailingBytes {
                expected,
                actual: data.len(),
            });
        }

        // Structure is sound from here on; nothing below can reject the packet.
        let mut decoded = DecodedPacket {
            clear: flags & FLAG_CLEAR_QUEUE != 0,
            commands: Vec::with_capacity(count),
            skipped: Vec::new(),
        };

        let records = data[HEADER_SIZE..].chunks_exact(COMMAND_RECORD_SIZE);
        for (index, record) in records.enumerate() {
            match self.decode_record(index, record) {
                Ok(command) => decoded.commands.push(command),
                Err(e) => decoded.skipped.push(e),
            }
        }

        Ok(decoded)
    }

    /// Encodes a packet into its wire form.
    ///
    /// The encoder writes whatever it is given, including non-finite or
    /// out-of-bounds values, so it can also be used to build hostile
    /// input. Only the constraints of the wire format itself are checked.
    ///
    /// # Errors
    /// - [`ProtocolError::TooManyCommands`] if there are more than 255 commands.
    /// - [`ProtocolError::DurationOutOfRange`] if a duration exceeds 65 535 ms.
    pub fn encode(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
        let count = u8::try_from(packet.commands.len()).map_err(|_| {
            ProtocolError::TooManyCommands {
                count: packet.commands.len(),
                max: usize::from(u8::MAX),
            }
        })?;

        let flags = if packet.clear { FLAG_CLEAR_QUEUE } else { 0 };
        let mut buf = Vec::with_capacity(packet_len(packet.commands.len()));
        buf.extend_from_slice(&[packet.major, packet.minor, flags, count]);

        for (index, command) in packet.commands.iter().enumerate() {
            let millis = command.duration.as_millis();
            let duration_ms = u16::try_from(millis)
                .map_err(|_| ProtocolError::DurationOutOfRange { index, millis })?;
            buf.extend_from_slice(&command.vx.to_be_bytes());
            buf.extend_from_slice(&command.omega.to_be_bytes());
            buf.extend_from_slice(&duration_ms.to_be_bytes());
        }

        Ok(buf)
    }

    /// Decodes one 10-byte record. `record` is always exactly
    /// [`COMMAND_RECORD_SIZE`] long (guaranteed by `chunks_exact`).
    fn decode_record(&self, index: usize, record: &[u8]) -> Result<Command, ProtocolError> {
        let vx = f32::from_be_bytes([record[0], record[1], record[2], record[3]]);
        let omega = f32::from_be_bytes([record[4], record[5], record[6], record[7]]);
        let duration_ms = u16::from_be_bytes([record[8], record[9]]);

        if !vx.is_finite() || !omega.is_finite() {
            return Err(ProtocolError::NonFiniteValue { index });
        }

        Ok(Command {
            vx: self.config.vx_bounds.clamp(vx),
            omega: self.config.omega_bounds.clamp(omega),
            duration: Duration::from_millis(u64::from(duration_ms)),
        })
    }
}
