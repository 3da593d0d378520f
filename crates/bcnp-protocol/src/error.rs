//! Error types for the protocol layer.
//!
//! Protocol errors come in two weights. A *structural* error means the
//! packet as a whole cannot be trusted, so nothing in it is admitted. A
//! *soft* error only concerns one command record; its siblings in the same
//! packet are still decoded.

/// Errors that can occur while decoding or encoding a packet.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    /// The buffer is shorter than the header, or shorter than the
    /// header plus the declared number of records.
    #[error("truncated packet: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    /// The packet's major/minor version is not the one we accept.
    /// Patch versions are never transmitted.
    #[error("protocol version mismatch: expected {expected:?}, got {actual:?}")]
    VersionMismatch { expected: (u8, u8), actual: (u8, u8) },

    /// The header declares more records than one packet may carry.
    #[error("too many commands in packet: {count} (max {max})")]
    TooManyCommands { count: usize, max: usize },

    /// Bytes remain after the last declared record.
    #[error("packet length mismatch: expected {expected} bytes, got {actual}")]
    TrailingBytes { expected: usize, actual: usize },

    /// A record carried NaN or infinity. Only that record is skipped.
    #[error("command {index} has a non-finite value")]
    NonFiniteValue { index: usize },

    /// A command's duration does not fit the 16-bit millisecond field.
    #[error("command {index} duration {millis}ms exceeds {max}ms", max = u16::MAX)]
    DurationOutOfRange { index: usize, millis: u128 },
}

impl ProtocolError {
    /// Returns `true` if this error discards the whole packet.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::VersionMismatch { .. }
                | Self::TooManyCommands { .. }
                | Self::TrailingBytes { .. }
        )
    }
}
