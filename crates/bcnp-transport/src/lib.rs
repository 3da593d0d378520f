//! Transport abstraction layer for BCNP.
//!
//! The engine never talks to a socket or a bus directly. It asks a
//! [`Transport`] for the next packet, once or a few times per control
//! tick, and the transport answers immediately: a packet, nothing yet, or
//! a fatal failure.
//!
//! Three adapters cover the links the robot has used:
//!
//! - [`DatagramTransport`]: one UDP datagram is one packet
//! - [`FramedStreamTransport`]: TCP with a 2-byte length prefix per packet
//! - [`BusTransport`]: a bounded hand-off from an I/O thread that polls a
//!   serial bus (or anything else that produces byte chunks)
//!
//! # Feature Flags
//!
//! - `net` (default): UDP and TCP adapters via `tokio::net`

mod bus;
mod error;
#[cfg(feature = "net")]
mod datagram;
#[cfg(feature = "net")]
mod stream;

pub use bus::{bus, BusSender, BusTransport};
#[cfg(feature = "net")]
pub use datagram::DatagramTransport;
pub use error::TransportError;
#[cfg(feature = "net")]
pub use stream::{frame, FramedStreamTransport, FRAME_HEADER_SIZE};

use std::fmt;

/// The family a transport belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Packet boundaries come from the link (UDP).
    Datagram,
    /// Packet boundaries come from a length prefix on a byte stream (TCP).
    FramedStream,
    /// Packets are handed over by a separate I/O thread.
    PolledBus,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Datagram => write!(f, "datagram"),
            Self::FramedStream => write!(f, "framed-stream"),
            Self::PolledBus => write!(f, "polled-bus"),
        }
    }
}

/// A non-blocking source of raw packets.
///
/// `try_receive` must never wait. "Nothing available right now" is
/// `Ok(None)` and is routine; an `Err` means the transport is broken and
/// will not recover on its own. Callers do not retry a failed transport,
/// they replace it.
pub trait Transport: Send + 'static {
    /// Returns the next whole packet, if one is ready.
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Which family of link this is.
    fn kind(&self) -> TransportKind;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        (**self).try_receive()
    }

    fn kind(&self) -> TransportKind {
        (**self).kind()
    }
}
