//! Wire protocol for BCNP.
//!
//! This crate defines what travels from the host to the robot:
//!
//! - **Types** ([`Command`], [`Packet`], [`DecodedPacket`], [`Bounds`]):
//!   the values carried by a packet.
//! - **Codec** ([`PacketCodec`]): how packets are validated and turned
//!   into commands (and back into bytes for senders and tests).
//! - **Errors** ([`ProtocolError`]): why a packet or a single record
//!   was refused.
//!
//! # Wire format
//!
//! All multi-byte values are big-endian.
//!
//! ```text
//! header (4 bytes):   major:u8 | minor:u8 | flags:u8 | count:u8
//! record (10 bytes):  vx:f32 | omega:f32 | duration_ms:u16
//! ```
//!
//! `flags` bit 0 asks the receiver to clear its queue before admitting
//! the packet's commands. A packet is exactly `4 + 10 * count` bytes.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the command
//! queue. It has no notion of time or connection state; decoding is a
//! pure function of the bytes and the [`ProtocolConfig`].
//!
//! ```text
//! Transport (bytes) → Protocol (DecodedPacket) → Queue (active command)
//! ```

mod codec;
mod config;
mod error;
mod types;

pub use codec::{packet_len, PacketCodec};
pub use config::ProtocolConfig;
pub use error::ProtocolError;
pub use types::{Bounds, Command, DecodedPacket, Packet};

/// Size of the fixed packet header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Size of one encoded command record in bytes.
pub const COMMAND_RECORD_SIZE: usize = 10;

/// `flags` bit requesting an immediate queue clear.
pub const FLAG_CLEAR_QUEUE: u8 = 0x01;
