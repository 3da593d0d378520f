//! Length-prefixed TCP transport using `tokio::net::TcpStream`.
//!
//! TCP has no packet boundaries, so each packet is preceded by its length
//! as a big-endian `u16`:
//!
//! ```text
//! len:u16 | packet (len bytes) | len:u16 | packet | ...
//! ```
//!
//! Partial frames are buffered across calls. A frame longer than the
//! packet limit means the two ends disagree about framing; there is no
//! safe way to resynchronise, so it is reported as fatal.

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::{Transport, TransportError, TransportKind};

/// Size of the length prefix in bytes.
pub const FRAME_HEADER_SIZE: usize = 2;

/// Prepends the length prefix to `payload`.
///
/// # Errors
/// Returns [`TransportError::FrameTooLarge`] if `payload` does not fit a
/// 16-bit length.
pub fn frame(payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    let len = u16::try_from(payload.len()).map_err(|_| TransportError::FrameTooLarge {
        len: payload.len(),
        max: usize::from(u16::MAX),
    })?;
    let mut out = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// A TCP stream carrying length-prefixed packets.
#[derive(Debug)]
pub struct FramedStreamTransport {
    stream: TcpStream,
    max_packet_size: usize,
    /// Bytes read but not yet returned as a frame.
    pending: Vec<u8>,
    scratch: Vec<u8>,
}

impl FramedStreamTransport {
    /// Connects to `addr`.
    pub async fn connect(addr: &str, max_packet_size: usize) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await.map_err(TransportError::Bind)?;
        tracing::info!(addr, "framed TCP transport connected");
        Ok(Self::from_stream(stream, max_packet_size))
    }

    /// Wraps an already-established stream, e.g. one returned by
    /// `TcpListener::accept`.
    pub fn from_stream(stream: TcpStream, max_packet_size: usize) -> Self {
        // Latency matters more than throughput for drive commands.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not disable Nagle on stream");
        }
        Self {
            stream,
            max_packet_size,
            pending: Vec::with_capacity(FRAME_HEADER_SIZE + max_packet_size),
            scratch: vec![0; FRAME_HEADER_SIZE + max_packet_size],
        }
    }

    /// Address of the remote end.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Splits one complete frame off the front of `pending`, if there is one.
    fn take_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let &[hi, lo, ..] = self.pending.as_slice() else {
            return Ok(None);
        };
        let len = usize::from(u16::from_be_bytes([hi, lo]));
        if len > self.max_packet_size {
            return Err(TransportError::FrameTooLarge {
                len,
                max: self.max_packet_size,
            });
        }
        let end = FRAME_HEADER_SIZE + len;
        if self.pending.len() < end {
            return Ok(None);
        }
        let packet = self.pending[FRAME_HEADER_SIZE..end].to_vec();
        self.pending.drain(..end);
        Ok(Some(packet))
    }
}

impl Transport for FramedStreamTransport {
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            if let Some(packet) = self.take_frame()? {
                return Ok(Some(packet));
            }
            match self.stream.try_read(&mut self.scratch) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => self.pending.extend_from_slice(&self.scratch[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Receive(e)),
            }
        }
    }

    fn kind(&self) -> TransportKind {
        TransportKind::FramedStream
    }
}
