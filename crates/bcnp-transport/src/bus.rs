//! Polled-bus hand-off.
//!
//! Some links (SPI, serial) have to be polled by a dedicated I/O thread.
//! That thread must not touch the engine. It pushes raw chunks into a
//! bounded channel with [`BusSender::try_send`], and the control tick
//! pulls them out through [`BusTransport`]. If the tick falls behind, the
//! producer gets [`TransportError::HandoffFull`] instead of blocking.
//!
//! The same pair doubles as an in-memory transport for tests.

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use crate::{Transport, TransportError, TransportKind};

/// Creates a hand-off channel holding at most `capacity` chunks of at
/// most `max_packet_size` bytes each.
pub fn bus(capacity: usize, max_packet_size: usize) -> (BusSender, BusTransport) {
    // A zero-capacity tokio channel panics; one slot is the floor.
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        BusSender {
            tx,
            max_packet_size,
        },
        BusTransport { rx },
    )
}

/// Producer half, owned by the I/O thread. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BusSender {
    tx: mpsc::Sender<Vec<u8>>,
    max_packet_size: usize,
}

impl BusSender {
    /// Hands one chunk to the control tick without blocking.
    ///
    /// # Errors
    /// - [`TransportError::FrameTooLarge`] if the chunk exceeds the packet size.
    /// - [`TransportError::HandoffFull`] if the tick has not caught up.
    /// - [`TransportError::Disconnected`] if the receiving side was dropped.
    pub fn try_send(&self, chunk: Vec<u8>) -> Result<(), TransportError> {
        if chunk.len() > self.max_packet_size {
            return Err(TransportError::FrameTooLarge {
                len: chunk.len(),
                max: self.max_packet_size,
            });
        }
        self.tx.try_send(chunk).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::HandoffFull,
            TrySendError::Closed(_) => TransportError::Disconnected,
        })
    }

    /// Returns `true` if the receiving side was dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, polled by the engine.
#[derive(Debug)]
pub struct BusTransport {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl Transport for BusTransport {
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.rx.try_recv() {
            Ok(chunk) => Ok(Some(chunk)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    fn kind(&self) -> TransportKind {
        TransportKind::PolledBus
    }
}
