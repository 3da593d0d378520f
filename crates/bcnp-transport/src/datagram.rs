//! UDP datagram transport using `tokio::net::UdpSocket`.
//!
//! Binding is async; receiving is not. [`Transport::try_receive`] uses
//! `try_recv_from`, which returns `WouldBlock` instead of waiting, so the
//! socket can be polled from a synchronous control tick that runs inside
//! a Tokio runtime.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::{Transport, TransportError, TransportKind};

/// A UDP socket where each datagram is one packet.
#[derive(Debug)]
pub struct DatagramTransport {
    socket: UdpSocket,
    /// One byte larger than the packet limit, so an oversized datagram
    /// arrives visibly too long instead of silently cut to a valid length.
    buf: Vec<u8>,
    last_peer: Option<SocketAddr>,
}

impl DatagramTransport {
    /// Binds a UDP socket to `addr`.
    pub async fn bind(addr: &str, max_packet_size: usize) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr).await.map_err(TransportError::Bind)?;
        tracing::info!(addr, max_packet_size, "UDP transport listening");
        Ok(Self::from_socket(socket, max_packet_size))
    }

    /// Wraps an already-bound socket.
    pub fn from_socket(socket: UdpSocket, max_packet_size: usize) -> Self {
        Self {
            socket,
            buf: vec![0; max_packet_size + 1],
            last_peer: None,
        }
    }

    /// The local address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Source address of the most recent datagram.
    pub fn last_peer(&self) -> Option<SocketAddr> {
        self.last_peer
    }
}

impl Transport for DatagramTransport {
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.socket.try_recv_from(&mut self.buf) {
                Ok((n, peer)) => {
                    self.last_peer = Some(peer);
                    tracing::trace!(%peer, len = n, "datagram received");
                    return Ok(Some(self.buf[..n].to_vec()));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                // ICMP port-unreachable from an earlier send surfaces here on
                // some platforms. It says nothing about incoming traffic.
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused
                    || e.kind() == io::ErrorKind::ConnectionReset =>
                {
                    tracing::debug!(error = %e, "ignoring ICMP error on UDP socket");
                    return Ok(None);
                }
                Err(e) => return Err(TransportError::Receive(e)),
            }
        }
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Datagram
    }
}
