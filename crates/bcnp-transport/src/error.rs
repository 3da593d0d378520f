/// Errors that can occur in the transport layer.
///
/// Every variant returned from [`Transport::try_receive`](crate::Transport::try_receive)
/// is fatal for that transport. "No data yet" is not an error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding or connecting the underlying socket failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Reading from the underlying socket failed.
    #[error("receive failed: {0}")]
    Receive(#[source] std::io::Error),

    /// The peer closed the stream.
    #[error("connection closed by peer")]
    Closed,

    /// The other end of a hand-off channel is gone.
    #[error("hand-off channel disconnected")]
    Disconnected,

    /// A frame is larger than the configured packet size. On a stream
    /// this means framing is lost.
    #[error("frame of {len} bytes exceeds maximum of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// The hand-off channel is full. Returned to the producer only; the
    /// chunk is dropped and the producer carries on.
    #[error("hand-off channel full")]
    HandoffFull,
}
