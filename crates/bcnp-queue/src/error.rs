//! Error types for the queue layer.

/// Errors that can occur when adding to the queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The backlog already holds `capacity` commands. The incoming
    /// command is the one that gets dropped.
    #[error("command queue is full (capacity {capacity})")]
    Full { capacity: usize },
}
