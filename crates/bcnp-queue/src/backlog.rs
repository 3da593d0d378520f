//! Bounded FIFO of commands waiting to become active.

use std::collections::VecDeque;

use bcnp_protocol::Command;

use crate::QueueError;

/// A bounded, insertion-ordered sequence of commands.
///
/// The buffer is allocated once at its full capacity and never grows.
#[derive(Debug, Clone)]
pub struct Backlog {
    items: VecDeque<Command>,
    capacity: usize,
}

impl Backlog {
    /// Creates an empty backlog that holds at most `capacity` commands.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a command at the back.
    ///
    /// # Errors
    /// Returns [`QueueError::Full`] if the backlog is at capacity. The
    /// backlog is left untouched; already-queued commands are never evicted.
    pub fn push(&mut self, command: Command) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        self.items.push_back(command);
        Ok(())
    }

    /// Removes and returns the oldest command.
    pub fn pop_front(&mut self) -> Option<Command> {
        self.items.pop_front()
    }

    /// The oldest command, without removing it.
    pub fn front(&self) -> Option<&Command> {
        self.items.front()
    }

    /// Drops every queued command. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.items.iter()
    }
}
