//! Command queue for BCNP.
//!
//! Decoded commands wait in a bounded FIFO [`Backlog`]. At most one of them
//! is *active* at a time; the [`ActivationState`] machine decides when the
//! active command has run its course and when the next one takes over.
//!
//! # Key types
//!
//! - [`Backlog`]: plain bounded sequence, knows nothing about time
//! - [`ActivationState`]: `Idle` / `Active`, with pure expiry checks
//! - [`CommandQueue`]: the two combined, plus the per-tick step
//!
//! Time is always passed in by the caller as a monotonic [`Instant`](std::time::Instant).
//! Nothing in this crate reads a clock, which keeps every transition
//! reproducible in tests.

mod backlog;
mod error;
mod queue;
mod state;

pub use backlog::Backlog;
pub use error::QueueError;
pub use queue::{Admission, CommandQueue, Transition};
pub use state::ActivationState;
