//! Single-flight action queue for neohab.
//!
//! Every outbound command goes through one [`ActionQueue`] per connection.
//! The queue runs its actions strictly one at a time, in the order they
//! were pushed, each to completion before the next starts. That is what
//! keeps writes to the socket from interleaving and lets callers pace
//! multi-step sequences with plain [`wait`](ActionQueue::wait)s.
//!
//! # Key types
//!
//! - [`ActionQueue`]: push actions, get a [`Pending`] back
//! - [`Pending`]: a future for one action's result
//! - [`QueueError`]: the queue went away

mod error;
mod queue;

pub use error::QueueError;
pub use queue::{ActionQueue, Pending};
