//! Error types for the queue layer.

/// Errors the queue itself can produce.
///
/// Actions report their own failures through their own error type; this
/// only covers the queue machinery going away underneath them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The worker stopped before the action produced a result.
    #[error("action queue closed")]
    Closed,
}
