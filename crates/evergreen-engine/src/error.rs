//! Error types for the scheduling engine.

use thiserror::Error;

use evergreen_store::{Conflict, Queue, StoreError};

/// Errors surfaced by queue lifecycle and query operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Interval below the one-day minimum.
    #[error("interval must be at least 1 day, got {0}")]
    InvalidInterval(u32),

    /// Requested due time is not in the future.
    #[error("next due time must be in the future")]
    ScheduleInPast,

    /// Execution bound of zero, or below what the queue has already
    /// executed.
    #[error("max executions must be at least {min}, got {requested}")]
    InvalidMaxExecutions { requested: u32, min: u32 },

    /// No authenticated caller.
    #[error("not authenticated")]
    Unauthenticated,

    /// Caller does not own the record.
    #[error("not authorized to access this record")]
    Unauthorized,

    /// Queue not found.
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    /// Post not found.
    #[error("post not found: {0}")]
    PostNotFound(String),

    /// Another queue already targets the source post. Recoverable: the
    /// caller may retry with `force` after inspecting the existing
    /// queue.
    #[error("queue {} already targets post {}", existing.id, existing.source_post_id)]
    DuplicateQueue { existing: Box<Queue> },

    /// Same-lineage publish within the exact tolerance. Never
    /// overridable; indicates a true duplicate publish.
    #[error(
        "exact scheduling conflict with post {} on {} at {}",
        conflict.post_id,
        conflict.platform,
        conflict.post_time
    )]
    ExactConflict { conflict: Conflict },

    /// Source post has no platform with publishable content.
    #[error("post {0} has no platform content")]
    NoPlatformContent(String),

    /// The queue is completed; completed is terminal.
    #[error("queue {0} is completed")]
    QueueCompleted(String),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from cloning a post for one queue execution.
#[derive(Debug, Error)]
pub enum CloneError {
    /// The source post no longer exists. The processor promotes this to
    /// a terminal queue state, since retrying cannot succeed.
    #[error("source post not found: {0}")]
    SourceMissing(String),

    /// The source post has no platform with publishable content.
    #[error("post {0} has no platform content")]
    NoPlatformContent(String),

    /// Store or scheduler failure; retryable on the next tick.
    #[error(transparent)]
    Store(#[from] StoreError),
}
