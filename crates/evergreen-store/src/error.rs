//! Error types for the stores and scheduling collaborators.

use thiserror::Error;

/// Errors that can occur when talking to a store or the publish scheduler.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The publish scheduler refused the request.
    #[error("scheduler rejected request: {0}")]
    ScheduleRejected(String),
}
