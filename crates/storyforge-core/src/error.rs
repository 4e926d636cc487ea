//! Domain error types.

use thiserror::Error;

use crate::ids::{JobId, StoryId};
use crate::repository::JobStatus;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No job exists with the given identifier.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// No story exists with the given identifier.
    #[error("story not found: {0}")]
    StoryNotFound(StoryId),

    /// A job was asked to leave a state it cannot leave.
    #[error("invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        /// The job that rejected the transition.
        job_id: JobId,
        /// The state the job was in.
        from: JobStatus,
        /// The state that was requested.
        to: JobStatus,
    },

    /// The narrative generator could not be reached or refused the request.
    #[error("generation error: {0}")]
    Generation(String),

    /// The narrative generator returned output that is not a valid story
    /// description.
    #[error("generation format error: {0}")]
    GenerationFormat(String),

    /// A persisted story violates a structural invariant.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Caller-supplied input was rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// The store was unreachable or rejected a read or write.
    #[error("persistence error: {0}")]
    Persistence(String),
}
