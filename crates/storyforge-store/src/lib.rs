//! PostgreSQL implementations of the Storyforge repository ports.
//!
//! Every `sqlx::Error` is mapped to `DomainError::Persistence`; callers never
//! see driver types.

pub mod pg_job_repository;
pub mod pg_story_repository;

use storyforge_core::error::DomainError;

pub(crate) fn persistence(context: &str, err: &sqlx::Error) -> DomainError {
    DomainError::Persistence(format!("{context}: {err}"))
}
