//! Command handlers for the Story Job context.

use storyforge_core::clock::Clock;
use storyforge_core::command::Command;
use storyforge_core::error::DomainError;
use storyforge_core::ids::JobId;
use storyforge_core::repository::{JobRepository, StoredJob};
use tracing::info;

use crate::domain::aggregates::StoryJob;
use crate::domain::commands::CreateStoryJob;

/// Handles the `CreateStoryJob` command: opens a `processing` job with a
/// fresh id and persists it before returning, so the id can be polled as
/// soon as the caller has it.
///
/// The caller must only schedule execution after this returns `Ok`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the theme is blank and
/// `DomainError::Persistence` if the store rejects the insert.
pub async fn handle_create_story_job(
    command: &CreateStoryJob,
    clock: &dyn Clock,
    repo: &dyn JobRepository,
) -> Result<StoredJob, DomainError> {
    if command.theme.trim().is_empty() {
        return Err(DomainError::Validation("theme must not be blank".into()));
    }

    let job = StoryJob::open(
        JobId::generate(),
        command.session_id.clone(),
        command.theme.clone(),
        clock,
    );
    repo.insert_job(job.as_stored()).await?;

    info!(
        command = command.command_type(),
        job_id = %job.job_id(),
        correlation_id = %command.correlation_id(),
        "story job created"
    );
    Ok(job.into_stored())
}
