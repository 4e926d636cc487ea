//! Query handlers for the Story Job context.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storyforge_core::error::DomainError;
use storyforge_core::ids::{JobId, StoryId};
use storyforge_core::repository::{JobRepository, JobStatus, StoredJob};

/// Read-only view of a story generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryJobView {
    /// The job identifier.
    pub job_id: JobId,
    /// Session that requested the story.
    pub session_id: String,
    /// Theme passed to the generator.
    pub theme: String,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Generated story, once completed.
    pub story_id: Option<StoryId>,
    /// Failure message, once failed.
    pub error: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<StoredJob> for StoryJobView {
    fn from(job: StoredJob) -> Self {
        Self {
            job_id: job.job_id,
            session_id: job.session_id,
            theme: job.theme,
            status: job.status,
            story_id: job.story_id,
            error: job.error,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

/// Retrieves a job by id. Read-only; polling a terminal job returns the
/// same view every time.
///
/// # Errors
///
/// Returns `DomainError::JobNotFound` if no job exists for the ID.
/// Returns `DomainError::Persistence` if the store cannot be read.
pub async fn get_job_by_id(
    job_id: JobId,
    repo: &dyn JobRepository,
) -> Result<StoryJobView, DomainError> {
    repo.find_job(job_id)
        .await?
        .map(StoryJobView::from)
        .ok_or(DomainError::JobNotFound(job_id))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use storyforge_core::error::DomainError;
    use storyforge_core::ids::{JobId, StoryId};
    use storyforge_core::repository::{JobRepository, JobStatus};
    use storyforge_test_support::{FailingJobRepository, FixedClock, InMemoryJobRepository};

    use crate::application::query_handlers::get_job_by_id;
    use crate::domain::aggregates::StoryJob;

    #[tokio::test]
    async fn test_get_job_by_id_returns_view() {
        // Arrange
        let clock = FixedClock(Utc::now());
        let repo = InMemoryJobRepository::new();
        let job = StoryJob::open(
            JobId::generate(),
            "session-1".to_owned(),
            "fantasy".to_owned(),
            &clock,
        );
        repo.insert_job(job.as_stored()).await.unwrap();

        // Act
        let view = get_job_by_id(job.job_id(), &repo).await.unwrap();

        // Assert
        assert_eq!(view.job_id, job.job_id());
        assert_eq!(view.status, JobStatus::Processing);
        assert_eq!(view.story_id, None);
        assert_eq!(view.error, None);
    }

    #[tokio::test]
    async fn test_get_job_by_id_is_idempotent_for_terminal_jobs() {
        // Arrange
        let clock = FixedClock(Utc::now());
        let repo = InMemoryJobRepository::new();
        let mut job = StoryJob::open(
            JobId::generate(),
            "session-1".to_owned(),
            "fantasy".to_owned(),
            &clock,
        );
        repo.insert_job(job.as_stored()).await.unwrap();
        job.complete(StoryId(9), &clock).unwrap();
        repo.record_outcome(job.as_stored()).await.unwrap();

        // Act
        let first = get_job_by_id(job.job_id(), &repo).await.unwrap();
        let polls = [
            get_job_by_id(job.job_id(), &repo).await.unwrap(),
            get_job_by_id(job.job_id(), &repo).await.unwrap(),
            get_job_by_id(job.job_id(), &repo).await.unwrap(),
        ];

        // Assert
        assert_eq!(first.status, JobStatus::Completed);
        assert_eq!(first.story_id, Some(StoryId(9)));
        for poll in polls {
            assert_eq!(poll, first);
        }
        assert_eq!(repo.outcome_writes(), 1);
    }

    #[tokio::test]
    async fn test_get_job_by_id_returns_not_found_for_unknown_job() {
        // Arrange
        let repo = InMemoryJobRepository::new();
        let job_id = JobId::generate();

        // Act
        let result = get_job_by_id(job_id, &repo).await;

        // Assert
        match result {
            Err(DomainError::JobNotFound(id)) => assert_eq!(id, job_id),
            other => panic!("expected JobNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_job_by_id_surfaces_store_failure() {
        let result = get_job_by_id(JobId::generate(), &FailingJobRepository).await;

        assert!(matches!(result, Err(DomainError::Persistence(_))));
    }

    #[test]
    fn test_job_view_serializes_wire_fields() {
        let clock = FixedClock(Utc::now());
        let job = StoryJob::open(
            JobId::generate(),
            "session-1".to_owned(),
            "fantasy".to_owned(),
            &clock,
        );

        let json = serde_json::to_value(super::StoryJobView::from(job.into_stored())).unwrap();

        assert_eq!(json["status"], "processing");
        assert!(json["story_id"].is_null());
        assert!(json["error"].is_null());
        assert!(json["job_id"].is_string());
    }
}
