//! Aggregate roots for the Story Job context.

use storyforge_core::clock::Clock;
use storyforge_core::error::DomainError;
use storyforge_core::ids::{JobId, StoryId};
use storyforge_core::repository::{JobStatus, StoredJob};

/// The aggregate root for a story generation job.
///
/// Owns the `processing → completed | failed` state machine. The only way to
/// change `status`, `story_id` or `error` is through `complete` and `fail`,
/// each of which succeeds only from `processing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryJob {
    state: StoredJob,
}

impl StoryJob {
    /// Opens a new job in the `processing` state.
    #[must_use]
    pub fn open(job_id: JobId, session_id: String, theme: String, clock: &dyn Clock) -> Self {
        Self {
            state: StoredJob {
                job_id,
                session_id,
                theme,
                status: JobStatus::Processing,
                story_id: None,
                error: None,
                created_at: clock.now(),
                completed_at: None,
            },
        }
    }

    /// Rehydrates a job from its stored representation.
    #[must_use]
    pub fn from_stored(state: StoredJob) -> Self {
        Self { state }
    }

    /// The job identifier.
    #[must_use]
    pub fn job_id(&self) -> JobId {
        self.state.job_id
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.state.status
    }

    /// Borrow the stored representation.
    #[must_use]
    pub fn as_stored(&self) -> &StoredJob {
        &self.state
    }

    /// Consume the aggregate into its stored representation.
    #[must_use]
    pub fn into_stored(self) -> StoredJob {
        self.state
    }

    /// Marks the job completed with the generated story.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless the job is
    /// `processing`.
    pub fn complete(&mut self, story_id: StoryId, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_processing(JobStatus::Completed)?;
        self.state.status = JobStatus::Completed;
        self.state.story_id = Some(story_id);
        self.state.error = None;
        self.state.completed_at = Some(clock.now());
        Ok(())
    }

    /// Marks the job failed with a human-readable message.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless the job is
    /// `processing`.
    pub fn fail(&mut self, message: impl Into<String>, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_processing(JobStatus::Failed)?;
        self.state.status = JobStatus::Failed;
        self.state.story_id = None;
        self.state.error = Some(message.into());
        self.state.completed_at = Some(clock.now());
        Ok(())
    }

    fn ensure_processing(&self, to: JobStatus) -> Result<(), DomainError> {
        if self.state.status == JobStatus::Processing {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                job_id: self.state.job_id,
                from: self.state.status,
                to,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use storyforge_test_support::FixedClock;

    fn open_job(clock: &FixedClock) -> StoryJob {
        StoryJob::open(
            JobId::generate(),
            "session-1".to_owned(),
            "fantasy".to_owned(),
            clock,
        )
    }

    #[test]
    fn test_open_starts_processing_without_outcome() {
        // Arrange
        let fixed_now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let clock = FixedClock(fixed_now);

        // Act
        let job = open_job(&clock);

        // Assert
        let stored = job.as_stored();
        assert_eq!(stored.status, JobStatus::Processing);
        assert_eq!(stored.story_id, None);
        assert_eq!(stored.error, None);
        assert_eq!(stored.created_at, fixed_now);
        assert_eq!(stored.completed_at, None);
    }

    #[test]
    fn test_complete_sets_story_and_timestamp() {
        // Arrange
        let created = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let mut job = open_job(&FixedClock(created));
        let finished = FixedClock(created + Duration::seconds(42));

        // Act
        job.complete(StoryId(7), &finished).unwrap();

        // Assert
        let stored = job.as_stored();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.story_id, Some(StoryId(7)));
        assert_eq!(stored.error, None);
        assert_eq!(stored.completed_at, Some(finished.0));
    }

    #[test]
    fn test_fail_sets_error_and_timestamp() {
        // Arrange
        let clock = FixedClock(Utc::now());
        let mut job = open_job(&clock);

        // Act
        job.fail("generation format error: bad json", &clock).unwrap();

        // Assert
        let stored = job.as_stored();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.story_id, None);
        assert_eq!(
            stored.error.as_deref(),
            Some("generation format error: bad json")
        );
        assert_eq!(stored.completed_at, Some(clock.0));
    }

    #[test]
    fn test_completed_job_rejects_any_further_transition() {
        // Arrange
        let clock = FixedClock(Utc::now());
        let mut job = open_job(&clock);
        job.complete(StoryId(1), &clock).unwrap();
        let snapshot = job.clone();

        // Act
        let fail_result = job.fail("late failure", &clock);
        let complete_result = job.complete(StoryId(2), &clock);

        // Assert
        assert!(matches!(
            fail_result,
            Err(DomainError::InvalidTransition {
                from: JobStatus::Completed,
                to: JobStatus::Failed,
                ..
            })
        ));
        assert!(matches!(
            complete_result,
            Err(DomainError::InvalidTransition { .. })
        ));
        assert_eq!(job, snapshot);
    }

    #[test]
    fn test_failed_job_cannot_complete() {
        // Arrange
        let clock = FixedClock(Utc::now());
        let mut job = open_job(&clock);
        job.fail("boom", &clock).unwrap();

        // Act
        let result = job.complete(StoryId(3), &clock);

        // Assert
        match result {
            Err(DomainError::InvalidTransition { job_id, from, to }) => {
                assert_eq!(job_id, job.job_id());
                assert_eq!(from, JobStatus::Failed);
                assert_eq!(to, JobStatus::Completed);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.as_stored().story_id, None);
    }
}
