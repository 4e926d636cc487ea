//! `PostgreSQL` implementation of the `JobRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use storyforge_core::error::DomainError;
use storyforge_core::ids::{JobId, StoryId};
use storyforge_core::repository::{JobRepository, JobStatus, StoredJob};

use crate::persistence;

/// PostgreSQL-backed job repository.
#[derive(Debug, Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    /// Creates a new `PgJobRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    job_id: Uuid,
    session_id: String,
    theme: String,
    status: String,
    story_id: Option<i64>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for StoredJob {
    type Error = DomainError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            job_id: JobId(row.job_id),
            session_id: row.session_id,
            theme: row.theme,
            status: row.status.parse()?,
            story_id: row.story_id.map(StoryId),
            error: row.error,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn insert_job(&self, job: &StoredJob) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO story_jobs \
             (job_id, session_id, theme, status, story_id, error, created_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(job.job_id.0)
        .bind(&job.session_id)
        .bind(&job.theme)
        .bind(job.status.as_str())
        .bind(job.story_id.map(|id| id.0))
        .bind(job.error.as_deref())
        .bind(job.created_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| persistence("failed to insert job", &e))?;
        Ok(())
    }

    async fn find_job(&self, job_id: JobId) -> Result<Option<StoredJob>, DomainError> {
        let row: Option<JobRow> = sqlx::query_as(
            "SELECT job_id, session_id, theme, status, story_id, error, created_at, completed_at \
             FROM story_jobs WHERE job_id = $1",
        )
        .bind(job_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| persistence("failed to load job", &e))?;

        row.map(StoredJob::try_from).transpose()
    }

    async fn record_outcome(&self, job: &StoredJob) -> Result<(), DomainError> {
        // The status guard makes the transition atomic with respect to any
        // concurrent writer of the same job.
        let result = sqlx::query(
            "UPDATE story_jobs \
             SET status = $2, story_id = $3, error = $4, completed_at = $5 \
             WHERE job_id = $1 AND status = 'processing'",
        )
        .bind(job.job_id.0)
        .bind(job.status.as_str())
        .bind(job.story_id.map(|id| id.0))
        .bind(job.error.as_deref())
        .bind(job.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| persistence("failed to record job outcome", &e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM story_jobs WHERE job_id = $1")
                .bind(job.job_id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| persistence("failed to load job status", &e))?;

        match current {
            None => Err(DomainError::JobNotFound(job.job_id)),
            Some(status) => Err(DomainError::InvalidTransition {
                job_id: job.job_id,
                from: status.parse::<JobStatus>()?,
                to: job.status,
            }),
        }
    }
}
