//! Background execution of story jobs.
//!
//! A job is created on the request path and executed here, on its own tokio
//! task. The worker holds its own `Arc` handles to the repositories, so it
//! never shares a connection or transaction with the request that spawned
//! it and keeps running after that request has returned.
//!
//! Every outcome, including a panic inside generation or materialization,
//! ends in exactly one terminal status write.

use std::fmt;
use std::sync::Arc;

use storyforge_core::clock::Clock;
use storyforge_core::command::Command;
use storyforge_core::error::DomainError;
use storyforge_core::generator::NarrativeGenerator;
use storyforge_core::ids::JobId;
use storyforge_core::repository::{JobRepository, StoryRepository};
use storyforge_story::application::command_handlers::handle_generate_story;
use storyforge_story::domain::commands::GenerateStory;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};

use crate::domain::aggregates::StoryJob;
use crate::domain::commands::ExecuteStoryJob;

/// Runs story jobs to a terminal state on background tasks.
#[derive(Clone)]
pub struct JobWorker {
    jobs: Arc<dyn JobRepository>,
    stories: Arc<dyn StoryRepository>,
    generator: Arc<dyn NarrativeGenerator>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for JobWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobWorker").finish_non_exhaustive()
    }
}

impl JobWorker {
    /// Creates a worker over the given collaborators.
    #[must_use]
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        stories: Arc<dyn StoryRepository>,
        generator: Arc<dyn NarrativeGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            jobs,
            stories,
            generator,
            clock,
        }
    }

    /// Schedules `command` on a new task and returns immediately.
    ///
    /// The returned handle resolves once the job has reached a terminal
    /// state (or was found missing). Dropping it does not cancel the job.
    pub fn spawn(&self, command: ExecuteStoryJob) -> JoinHandle<()> {
        let span = info_span!(
            "story_job",
            command = command.command_type(),
            job_id = %command.job_id,
            correlation_id = %command.correlation_id()
        );
        let worker = self.clone();
        tokio::spawn(worker.supervise(command).instrument(span))
    }

    /// Runs the job on an inner task and converts a panic of that task into
    /// a `failed` status.
    async fn supervise(self, command: ExecuteStoryJob) {
        let job_id = command.job_id;
        let runner = self.clone();
        let execution =
            tokio::spawn(async move { runner.execute(&command).await }.in_current_span());

        if let Err(join_err) = execution.await {
            let reason = if join_err.is_panic() {
                "job execution panicked"
            } else {
                "job execution was cancelled"
            };
            error!(error = %join_err, "{reason}");
            self.fail_if_processing(job_id, reason).await;
        }
    }

    /// Executes a job in the current task.
    ///
    /// Never returns an error: generation, parse and persistence failures,
    /// including a failed load of the job itself, are recorded as a `failed`
    /// status with the error's message. A job
    /// that no longer exists is skipped silently; one that is already
    /// terminal is left untouched.
    pub async fn execute(&self, command: &ExecuteStoryJob) {
        let stored = match self.jobs.find_job(command.job_id).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                info!("job no longer exists; skipping execution");
                return;
            }
            Err(err) => {
                error!(error = %err, "could not load job; recording failure");
                // record_outcome writes only the terminal fields and is
                // guarded on `processing`, so the reopened copy cannot
                // overwrite a terminal job.
                let job = StoryJob::open(
                    command.job_id,
                    command.session_id.clone(),
                    command.theme.clone(),
                    self.clock.as_ref(),
                );
                self.record_failure(job, err.to_string()).await;
                return;
            }
        };

        let job = StoryJob::from_stored(stored);
        if job.status().is_terminal() {
            warn!(status = %job.status(), "job is already terminal; skipping execution");
            return;
        }

        match self.run(&job, command).await {
            Ok(()) => {}
            Err(err @ DomainError::InvalidTransition { .. }) => {
                warn!(error = %err, "job reached a terminal state elsewhere");
            }
            Err(err) => self.record_failure(job, err.to_string()).await,
        }
    }

    async fn run(&self, job: &StoryJob, command: &ExecuteStoryJob) -> Result<(), DomainError> {
        let generate = GenerateStory {
            correlation_id: command.correlation_id,
            session_id: command.session_id.clone(),
            theme: command.theme.clone(),
        };
        let story = handle_generate_story(
            &generate,
            self.clock.as_ref(),
            self.generator.as_ref(),
            self.stories.as_ref(),
        )
        .await?;

        let mut completed = job.clone();
        completed.complete(story.id, self.clock.as_ref())?;
        self.jobs.record_outcome(completed.as_stored()).await?;
        info!(story_id = %story.id, "story job completed");
        Ok(())
    }

    async fn record_failure(&self, mut job: StoryJob, message: String) {
        if let Err(err) = job.fail(message.as_str(), self.clock.as_ref()) {
            error!(error = %err, "could not mark job failed");
            return;
        }
        match self.jobs.record_outcome(job.as_stored()).await {
            Ok(()) => warn!(error = %message, "story job failed"),
            Err(err) => error!(
                error = %err,
                cause = %message,
                "could not record job failure; it stays processing"
            ),
        }
    }

    async fn fail_if_processing(&self, job_id: JobId, reason: &str) {
        match self.jobs.find_job(job_id).await {
            Ok(Some(stored)) => {
                let job = StoryJob::from_stored(stored);
                if !job.status().is_terminal() {
                    self.record_failure(job, reason.to_owned()).await;
                }
            }
            Ok(None) => {}
            Err(err) => error!(error = %err, "could not load job after abnormal exit"),
        }
    }
}
