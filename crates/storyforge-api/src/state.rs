//! Shared application state.

use std::fmt;
use std::sync::Arc;

use storyforge_core::clock::Clock;
use storyforge_core::generator::NarrativeGenerator;
use storyforge_core::repository::{JobRepository, StoryRepository};
use storyforge_jobs::application::worker::JobWorker;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Timestamp source for new jobs.
    pub clock: Arc<dyn Clock>,
    /// Job persistence.
    pub job_repository: Arc<dyn JobRepository>,
    /// Story persistence.
    pub story_repository: Arc<dyn StoryRepository>,
    /// Background executor for created jobs.
    pub worker: JobWorker,
}

impl AppState {
    /// Create new application state. The worker shares the repositories but
    /// runs each job on its own task.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        job_repository: Arc<dyn JobRepository>,
        story_repository: Arc<dyn StoryRepository>,
        generator: Arc<dyn NarrativeGenerator>,
    ) -> Self {
        let worker = JobWorker::new(
            Arc::clone(&job_repository),
            Arc::clone(&story_repository),
            generator,
            Arc::clone(&clock),
        );
        Self {
            clock,
            job_repository,
            story_repository,
            worker,
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}
