//! Commands for the Story Job context.

use storyforge_core::command::Command;
use storyforge_core::ids::JobId;
use uuid::Uuid;

/// Command to register a new story generation job.
#[derive(Debug, Clone)]
pub struct CreateStoryJob {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session requesting the story.
    pub session_id: String,
    /// Theme for the generator.
    pub theme: String,
}

impl Command for CreateStoryJob {
    fn command_type(&self) -> &'static str {
        "job.create"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to run a previously created job to a terminal state.
#[derive(Debug, Clone)]
pub struct ExecuteStoryJob {
    /// The correlation ID of the request that created the job.
    pub correlation_id: Uuid,
    /// The job to execute.
    pub job_id: JobId,
    /// The session requesting the story.
    pub session_id: String,
    /// Theme for the generator.
    pub theme: String,
}

impl Command for ExecuteStoryJob {
    fn command_type(&self) -> &'static str {
        "job.execute"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
