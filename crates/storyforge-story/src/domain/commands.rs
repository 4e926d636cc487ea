//! Commands for the Story context.

use storyforge_core::command::Command;
use uuid::Uuid;

/// Command to generate and persist a new story for a theme.
#[derive(Debug, Clone)]
pub struct GenerateStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session the story will belong to.
    pub session_id: String,
    /// Theme handed to the generator.
    pub theme: String,
}

impl Command for GenerateStory {
    fn command_type(&self) -> &'static str {
        "story.generate"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
