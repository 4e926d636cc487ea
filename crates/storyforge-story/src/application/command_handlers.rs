//! Command handlers for the Story context.
//!
//! The story generation handler is the orchestration boundary: it calls the
//! generator once, parses the output into a typed description, and
//! persists the story header plus its whole node tree as one transaction.

use storyforge_core::clock::Clock;
use storyforge_core::command::Command;
use storyforge_core::error::DomainError;
use storyforge_core::generator::NarrativeGenerator;
use storyforge_core::ids::StoryId;
use storyforge_core::repository::{NewStory, StoredStory, StoryRepository, StoryTransaction};
use tracing::{debug, info, instrument, warn};

use crate::application::materializer;
use crate::domain::commands::GenerateStory;
use crate::domain::description::StoryDescription;

/// Handles the `GenerateStory` command: generates a description, then
/// commits the story and its node tree atomically.
///
/// Generation and parsing finish before a transaction is opened. If anything
/// fails after that, the transaction is rolled back, so a failed call never
/// leaves story or node rows visible to readers.
///
/// # Errors
///
/// Returns `DomainError::Generation` if the generator fails,
/// `DomainError::GenerationFormat` if its output is not a valid description,
/// and `DomainError::Persistence` if the store rejects a write or the commit.
#[instrument(
    skip_all,
    fields(
        command = command.command_type(),
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id
    )
)]
pub async fn handle_generate_story(
    command: &GenerateStory,
    clock: &dyn Clock,
    generator: &dyn NarrativeGenerator,
    repo: &dyn StoryRepository,
) -> Result<StoredStory, DomainError> {
    let raw = generator.generate(&command.theme).await?;
    let description = StoryDescription::parse(&raw)?;
    debug!(
        title = %description.title,
        node_count = description.node_count(),
        "parsed story description"
    );

    let story = NewStory {
        title: description.title.clone(),
        session_id: command.session_id.clone(),
        created_at: clock.now(),
    };
    let mut tx = repo.begin().await?;
    let story_id = match persist_tree(tx.as_mut(), &story, &description).await {
        Ok(story_id) => story_id,
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback after failed materialization also failed");
            }
            return Err(err);
        }
    };
    tx.commit().await?;

    info!(story_id = %story_id, title = %story.title, "story committed");
    Ok(StoredStory {
        id: story_id,
        title: story.title,
        session_id: story.session_id,
        created_at: story.created_at,
    })
}

async fn persist_tree(
    tx: &mut dyn StoryTransaction,
    story: &NewStory,
    description: &StoryDescription,
) -> Result<StoryId, DomainError> {
    let story_id = tx.insert_story(story).await?;
    materializer::materialize(tx, story_id, &description.root_node, true).await?;
    Ok(story_id)
}
