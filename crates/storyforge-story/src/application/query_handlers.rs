//! Query handlers for the Story context.
//!
//! Projects a committed story tree into the client-facing complete view:
//! the root node plus a lookup table of every node by id.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use storyforge_core::error::DomainError;
use storyforge_core::ids::{NodeId, StoryId};
use storyforge_core::repository::{StoredNode, StoredStory, StoryOption, StoryRepository};
use tracing::error;

/// Read-only view of a single story node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryNodeView {
    /// Node identifier.
    pub id: NodeId,
    /// Narrative text.
    pub content: String,
    /// Whether the story ends here.
    pub is_ending: bool,
    /// Whether this ending is a winning one.
    pub is_winning_ending: bool,
    /// Ordered choices leading out of this node.
    pub options: Vec<StoryOption>,
}

impl From<StoredNode> for StoryNodeView {
    fn from(node: StoredNode) -> Self {
        Self {
            id: node.id,
            content: node.content,
            is_ending: node.is_ending,
            is_winning_ending: node.is_winning_ending,
            options: node.options,
        }
    }
}

/// Read-only view of a story with its entire node tree.
#[derive(Debug, Serialize)]
pub struct CompleteStoryView {
    /// Story identifier.
    pub id: StoryId,
    /// Story title.
    pub title: String,
    /// Session that owns the story.
    pub session_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// The entry node.
    pub root_node: StoryNodeView,
    /// Every node of the story, keyed by id.
    pub all_nodes: BTreeMap<NodeId, StoryNodeView>,
}

/// Retrieves a story together with all of its nodes.
///
/// # Errors
///
/// Returns `DomainError::StoryNotFound` if no story exists for the ID,
/// `DomainError::Integrity` if the story has no unique root node, and
/// `DomainError::Persistence` if the store cannot be read.
pub async fn get_complete_story(
    story_id: StoryId,
    repo: &dyn StoryRepository,
) -> Result<CompleteStoryView, DomainError> {
    let story = repo
        .find_story(story_id)
        .await?
        .ok_or(DomainError::StoryNotFound(story_id))?;
    let nodes = repo.list_nodes(story_id).await?;
    build_complete_story(story, nodes)
}

/// Assembles the complete view from a story header and its node rows.
///
/// # Errors
///
/// Returns `DomainError::Integrity` unless exactly one node is flagged as
/// the root.
pub fn build_complete_story(
    story: StoredStory,
    nodes: Vec<StoredNode>,
) -> Result<CompleteStoryView, DomainError> {
    let roots: Vec<NodeId> = nodes.iter().filter(|n| n.is_root).map(|n| n.id).collect();
    let root_id = match roots.as_slice() {
        [root_id] => *root_id,
        _ => {
            error!(
                story_id = %story.id,
                root_count = roots.len(),
                "story does not have exactly one root node"
            );
            return Err(DomainError::Integrity(format!(
                "story {} has {} root nodes, expected 1",
                story.id,
                roots.len()
            )));
        }
    };

    let all_nodes: BTreeMap<NodeId, StoryNodeView> = nodes
        .into_iter()
        .map(|node| (node.id, StoryNodeView::from(node)))
        .collect();
    let root_node = all_nodes[&root_id].clone();

    Ok(CompleteStoryView {
        id: story.id,
        title: story.title,
        session_id: story.session_id,
        created_at: story.created_at,
        root_node,
        all_nodes,
    })
}
