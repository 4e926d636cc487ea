//! Tree materializer: nested description → persisted node rows.
//!
//! Nodes are inserted depth-first in description order. Each node is
//! inserted with an empty option list so that it receives an id, its
//! children are inserted next, and only then is the node's option list
//! written with the children's ids. The walk uses an explicit work stack, so
//! description depth is not limited by the call stack.

use storyforge_core::error::DomainError;
use storyforge_core::ids::{NodeId, StoryId};
use storyforge_core::repository::{NewStoryNode, StoryOption, StoryTransaction};

use crate::domain::description::{NodeDescription, OptionDescription};

/// Position of a child in its parent's pending option list.
#[derive(Debug, Clone, Copy)]
struct Slot {
    parent: usize,
    index: usize,
}

enum Frame<'a> {
    /// Insert this node and schedule its children.
    Visit {
        node: &'a NodeDescription,
        is_root: bool,
        slot: Option<Slot>,
    },
    /// Every child of the pending node has an id; write its options.
    Seal(usize),
}

/// A branching node whose option list is still being collected.
struct PendingOptions<'a> {
    node_id: NodeId,
    options: &'a [OptionDescription],
    children: Vec<Option<NodeId>>,
}

impl PendingOptions<'_> {
    fn resolve(&self) -> Result<Vec<StoryOption>, DomainError> {
        self.options
            .iter()
            .zip(&self.children)
            .map(|(option, child)| {
                child
                    .map(|node_id| StoryOption {
                        text: option.text.clone(),
                        node_id,
                    })
                    .ok_or_else(|| {
                        DomainError::Integrity(format!(
                            "option {:?} of node {} has no materialized child",
                            option.text, self.node_id
                        ))
                    })
            })
            .collect()
    }
}

/// Persists `node` and its whole subtree into `tx` and returns the id of
/// `node`. Only `node` itself is flagged with `is_root`; every descendant is
/// inserted with `is_root = false`. Ending nodes are stored without options,
/// whatever the description lists under them.
///
/// # Errors
///
/// Propagates any `DomainError` from the transaction. Nothing is committed
/// here; the caller owns the transaction.
pub async fn materialize(
    tx: &mut dyn StoryTransaction,
    story_id: StoryId,
    node: &NodeDescription,
    is_root: bool,
) -> Result<NodeId, DomainError> {
    let mut stack = vec![Frame::Visit {
        node,
        is_root,
        slot: None,
    }];
    let mut pending: Vec<PendingOptions<'_>> = Vec::new();
    let mut top = None;

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Visit {
                node,
                is_root,
                slot,
            } => {
                let node_id = tx
                    .insert_node(&NewStoryNode {
                        story_id,
                        content: node.content.clone(),
                        is_root,
                        is_ending: node.is_ending,
                        is_winning_ending: node.is_winning_ending,
                    })
                    .await?;

                match slot {
                    Some(Slot { parent, index }) => pending[parent].children[index] = Some(node_id),
                    None => top = Some(node_id),
                }

                if node.is_ending || node.options.is_empty() {
                    continue;
                }

                let parent = pending.len();
                pending.push(PendingOptions {
                    node_id,
                    options: &node.options,
                    children: vec![None; node.options.len()],
                });
                stack.push(Frame::Seal(parent));
                // Reversed so the first option is popped, and inserted, first.
                for (index, option) in node.options.iter().enumerate().rev() {
                    stack.push(Frame::Visit {
                        node: &option.next_node,
                        is_root: false,
                        slot: Some(Slot { parent, index }),
                    });
                }
            }
            Frame::Seal(parent) => {
                let entry = &pending[parent];
                let options = entry.resolve()?;
                tx.set_node_options(entry.node_id, &options).await?;
            }
        }
    }

    top.ok_or_else(|| DomainError::Integrity("materializer inserted no top-level node".to_owned()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{TimeZone, Utc};
    use storyforge_core::error::DomainError;
    use storyforge_core::ids::{NodeId, StoryId};
    use storyforge_core::repository::{NewStory, StoredNode, StoryRepository};
    use storyforge_test_support::InMemoryStoryRepository;

    use super::materialize;
    use crate::domain::description::{NodeDescription, StoryDescription};

    async fn materialize_committed(
        repo: &InMemoryStoryRepository,
        description: &StoryDescription,
    ) -> (StoryId, NodeId, Vec<StoredNode>) {
        let mut tx = repo.begin().await.unwrap();
        let story_id = tx
            .insert_story(&NewStory {
                title: description.title.clone(),
                session_id: "session-1".to_owned(),
                created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            })
            .await
            .unwrap();
        let root_id = materialize(tx.as_mut(), story_id, &description.root_node, true)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        let nodes = repo.list_nodes(story_id).await.unwrap();
        (story_id, root_id, nodes)
    }

    /// Checks the read-back tree against its description: same node count,
    /// one root, empty options on endings, and every option pointing at a
    /// node with the described content.
    fn assert_tree_matches(description: &StoryDescription, root_id: NodeId, nodes: &[StoredNode]) {
        let by_id: HashMap<NodeId, &StoredNode> = nodes.iter().map(|n| (n.id, n)).collect();
        assert_eq!(nodes.len(), description.node_count());
        assert_eq!(nodes.iter().filter(|n| n.is_root).count(), 1);
        assert!(by_id[&root_id].is_root);

        let mut stack = vec![(&description.root_node, root_id)];
        while let Some((expected, node_id)) = stack.pop() {
            let stored = by_id[&node_id];
            assert_eq!(stored.content, expected.content);
            assert_eq!(stored.is_ending, expected.is_ending);
            if stored.is_ending {
                assert!(stored.options.is_empty());
                continue;
            }
            assert_eq!(stored.options.len(), expected.options.len());
            for (option, edge) in expected.options.iter().zip(&stored.options) {
                assert_eq!(edge.text, option.text);
                stack.push((&option.next_node, edge.node_id));
            }
        }
    }

    fn story(title: &str, root_node: NodeDescription) -> StoryDescription {
        StoryDescription {
            title: title.to_owned(),
            root_node,
        }
    }

    #[tokio::test]
    async fn test_single_ending_node_becomes_root_without_options() {
        // Arrange
        let repo = InMemoryStoryRepository::new();
        let description = story("Blink", NodeDescription::ending("It was all a dream.", false));

        // Act
        let (story_id, root_id, nodes) = materialize_committed(&repo, &description).await;

        // Assert
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, root_id);
        assert_eq!(nodes[0].story_id, story_id);
        assert!(nodes[0].is_root);
        assert!(nodes[0].is_ending);
        assert!(!nodes[0].is_winning_ending);
        assert!(nodes[0].options.is_empty());
    }

    #[tokio::test]
    async fn test_options_preserve_description_order() {
        // Arrange
        let repo = InMemoryStoryRepository::new();
        let description = story(
            "Three Doors",
            NodeDescription::branch(
                "Three doors stand before you.",
                [
                    ("Red door", NodeDescription::ending("Fire.", false)),
                    ("Green door", NodeDescription::ending("A garden.", true)),
                    ("Blue door", NodeDescription::ending("The sea.", false)),
                ],
            ),
        );

        // Act
        let (_, root_id, nodes) = materialize_committed(&repo, &description).await;

        // Assert
        let root = nodes.iter().find(|n| n.id == root_id).unwrap();
        let texts: Vec<&str> = root.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, ["Red door", "Green door", "Blue door"]);
        assert_tree_matches(&description, root_id, &nodes);
    }

    #[tokio::test]
    async fn test_nodes_are_inserted_depth_first_in_description_order() {
        // Arrange
        let repo = InMemoryStoryRepository::new();
        let description = story(
            "Order",
            NodeDescription::branch(
                "A",
                [
                    (
                        "to B",
                        NodeDescription::branch("B", [("to C", NodeDescription::ending("C", true))]),
                    ),
                    ("to D", NodeDescription::ending("D", false)),
                ],
            ),
        );

        // Act
        let (_, _, nodes) = materialize_committed(&repo, &description).await;

        // Assert
        let contents: Vec<&str> = nodes.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, ["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_ending_node_drops_described_options() {
        // Arrange
        let repo = InMemoryStoryRepository::new();
        let mut ending = NodeDescription::ending("The end.", true);
        ending.options = NodeDescription::branch("", [("Again?", NodeDescription::ending("x", false))])
            .options;
        let description = story("Stubborn Ending", ending);

        // Act
        let (_, root_id, nodes) = materialize_committed(&repo, &description).await;

        // Assert
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].options.is_empty());
        assert_tree_matches(&description, root_id, &nodes);
    }

    #[tokio::test]
    async fn test_non_ending_leaf_is_stored_without_options() {
        // Arrange
        let repo = InMemoryStoryRepository::new();
        let dead_end = NodeDescription {
            content: "Nowhere to go.".to_owned(),
            is_ending: false,
            is_winning_ending: false,
            options: Vec::new(),
        };
        let description = story(
            "Dead End",
            NodeDescription::branch("Start.", [("Walk", dead_end)]),
        );

        // Act
        let (_, root_id, nodes) = materialize_committed(&repo, &description).await;

        // Assert
        assert_eq!(nodes.len(), 2);
        let leaf = nodes.iter().find(|n| n.id != root_id).unwrap();
        assert!(!leaf.is_ending);
        assert!(leaf.options.is_empty());
        assert_tree_matches(&description, root_id, &nodes);
    }

    #[tokio::test]
    async fn test_only_top_level_node_is_root() {
        // Arrange
        let repo = InMemoryStoryRepository::new();
        let description = story(
            "Nested",
            NodeDescription::branch(
                "Start",
                [
                    (
                        "Climb",
                        NodeDescription::branch(
                            "Cliff",
                            [
                                ("Jump", NodeDescription::ending("Splash", true)),
                                ("Fall", NodeDescription::ending("Thud", false)),
                            ],
                        ),
                    ),
                    ("Rest", NodeDescription::ending("Sleep", false)),
                ],
            ),
        );

        // Act
        let (_, root_id, nodes) = materialize_committed(&repo, &description).await;

        // Assert
        assert_eq!(nodes.len(), 5);
        assert_tree_matches(&description, root_id, &nodes);
    }

    #[tokio::test]
    async fn test_deep_chain_does_not_rely_on_call_stack() {
        // Arrange
        let depth = 2_000;
        let mut node = NodeDescription::ending("bottom", true);
        for level in (0..depth).rev() {
            node = NodeDescription::branch(format!("level {level}"), [("down", node)]);
        }
        let description = story("Abyss", node);
        let repo = InMemoryStoryRepository::new();

        // Act
        let (_, root_id, nodes) = materialize_committed(&repo, &description).await;

        // Assert
        assert_eq!(nodes.len(), depth + 1);
        assert_tree_matches(&description, root_id, &nodes);
    }

    #[tokio::test]
    async fn test_insert_failure_propagates_and_leaves_nothing_committed() {
        // Arrange
        let repo = InMemoryStoryRepository::new().failing_node_insert_after(2);
        let description = story(
            "Interrupted",
            NodeDescription::branch(
                "Start",
                [
                    ("One", NodeDescription::ending("1", false)),
                    ("Two", NodeDescription::ending("2", false)),
                ],
            ),
        );
        let mut tx = repo.begin().await.unwrap();
        let story_id = tx
            .insert_story(&NewStory {
                title: description.title.clone(),
                session_id: "session-1".to_owned(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        // Act
        let result = materialize(tx.as_mut(), story_id, &description.root_node, true).await;
        tx.rollback().await.unwrap();

        // Assert
        assert!(matches!(result, Err(DomainError::Persistence(_))));
        assert!(repo.find_story(story_id).await.unwrap().is_none());
        assert_eq!(repo.committed_node_count(), 0);
    }
}
