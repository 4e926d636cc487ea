//! Typed schema of the generator's nested story description.
//!
//! The generator is asked to answer with a single JSON document:
//!
//! ```json
//! {
//!   "title": "...",
//!   "rootNode": {
//!     "content": "...",
//!     "isEnding": false,
//!     "isWinningEnding": false,
//!     "options": [{ "text": "...", "nextNode": { ... } }]
//!   }
//! }
//! ```
//!
//! Output is parsed once, here. Everything downstream works
//! with the typed tree and never sees raw generator text.

use serde::{Deserialize, Deserializer, Serialize};
use storyforge_core::error::DomainError;

/// A complete story as described by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryDescription {
    /// Story title.
    pub title: String,
    /// Entry node of the story tree.
    pub root_node: NodeDescription,
}

/// One narrative beat and the choices leading out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescription {
    /// Narrative text.
    pub content: String,
    /// Whether the story ends here.
    pub is_ending: bool,
    /// Whether this ending is a winning one.
    #[serde(default)]
    pub is_winning_ending: bool,
    /// Ordered choices. Ignored for endings.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub options: Vec<OptionDescription>,
}

/// A labeled choice and the subtree it leads to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDescription {
    /// Choice text.
    pub text: String,
    /// The node reached by taking this choice.
    pub next_node: NodeDescription,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<OptionDescription>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<OptionDescription>>::deserialize(deserializer)?.unwrap_or_default())
}

impl NodeDescription {
    /// An ending node.
    #[must_use]
    pub fn ending(content: impl Into<String>, is_winning_ending: bool) -> Self {
        Self {
            content: content.into(),
            is_ending: true,
            is_winning_ending,
            options: Vec::new(),
        }
    }

    /// A branching node with the given `(text, child)` choices, in order.
    #[must_use]
    pub fn branch<T: Into<String>>(
        content: impl Into<String>,
        options: impl IntoIterator<Item = (T, NodeDescription)>,
    ) -> Self {
        Self {
            content: content.into(),
            is_ending: false,
            is_winning_ending: false,
            options: options
                .into_iter()
                .map(|(text, next_node)| OptionDescription {
                    text: text.into(),
                    next_node,
                })
                .collect(),
        }
    }
}

impl StoryDescription {
    /// Parses raw generator output.
    ///
    /// The output may wrap the JSON document in a Markdown code fence or
    /// surrounding prose; the outermost `{ ... }` span is decoded. Nesting
    /// depth is not limited: the deserializer grows its stack on demand
    /// instead of applying `serde_json`'s recursion limit.
    ///
    /// Only the structure is checked. Blank text and non-ending nodes
    /// without options are accepted as they are.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::GenerationFormat` if no JSON object is present
    /// or if it does not match the schema.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let json = extract_json_object(raw).ok_or_else(|| {
            DomainError::GenerationFormat("generator output contains no JSON object".to_owned())
        })?;

        let mut de = serde_json::Deserializer::from_str(json);
        de.disable_recursion_limit();
        let description =
            Self::deserialize(serde_stacker::Deserializer::new(&mut de)).map_err(schema_error)?;
        de.end().map_err(schema_error)?;
        Ok(description)
    }

    /// Number of nodes that materializing this description persists.
    /// Options of ending nodes are not counted.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root_node];
        while let Some(node) = stack.pop() {
            count += 1;
            if !node.is_ending {
                stack.extend(node.options.iter().map(|option| &option.next_node));
            }
        }
        count
    }
}

fn schema_error(err: serde_json::Error) -> DomainError {
    DomainError::GenerationFormat(format!("story description does not match schema: {err}"))
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
