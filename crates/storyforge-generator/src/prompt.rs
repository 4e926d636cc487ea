//! Prompt text sent with every generation request.

/// System prompt describing the story schema the model must answer with.
///
/// The field names match what `StoryDescription::parse` expects.
pub const STORY_SYSTEM_PROMPT: &str = r#"You are a creative story writer that creates engaging choose-your-own-adventure stories.
Generate a complete branching story with multiple paths and endings in the JSON format described below.

The story should have:
1. A compelling title
2. A starting situation (root node) with 2-3 options
3. Each option should lead to another node with its own options
4. Some paths should lead to endings (both winning and losing)
5. At least one path should lead to a winning ending

Story structure requirements:
- Each node should have 2-3 options except for ending nodes
- The story should be 3-4 levels deep (including the root node)
- Add variety in the path lengths (some end earlier, some later)
- Make sure there is at least one winning path

Answer with a single JSON object and nothing else:
{
  "title": "Story title",
  "rootNode": {
    "content": "The starting situation",
    "isEnding": false,
    "isWinningEnding": false,
    "options": [
      {
        "text": "Option text",
        "nextNode": {
          "content": "What happens next",
          "isEnding": true,
          "isWinningEnding": false,
          "options": []
        }
      }
    ]
  }
}

Ending nodes have "isEnding": true and an empty "options" list."#;

/// Builds the user message for a theme.
#[must_use]
pub fn user_message(theme: &str) -> String {
    format!("Create the story with this theme: {theme}")
}
