//! Storyforge: narrative generator backed by an OpenAI-compatible
//! chat-completions endpoint.

pub mod error;
pub mod openai;
pub mod prompt;

pub use error::GeneratorError;
pub use openai::{OpenAiConfig, OpenAiGenerator};
