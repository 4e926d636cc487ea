//! Generator error types.

use storyforge_core::error::DomainError;
use thiserror::Error;

/// Errors raised while talking to the chat-completions endpoint.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The HTTP client could not be built.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        message: String,
    },

    /// The response body was not a chat-completions payload.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The response contained no message content.
    #[error("response contained no message content")]
    EmptyResponse,
}

impl From<GeneratorError> for DomainError {
    fn from(err: GeneratorError) -> Self {
        DomainError::Generation(err.to_string())
    }
}
