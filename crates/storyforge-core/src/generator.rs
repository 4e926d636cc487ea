//! Narrative generation port.

use async_trait::async_trait;

use crate::error::DomainError;

/// An external capability that turns a theme into a raw story description.
///
/// The output is opaque text; callers parse it. Implementations
/// report transport and provider failures as `DomainError::Generation`.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Generates a story description for `theme`.
    async fn generate(&self, theme: &str) -> Result<String, DomainError>;
}
