//! Command abstractions.

use uuid::Uuid;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command, used as a span/log field.
    fn command_type(&self) -> &'static str;

    /// Correlation ID linking the request that issued the command to the
    /// background work it triggers.
    fn correlation_id(&self) -> Uuid;
}
