//! Application layer of the story context.

pub mod command_handlers;
pub mod materializer;
pub mod query_handlers;
