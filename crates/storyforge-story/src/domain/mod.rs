//! Domain layer of the story context.

pub mod commands;
pub mod description;
