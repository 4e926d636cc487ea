//! Route modules organized by bounded context.

pub mod health;
pub mod jobs;
pub mod stories;
