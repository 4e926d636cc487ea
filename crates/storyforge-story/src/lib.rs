//! Storyforge: Story generation bounded context.
//!
//! Responsible for turning generator output into a typed story description,
//! materializing that description into a persisted node tree, and projecting
//! committed trees into read models.

pub mod application;
pub mod domain;
