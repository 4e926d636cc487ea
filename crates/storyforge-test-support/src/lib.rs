//! Shared test mocks and utilities for the Storyforge service.

mod clock;
mod generator;
mod repository;

pub use clock::FixedClock;
pub use generator::{FailingGenerator, GatedGenerator, PanickingGenerator, ScriptedGenerator};
pub use repository::{
    FailingJobRepository, FailingStoryRepository, InMemoryJobRepository, InMemoryStoryRepository,
};
