//! Storyforge Core: shared domain abstractions.
//!
//! This crate defines the identifiers, error taxonomy and ports (repository
//! and generator traits) that the story and job contexts depend on. It
//! contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod generator;
pub mod ids;
pub mod repository;
