//! Domain layer of the job context.

pub mod aggregates;
pub mod commands;
