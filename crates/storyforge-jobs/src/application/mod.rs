//! Application layer of the job context.

pub mod command_handlers;
pub mod query_handlers;
pub mod worker;
