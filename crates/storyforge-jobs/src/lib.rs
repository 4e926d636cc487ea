//! Storyforge: Story job lifecycle bounded context.
//!
//! Responsible for creating generation jobs that clients can poll
//! immediately, executing them on background tasks, and recording exactly
//! one terminal outcome per job.

pub mod application;
pub mod domain;
