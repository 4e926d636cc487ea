//! Repository abstractions for jobs and stories.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{JobId, NodeId, StoryId};

/// Lifecycle state of a story generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created; the worker has not reached a terminal outcome yet.
    Processing,
    /// The story was generated and committed.
    Completed,
    /// Generation or persistence failed.
    Failed,
}

impl JobStatus {
    /// Returns the stored/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition may leave this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::Persistence(format!(
                "unknown job status {other:?}"
            ))),
        }
    }
}

/// Stored representation of a story generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredJob {
    /// Client-facing job identifier.
    pub job_id: JobId,
    /// Session that requested the story.
    pub session_id: String,
    /// Theme passed to the generator.
    pub theme: String,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// The generated story, set only when `status` is `Completed`.
    pub story_id: Option<StoryId>,
    /// Failure message, set only when `status` is `Failed`.
    pub error: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Repository for story generation jobs.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Persists a newly created job.
    async fn insert_job(&self, job: &StoredJob) -> Result<(), DomainError>;

    /// Point lookup by job identifier.
    async fn find_job(&self, job_id: JobId) -> Result<Option<StoredJob>, DomainError>;

    /// Writes the terminal fields (`status`, `story_id`, `error`,
    /// `completed_at`) of `job` in a single atomic update.
    ///
    /// Only a job that is still `processing` in the store may be updated;
    /// anything else is rejected with `DomainError::InvalidTransition`, and a
    /// job missing from the store yields `DomainError::JobNotFound`.
    async fn record_outcome(&self, job: &StoredJob) -> Result<(), DomainError>;
}

/// A story row that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewStory {
    /// Story title.
    pub title: String,
    /// Session that owns the story.
    pub session_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Stored representation of a story header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredStory {
    /// Story identifier.
    pub id: StoryId,
    /// Story title.
    pub title: String,
    /// Session that owns the story.
    pub session_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A labeled edge from a node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryOption {
    /// Choice text shown to the reader.
    pub text: String,
    /// The child node this choice leads to.
    pub node_id: NodeId,
}

/// A node row that has not been inserted yet. Options are attached later
/// with `StoryTransaction::set_node_options`, once every child has an id.
#[derive(Debug, Clone)]
pub struct NewStoryNode {
    /// Owning story.
    pub story_id: StoryId,
    /// Narrative text.
    pub content: String,
    /// Whether this is the story's entry node.
    pub is_root: bool,
    /// Whether this node ends the story.
    pub is_ending: bool,
    /// Whether this ending is a winning one.
    pub is_winning_ending: bool,
}

/// Stored representation of a story node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNode {
    /// Node identifier.
    pub id: NodeId,
    /// Owning story.
    pub story_id: StoryId,
    /// Narrative text.
    pub content: String,
    /// Whether this is the story's entry node.
    pub is_root: bool,
    /// Whether this node ends the story.
    pub is_ending: bool,
    /// Whether this ending is a winning one.
    pub is_winning_ending: bool,
    /// Ordered outgoing choices; empty for endings.
    pub options: Vec<StoryOption>,
}

/// A unit of work over story rows. Ids are assigned on insert, before
/// commit; nothing becomes visible to other readers until `commit`.
/// Dropping a transaction without committing discards it.
#[async_trait]
pub trait StoryTransaction: Send {
    /// Inserts a story header and returns its assigned id.
    async fn insert_story(&mut self, story: &NewStory) -> Result<StoryId, DomainError>;

    /// Inserts a node with an empty option list and returns its assigned id.
    async fn insert_node(&mut self, node: &NewStoryNode) -> Result<NodeId, DomainError>;

    /// Replaces the option list of a node inserted in this transaction.
    async fn set_node_options(
        &mut self,
        node_id: NodeId,
        options: &[StoryOption],
    ) -> Result<(), DomainError>;

    /// Makes every write of this transaction visible atomically.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discards every write of this transaction.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

/// Repository for stories and their node trees.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Opens a new transaction, independent of any other caller's.
    async fn begin(&self) -> Result<Box<dyn StoryTransaction>, DomainError>;

    /// Point lookup of a committed story.
    async fn find_story(&self, story_id: StoryId) -> Result<Option<StoredStory>, DomainError>;

    /// All committed nodes of a story, in id order.
    async fn list_nodes(&self, story_id: StoryId) -> Result<Vec<StoredNode>, DomainError>;
}
