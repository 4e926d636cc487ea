//! `PostgreSQL` implementation of the `StoryRepository` trait.
//!
//! A `PgStoryTransaction` wraps one `sqlx::Transaction`. Node ids come from
//! `BIGSERIAL` via `RETURNING id`, so they are known before commit while
//! staying invisible to other connections until then.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use storyforge_core::error::DomainError;
use storyforge_core::ids::{NodeId, StoryId};
use storyforge_core::repository::{
    NewStory, NewStoryNode, StoredNode, StoredStory, StoryOption, StoryRepository,
    StoryTransaction,
};

use crate::persistence;

/// PostgreSQL-backed story repository.
#[derive(Debug, Clone)]
pub struct PgStoryRepository {
    pool: PgPool,
}

impl PgStoryRepository {
    /// Creates a new `PgStoryRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct StoryRow {
    id: i64,
    title: String,
    session_id: String,
    created_at: DateTime<Utc>,
}

impl From<StoryRow> for StoredStory {
    fn from(row: StoryRow) -> Self {
        Self {
            id: StoryId(row.id),
            title: row.title,
            session_id: row.session_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NodeRow {
    id: i64,
    story_id: i64,
    content: String,
    is_root: bool,
    is_ending: bool,
    is_winning_ending: bool,
    options: Json<Vec<StoryOption>>,
}

impl From<NodeRow> for StoredNode {
    fn from(row: NodeRow) -> Self {
        Self {
            id: NodeId(row.id),
            story_id: StoryId(row.story_id),
            content: row.content,
            is_root: row.is_root,
            is_ending: row.is_ending,
            is_winning_ending: row.is_winning_ending,
            options: row.options.0,
        }
    }
}

#[async_trait]
impl StoryRepository for PgStoryRepository {
    async fn begin(&self) -> Result<Box<dyn StoryTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| persistence("failed to begin transaction", &e))?;
        Ok(Box::new(PgStoryTransaction { tx }))
    }

    async fn find_story(&self, story_id: StoryId) -> Result<Option<StoredStory>, DomainError> {
        let row: Option<StoryRow> = sqlx::query_as(
            "SELECT id, title, session_id, created_at FROM stories WHERE id = $1",
        )
        .bind(story_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| persistence("failed to load story", &e))?;
        Ok(row.map(StoredStory::from))
    }

    async fn list_nodes(&self, story_id: StoryId) -> Result<Vec<StoredNode>, DomainError> {
        let rows: Vec<NodeRow> = sqlx::query_as(
            "SELECT id, story_id, content, is_root, is_ending, is_winning_ending, options \
             FROM story_nodes WHERE story_id = $1 ORDER BY id",
        )
        .bind(story_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| persistence("failed to load story nodes", &e))?;
        Ok(rows.into_iter().map(StoredNode::from).collect())
    }
}

/// An open `PostgreSQL` transaction over story rows.
pub struct PgStoryTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoryTransaction for PgStoryTransaction {
    async fn insert_story(&mut self, story: &NewStory) -> Result<StoryId, DomainError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO stories (title, session_id, created_at) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&story.title)
        .bind(&story.session_id)
        .bind(story.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| persistence("failed to insert story", &e))?;
        Ok(StoryId(id))
    }

    async fn insert_node(&mut self, node: &NewStoryNode) -> Result<NodeId, DomainError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO story_nodes \
             (story_id, content, is_root, is_ending, is_winning_ending, options) \
             VALUES ($1, $2, $3, $4, $5, '[]'::jsonb) RETURNING id",
        )
        .bind(node.story_id.0)
        .bind(&node.content)
        .bind(node.is_root)
        .bind(node.is_ending)
        .bind(node.is_winning_ending)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| persistence("failed to insert story node", &e))?;
        Ok(NodeId(id))
    }

    async fn set_node_options(
        &mut self,
        node_id: NodeId,
        options: &[StoryOption],
    ) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE story_nodes SET options = $2 WHERE id = $1")
            .bind(node_id.0)
            .bind(Json(options))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| persistence("failed to set node options", &e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::Persistence(format!(
                "node {node_id} not found in transaction"
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| persistence("failed to commit story", &e))?;
        debug!("story transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| persistence("failed to roll back story", &e))
    }
}
