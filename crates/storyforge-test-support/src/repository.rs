//! Test repositories: in-memory and failing implementations of the job and
//! story repository ports.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use storyforge_core::error::DomainError;
use storyforge_core::ids::{JobId, NodeId, StoryId};
use storyforge_core::repository::{
    JobRepository, JobStatus, NewStory, NewStoryNode, StoredJob, StoredNode, StoredStory,
    StoryOption, StoryRepository, StoryTransaction,
};

fn connection_refused() -> DomainError {
    DomainError::Persistence("connection refused".into())
}

/// A job repository backed by a map. Enforces the same guarded terminal
/// update as the PostgreSQL repository.
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<HashMap<JobId, StoredJob>>,
    outcome_writes: Mutex<usize>,
    failing_outcome_writes: Mutex<usize>,
    failing_finds: Mutex<usize>,
}

impl InMemoryJobRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to `record_outcome` fail with a
    /// persistence error without touching the stored job.
    #[must_use]
    pub fn failing_outcome_writes(self, count: usize) -> Self {
        *self.failing_outcome_writes.lock().unwrap() = count;
        self
    }

    /// Make the next `count` calls to `find_job` fail with a persistence
    /// error. Later calls read the stored job as usual.
    #[must_use]
    pub fn failing_finds(self, count: usize) -> Self {
        self.fail_next_finds(count);
        self
    }

    /// Like `failing_finds`, for a repository that is already shared.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_next_finds(&self, count: usize) {
        *self.failing_finds.lock().unwrap() = count;
    }

    /// Returns a snapshot of a stored job.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn job(&self, job_id: JobId) -> Option<StoredJob> {
        self.jobs.lock().unwrap().get(&job_id).cloned()
    }

    /// Deletes a job, as an external retention process would.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn remove(&self, job_id: JobId) {
        self.jobs.lock().unwrap().remove(&job_id);
    }

    /// Number of successful `record_outcome` calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn outcome_writes(&self) -> usize {
        *self.outcome_writes.lock().unwrap()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn insert_job(&self, job: &StoredJob) -> Result<(), DomainError> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&job.job_id) {
            return Err(DomainError::Persistence(format!(
                "duplicate job id {}",
                job.job_id
            )));
        }
        jobs.insert(job.job_id, job.clone());
        Ok(())
    }

    async fn find_job(&self, job_id: JobId) -> Result<Option<StoredJob>, DomainError> {
        {
            let mut failing = self.failing_finds.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(connection_refused());
            }
        }
        Ok(self.job(job_id))
    }

    async fn record_outcome(&self, job: &StoredJob) -> Result<(), DomainError> {
        {
            let mut failing = self.failing_outcome_writes.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(connection_refused());
            }
        }

        let mut jobs = self.jobs.lock().unwrap();
        let stored = jobs
            .get_mut(&job.job_id)
            .ok_or(DomainError::JobNotFound(job.job_id))?;
        if stored.status != JobStatus::Processing {
            return Err(DomainError::InvalidTransition {
                job_id: job.job_id,
                from: stored.status,
                to: job.status,
            });
        }
        stored.status = job.status;
        stored.story_id = job.story_id;
        stored.error.clone_from(&job.error);
        stored.completed_at = job.completed_at;
        drop(jobs);

        *self.outcome_writes.lock().unwrap() += 1;
        Ok(())
    }
}

/// A job repository that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingJobRepository;

#[async_trait]
impl JobRepository for FailingJobRepository {
    async fn insert_job(&self, _job: &StoredJob) -> Result<(), DomainError> {
        Err(connection_refused())
    }

    async fn find_job(&self, _job_id: JobId) -> Result<Option<StoredJob>, DomainError> {
        Err(connection_refused())
    }

    async fn record_outcome(&self, _job: &StoredJob) -> Result<(), DomainError> {
        Err(connection_refused())
    }
}

#[derive(Debug, Default)]
struct StoryState {
    next_story_id: i64,
    next_node_id: i64,
    stories: BTreeMap<StoryId, StoredStory>,
    nodes: BTreeMap<NodeId, StoredNode>,
    transactions_begun: usize,
    rollbacks: usize,
    story_reads: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct StoryFaults {
    fail_on_commit: bool,
    node_insert_budget: Option<usize>,
}

/// A story repository with transactional semantics: ids are allocated from
/// shared sequences at insert time, but rows only become visible to
/// `find_story`/`list_nodes` once the transaction commits.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStoryRepository {
    state: Arc<Mutex<StoryState>>,
    faults: StoryFaults,
}

impl InMemoryStoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every commit fail with a persistence error.
    #[must_use]
    pub fn failing_on_commit(mut self) -> Self {
        self.faults.fail_on_commit = true;
        self
    }

    /// Allow `count` node inserts per transaction; the next one fails with
    /// a persistence error.
    #[must_use]
    pub fn failing_node_insert_after(mut self, count: usize) -> Self {
        self.faults.node_insert_budget = Some(count);
        self
    }

    /// Inserts an already committed story, bypassing every invariant. Used
    /// to construct trees the materializer would never produce.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, story: StoredStory, nodes: Vec<StoredNode>) {
        let mut state = self.state.lock().unwrap();
        state.next_story_id = state.next_story_id.max(story.id.0);
        for node in nodes {
            state.next_node_id = state.next_node_id.max(node.id.0);
            state.nodes.insert(node.id, node);
        }
        state.stories.insert(story.id, story);
    }

    /// Number of committed stories.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn committed_story_count(&self) -> usize {
        self.state.lock().unwrap().stories.len()
    }

    /// Number of committed nodes across all stories.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn committed_node_count(&self) -> usize {
        self.state.lock().unwrap().nodes.len()
    }

    /// Number of transactions opened so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn transactions_begun(&self) -> usize {
        self.state.lock().unwrap().transactions_begun
    }

    /// Number of explicit rollbacks so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    /// Number of `find_story` calls so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn story_reads(&self) -> usize {
        self.state.lock().unwrap().story_reads
    }
}

#[async_trait]
impl StoryRepository for InMemoryStoryRepository {
    async fn begin(&self) -> Result<Box<dyn StoryTransaction>, DomainError> {
        self.state.lock().unwrap().transactions_begun += 1;
        Ok(Box::new(InMemoryStoryTransaction {
            state: Arc::clone(&self.state),
            faults: self.faults,
            node_inserts: 0,
            stories: Vec::new(),
            nodes: BTreeMap::new(),
        }))
    }

    async fn find_story(&self, story_id: StoryId) -> Result<Option<StoredStory>, DomainError> {
        let mut state = self.state.lock().unwrap();
        state.story_reads += 1;
        Ok(state.stories.get(&story_id).cloned())
    }

    async fn list_nodes(&self, story_id: StoryId) -> Result<Vec<StoredNode>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .nodes
            .values()
            .filter(|node| node.story_id == story_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug)]
struct InMemoryStoryTransaction {
    state: Arc<Mutex<StoryState>>,
    faults: StoryFaults,
    node_inserts: usize,
    stories: Vec<StoredStory>,
    nodes: BTreeMap<NodeId, StoredNode>,
}

#[async_trait]
impl StoryTransaction for InMemoryStoryTransaction {
    async fn insert_story(&mut self, story: &NewStory) -> Result<StoryId, DomainError> {
        let id = {
            let mut state = self.state.lock().unwrap();
            state.next_story_id += 1;
            StoryId(state.next_story_id)
        };
        self.stories.push(StoredStory {
            id,
            title: story.title.clone(),
            session_id: story.session_id.clone(),
            created_at: story.created_at,
        });
        Ok(id)
    }

    async fn insert_node(&mut self, node: &NewStoryNode) -> Result<NodeId, DomainError> {
        if self
            .faults
            .node_insert_budget
            .is_some_and(|budget| self.node_inserts >= budget)
        {
            return Err(DomainError::Persistence("node insert rejected".into()));
        }
        self.node_inserts += 1;

        let id = {
            let mut state = self.state.lock().unwrap();
            state.next_node_id += 1;
            NodeId(state.next_node_id)
        };
        self.nodes.insert(
            id,
            StoredNode {
                id,
                story_id: node.story_id,
                content: node.content.clone(),
                is_root: node.is_root,
                is_ending: node.is_ending,
                is_winning_ending: node.is_winning_ending,
                options: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn set_node_options(
        &mut self,
        node_id: NodeId,
        options: &[StoryOption],
    ) -> Result<(), DomainError> {
        let node = self.nodes.get_mut(&node_id).ok_or_else(|| {
            DomainError::Persistence(format!("node {node_id} not found in transaction"))
        })?;
        node.options = options.to_vec();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        if self.faults.fail_on_commit {
            return Err(DomainError::Persistence("commit rejected".into()));
        }
        let this = *self;
        let mut state = this.state.lock().unwrap();
        for story in this.stories {
            state.stories.insert(story.id, story);
        }
        state.nodes.extend(this.nodes);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}

/// A story repository whose every operation fails with a persistence error.
#[derive(Debug)]
pub struct FailingStoryRepository;

#[async_trait]
impl StoryRepository for FailingStoryRepository {
    async fn begin(&self) -> Result<Box<dyn StoryTransaction>, DomainError> {
        Err(connection_refused())
    }

    async fn find_story(&self, _story_id: StoryId) -> Result<Option<StoredStory>, DomainError> {
        Err(connection_refused())
    }

    async fn list_nodes(&self, _story_id: StoryId) -> Result<Vec<StoredNode>, DomainError> {
        Err(connection_refused())
    }
}
