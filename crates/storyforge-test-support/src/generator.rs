//! Test generators: canned `NarrativeGenerator` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use storyforge_core::error::DomainError;
use storyforge_core::generator::NarrativeGenerator;
use tokio::sync::Semaphore;

/// A generator that returns the same raw output for every theme and records
/// the themes it was called with.
#[derive(Debug)]
pub struct ScriptedGenerator {
    output: String,
    themes: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    /// Create a generator that always answers with `output`.
    #[must_use]
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            themes: Mutex::new(Vec::new()),
        }
    }

    /// Returns the themes passed to `generate`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn themes(&self) -> Vec<String> {
        self.themes.lock().unwrap().clone()
    }
}

#[async_trait]
impl NarrativeGenerator for ScriptedGenerator {
    async fn generate(&self, theme: &str) -> Result<String, DomainError> {
        self.themes.lock().unwrap().push(theme.to_owned());
        Ok(self.output.clone())
    }
}

/// A generator that always fails as if the provider were unreachable.
#[derive(Debug)]
pub struct FailingGenerator;

#[async_trait]
impl NarrativeGenerator for FailingGenerator {
    async fn generate(&self, _theme: &str) -> Result<String, DomainError> {
        Err(DomainError::Generation("model endpoint unavailable".into()))
    }
}

/// A generator that panics. Used to check that a crashing job still reaches
/// a terminal state.
#[derive(Debug)]
pub struct PanickingGenerator;

#[async_trait]
impl NarrativeGenerator for PanickingGenerator {
    async fn generate(&self, _theme: &str) -> Result<String, DomainError> {
        panic!("generator exploded");
    }
}

/// A generator that blocks every call until the test calls `release`.
/// Lets tests observe a job while it is still `processing`.
#[derive(Debug)]
pub struct GatedGenerator {
    output: String,
    gate: Semaphore,
}

impl GatedGenerator {
    /// Create a closed gate that answers with `output` once opened.
    #[must_use]
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            gate: Semaphore::new(0),
        }
    }

    /// Lets one pending or future `generate` call through.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl NarrativeGenerator for GatedGenerator {
    async fn generate(&self, _theme: &str) -> Result<String, DomainError> {
        self.gate
            .acquire()
            .await
            .map_err(|e| DomainError::Generation(format!("gate closed: {e}")))?
            .forget();
        Ok(self.output.clone())
    }
}
