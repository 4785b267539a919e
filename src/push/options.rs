//! Push consumer descriptors

use crate::core::validation::{validate_group_name, validate_positive, validate_topic_name};
use crate::queue::api::{PullConsumerOptions, QueueResult, DEFAULT_BATCH_SIZE};
use serde::{Deserialize, Serialize};

/// Which handler contract receives batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Batches count as processed when delivered
    #[default]
    Auto,
    /// Handlers receive a committer and checkpoint explicitly
    Manual,
}

impl CommitMode {
    pub fn contract_name(&self) -> &'static str {
        match self {
            CommitMode::Auto => "auto-commit",
            CommitMode::Manual => "manual-commit",
        }
    }
}

/// How handler instances are resolved for each batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerLifetime {
    /// One instance per descriptor, shared by all of its loops
    #[default]
    Singleton,
    /// A fresh instance per batch, released when the batch is done
    Scoped,
    /// A fresh instance per batch, released when the batch is done
    Transient,
}

impl HandlerLifetime {
    pub fn is_per_batch(&self) -> bool {
        !matches!(self, HandlerLifetime::Singleton)
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_concurrency() -> usize {
    1
}

/// Declarative description of one push consumer group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConsumerOptions {
    pub topic_name: String,
    pub group_name: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Number of pull consumers, and therefore concurrent loops
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub commit_mode: CommitMode,
    #[serde(default)]
    pub lifetime: HandlerLifetime,
}

impl PushConsumerOptions {
    pub fn new(topic_name: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self {
            topic_name: topic_name.into(),
            group_name: group_name.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: 1,
            commit_mode: CommitMode::default(),
            lifetime: HandlerLifetime::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_commit_mode(mut self, commit_mode: CommitMode) -> Self {
        self.commit_mode = commit_mode;
        self
    }

    pub fn with_lifetime(mut self, lifetime: HandlerLifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn validate(&self) -> QueueResult<()> {
        validate_topic_name(&self.topic_name)?;
        validate_group_name(&self.group_name)?;
        validate_positive("batch_size", self.batch_size as u64)?;
        validate_positive("concurrency", self.concurrency as u64)
    }

    pub fn pull_options(&self) -> PullConsumerOptions {
        PullConsumerOptions::new(self.topic_name.clone(), self.group_name.clone())
            .with_batch_size(self.batch_size)
            .with_auto_commit(self.commit_mode == CommitMode::Auto)
    }
}
