//! Topic and pull-consumer options
//!
//! Both structs deserialize from TOML/JSON with defaults for every field except
//! the names, and are validated when a topic is registered or consumers are
//! created.

use crate::core::validation::{validate_group_name, validate_positive, validate_topic_name};
use crate::queue::error::QueueResult;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PARTITION_NUMBER: usize = 1;
pub const DEFAULT_SEGMENT_SIZE: usize = 1024;
pub const DEFAULT_BATCH_SIZE: usize = 100;

fn default_partition_number() -> usize {
    DEFAULT_PARTITION_NUMBER
}

fn default_segment_size() -> usize {
    DEFAULT_SEGMENT_SIZE
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Registration options for one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicOptions {
    pub topic_name: String,
    /// Fixed number of partitions; never changes after registration
    #[serde(default = "default_partition_number")]
    pub partition_number: usize,
    /// Slots per storage segment
    #[serde(default = "default_segment_size")]
    pub segment_size: usize,
    /// Ceiling on undrained items across all partitions; `None` is unbounded
    #[serde(default)]
    pub bounded_capacity: Option<u64>,
}

impl TopicOptions {
    pub fn new(topic_name: impl Into<String>) -> Self {
        Self {
            topic_name: topic_name.into(),
            partition_number: DEFAULT_PARTITION_NUMBER,
            segment_size: DEFAULT_SEGMENT_SIZE,
            bounded_capacity: None,
        }
    }

    pub fn with_partitions(mut self, partition_number: usize) -> Self {
        self.partition_number = partition_number;
        self
    }

    pub fn with_segment_size(mut self, segment_size: usize) -> Self {
        self.segment_size = segment_size;
        self
    }

    pub fn with_bounded_capacity(mut self, capacity: u64) -> Self {
        self.bounded_capacity = Some(capacity);
        self
    }

    pub fn validate(&self) -> QueueResult<()> {
        validate_topic_name(&self.topic_name)?;
        validate_positive("partition_number", self.partition_number as u64)?;
        validate_positive("segment_size", self.segment_size as u64)?;
        if let Some(capacity) = self.bounded_capacity {
            validate_positive("bounded_capacity", capacity)?;
        }
        Ok(())
    }
}

/// Options for creating the pull consumers of one consumer group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullConsumerOptions {
    pub topic_name: String,
    pub group_name: String,
    #[serde(default)]
    pub auto_commit: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl PullConsumerOptions {
    pub fn new(topic_name: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self {
            topic_name: topic_name.into(),
            group_name: group_name.into(),
            auto_commit: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    pub fn validate(&self) -> QueueResult<()> {
        validate_topic_name(&self.topic_name)?;
        validate_group_name(&self.group_name)?;
        validate_positive("batch_size", self.batch_size as u64)
    }
}
