//! Type definitions for the queue system
//!
//! Snapshot structures returned by topic statistics and consumer-group lag
//! queries. Values are read without a global lock and may be slightly stale
//! under concurrent produce/drain.

use std::ops::Range;
use std::sync::Arc;

/// A non-empty batch of items delivered to a consumer
pub type Batch<T> = Vec<Arc<T>>;

/// Per-partition storage statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionStats {
    pub partition: usize,
    /// Items appended over the partition's lifetime
    pub appended: u64,
    /// Offset every consumer group has drained past
    pub low_watermark: u64,
    /// Items still counted against the topic's capacity
    pub approximate_length: u64,
    /// Storage segments still linked into the partition
    pub retained_segments: usize,
}

/// Storage statistics for one topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicStats {
    pub topic_name: String,
    pub bounded_capacity: Option<u64>,
    pub group_count: usize,
    pub partitions: Vec<PartitionStats>,
}

impl TopicStats {
    pub fn total_appended(&self) -> u64 {
        self.partitions.iter().map(|p| p.appended).sum()
    }

    pub fn total_length(&self) -> u64 {
        self.partitions.iter().map(|p| p.approximate_length).sum()
    }
}

/// Lag of one consumer group across the topic's partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLag {
    pub group_name: String,
    /// `(partition, appended - group offset)` in partition order
    pub partitions: Vec<(usize, u64)>,
    pub total_lag: u64,
    pub max_lag: u64,
}

/// Partition ranges owned by each consumer of a group, in consumer order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    pub group_name: String,
    pub auto_commit: bool,
    pub batch_size: usize,
    pub consumers: Vec<Range<usize>>,
}
