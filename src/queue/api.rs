//! Public API for the queue system
//!
//! External modules should import from here rather than directly from
//! internal modules.

// Registry and handles
pub use crate::queue::consumer::{BufferCommitter, PullConsumer};
pub use crate::queue::manager::{BufferQueue, BufferQueueBuilder};
pub use crate::queue::producer::Producer;
pub use crate::queue::topic::{assign_partitions, TopicStore};

// Storage
pub use crate::queue::partition::{Partition, PartitionReader};

// Configuration
pub use crate::queue::options::{
    PullConsumerOptions, TopicOptions, DEFAULT_BATCH_SIZE, DEFAULT_PARTITION_NUMBER,
    DEFAULT_SEGMENT_SIZE,
};

// Error handling
pub use crate::queue::error::{ErrorKind, QueueError, QueueResult};

// Batches and statistics
pub use crate::queue::types::{Batch, GroupAssignment, GroupLag, PartitionStats, TopicStats};
