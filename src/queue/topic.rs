//! Topic store and consumer-group coordinator
//!
//! A `TopicStore` owns the fixed partition array of one topic, the topic's
//! producer, and the registry of its consumer groups. Group creation is a rare
//! setup-time operation and runs under one coarse lock per topic; produce and
//! drain never touch that lock.

use crate::core::sync::lock_or_fail;
use crate::queue::consumer::PullConsumer;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::options::{PullConsumerOptions, TopicOptions};
use crate::queue::partition::Partition;
use crate::queue::producer::Producer;
use crate::queue::types::{GroupAssignment, GroupLag, PartitionStats, TopicStats};
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Split `partitions` into `consumers` contiguous ranges
///
/// Every consumer gets `partitions / consumers` partitions; the first
/// `partitions % consumers` consumers get one extra. Ranges are increasing and
/// together cover `0..partitions` exactly once.
pub fn assign_partitions(partitions: usize, consumers: usize) -> Vec<Range<usize>> {
    if consumers == 0 {
        return Vec::new();
    }
    let base = partitions / consumers;
    let remainder = partitions % consumers;

    let mut start = 0;
    (0..consumers)
        .map(|consumer| {
            let len = base + usize::from(consumer < remainder);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

struct GroupRecord {
    auto_commit: bool,
    batch_size: usize,
    assignment: Vec<Range<usize>>,
    /// Published drain offset per partition, indexed by partition
    offsets: Vec<Arc<AtomicU64>>,
}

/// Storage for one topic
pub struct TopicStore<T> {
    options: TopicOptions,
    partitions: Arc<[Arc<Partition<T>>]>,
    producer: Producer<T>,
    groups: Mutex<BTreeMap<String, GroupRecord>>,
}

impl<T> TopicStore<T> {
    pub fn new(options: TopicOptions) -> QueueResult<Self> {
        options.validate()?;

        let partitions: Arc<[Arc<Partition<T>>]> = (0..options.partition_number)
            .map(|index| Arc::new(Partition::new(index, options.segment_size)))
            .collect::<Vec<_>>()
            .into();
        let producer = Producer::new(
            options.topic_name.clone(),
            Arc::clone(&partitions),
            options.bounded_capacity,
        );

        log::debug!(
            "Created topic '{}' with {} partitions (segment size {}, capacity {:?})",
            options.topic_name,
            options.partition_number,
            options.segment_size,
            options.bounded_capacity
        );

        Ok(Self {
            options,
            partitions,
            producer,
            groups: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.options.topic_name
    }

    pub fn options(&self) -> &TopicOptions {
        &self.options
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition(&self, index: usize) -> Option<&Arc<Partition<T>>> {
        self.partitions.get(index)
    }

    pub fn producer(&self) -> Producer<T> {
        self.producer.clone()
    }

    /// Create the consumers of a new consumer group
    ///
    /// All validation happens before any state changes. The group name check
    /// and the registration are atomic under the topic's group lock, and the
    /// group's partition assignment never changes afterwards.
    pub fn create_consumers(
        &self,
        options: &PullConsumerOptions,
        consumer_number: usize,
    ) -> QueueResult<Vec<PullConsumer<T>>> {
        options.validate()?;
        if options.topic_name != self.options.topic_name {
            return Err(QueueError::TopicNotRegistered {
                topic: options.topic_name.clone(),
            });
        }
        let partition_count = self.partitions.len();
        if consumer_number == 0 || consumer_number > partition_count {
            return Err(QueueError::ConsumerNumberOutOfRange {
                topic: self.options.topic_name.clone(),
                requested: consumer_number,
                partitions: partition_count,
            });
        }

        let mut groups = lock_or_fail(&self.groups, "consumer group registry")?;
        if groups.contains_key(&options.group_name) {
            return Err(QueueError::GroupAlreadyExists {
                topic: self.options.topic_name.clone(),
                group: options.group_name.clone(),
            });
        }

        let assignment = assign_partitions(partition_count, consumer_number);
        let mut readers = self
            .partitions
            .iter()
            .map(|partition| partition.register_reader())
            .collect::<QueueResult<Vec<_>>>()?;
        let offsets = readers.iter().map(|reader| reader.position()).collect();

        // Hand out readers back to front so each range can be split off the tail
        let mut consumers = Vec::with_capacity(consumer_number);
        for range in assignment.iter().rev() {
            let owned = readers.split_off(range.start);
            consumers.push(PullConsumer::new(
                self.options.topic_name.clone(),
                options.group_name.clone(),
                options.batch_size,
                options.auto_commit,
                range.clone(),
                owned,
            ));
        }
        consumers.reverse();

        log::debug!(
            "Created consumer group '{}' on topic '{}': {} consumers over {} partitions {:?}",
            options.group_name,
            self.options.topic_name,
            consumer_number,
            partition_count,
            assignment
        );

        groups.insert(
            options.group_name.clone(),
            GroupRecord {
                auto_commit: options.auto_commit,
                batch_size: options.batch_size,
                assignment,
                offsets,
            },
        );

        Ok(consumers)
    }

    /// Registered group names in sorted order
    pub fn group_names(&self) -> QueueResult<Vec<String>> {
        let groups = lock_or_fail(&self.groups, "consumer group registry")?;
        Ok(groups.keys().cloned().collect())
    }

    pub fn group_assignment(&self, group_name: &str) -> QueueResult<Option<GroupAssignment>> {
        let groups = lock_or_fail(&self.groups, "consumer group registry")?;
        Ok(groups.get(group_name).map(|record| GroupAssignment {
            group_name: group_name.to_string(),
            auto_commit: record.auto_commit,
            batch_size: record.batch_size,
            consumers: record.assignment.clone(),
        }))
    }

    /// How far a group trails the producers, per partition
    pub fn group_lag(&self, group_name: &str) -> QueueResult<Option<GroupLag>> {
        let groups = lock_or_fail(&self.groups, "consumer group registry")?;
        let Some(record) = groups.get(group_name) else {
            return Ok(None);
        };

        let partitions: Vec<(usize, u64)> = self
            .partitions
            .iter()
            .zip(&record.offsets)
            .map(|(partition, offset)| {
                let lag = partition
                    .appended()
                    .saturating_sub(offset.load(Ordering::Acquire));
                (partition.index(), lag)
            })
            .collect();

        Ok(Some(GroupLag {
            group_name: group_name.to_string(),
            total_lag: partitions.iter().map(|(_, lag)| lag).sum(),
            max_lag: partitions.iter().map(|(_, lag)| *lag).max().unwrap_or(0),
            partitions,
        }))
    }

    /// Best-effort total of items still counted against capacity
    pub fn approximate_length(&self) -> u64 {
        self.partitions
            .iter()
            .map(|partition| partition.approximate_length())
            .sum()
    }

    pub fn stats(&self) -> QueueResult<TopicStats> {
        let group_count = lock_or_fail(&self.groups, "consumer group registry")?.len();
        let partitions = self
            .partitions
            .iter()
            .map(|partition| {
                Ok(PartitionStats {
                    partition: partition.index(),
                    appended: partition.appended(),
                    low_watermark: partition.low_watermark(),
                    approximate_length: partition.approximate_length(),
                    retained_segments: partition.retained_segments()?,
                })
            })
            .collect::<QueueResult<Vec<_>>>()?;

        Ok(TopicStats {
            topic_name: self.options.topic_name.clone(),
            bounded_capacity: self.options.bounded_capacity,
            group_count,
            partitions,
        })
    }
}
