//! Pull consumer for one member of a consumer group
//!
//! A pull consumer owns a contiguous range of a topic's partitions for its
//! group and drains them in index order into batches. Empty drains are never
//! handed downstream: the consumer backs off and retries until items arrive or
//! its shutdown signal fires. Cancellation is checked between drain attempts,
//! never inside one.
//!
//! Items leave the group's view of a partition when they are drained, in both
//! commit modes. `commit()` is a checkpoint of what has been delivered, not a
//! redelivery mechanism.

use crate::core::backoff::{Backoff, BackoffPolicy};
use crate::core::shutdown::ShutdownSignal;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::partition::PartitionReader;
use crate::queue::types::Batch;
use futures::Stream;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Delivered and committed offsets for each partition a consumer owns
#[derive(Debug)]
pub(crate) struct CommitState {
    partitions: Range<usize>,
    delivered: Vec<AtomicU64>,
    committed: Vec<AtomicU64>,
}

impl CommitState {
    fn new(partitions: Range<usize>, start_offsets: &[u64]) -> Self {
        Self {
            partitions,
            delivered: start_offsets.iter().map(|o| AtomicU64::new(*o)).collect(),
            committed: start_offsets.iter().map(|o| AtomicU64::new(*o)).collect(),
        }
    }

    fn record_delivery(&self, slot: usize, offset: u64, auto_commit: bool) {
        self.delivered[slot].store(offset, Ordering::Release);
        if auto_commit {
            self.committed[slot].store(offset, Ordering::Release);
        }
    }

    fn checkpoint(&self) {
        for (delivered, committed) in self.delivered.iter().zip(&self.committed) {
            committed.store(delivered.load(Ordering::Acquire), Ordering::Release);
        }
    }

    fn snapshot(&self, offsets: &[AtomicU64]) -> Vec<(usize, u64)> {
        self.partitions
            .clone()
            .zip(offsets)
            .map(|(partition, offset)| (partition, offset.load(Ordering::Acquire)))
            .collect()
    }
}

/// Commit handle passed to manual-commit handlers
///
/// Clones refer to the same consumer's checkpoint.
#[derive(Debug, Clone)]
pub struct BufferCommitter {
    group_name: String,
    auto_commit: bool,
    state: Arc<CommitState>,
}

impl BufferCommitter {
    /// Mark everything delivered so far as processed
    ///
    /// Fails with `AutoCommitEnabled` on auto-commit consumers, whose
    /// checkpoint already follows delivery.
    pub fn commit(&self) -> QueueResult<()> {
        if self.auto_commit {
            return Err(QueueError::AutoCommitEnabled {
                group: self.group_name.clone(),
            });
        }
        self.state.checkpoint();
        Ok(())
    }

    /// `(partition, next offset)` pairs up to which delivery has been committed
    pub fn committed_offsets(&self) -> Vec<(usize, u64)> {
        self.state.snapshot(&self.state.committed)
    }

    /// `(partition, next offset)` pairs up to which items have been delivered
    pub fn delivered_offsets(&self) -> Vec<(usize, u64)> {
        self.state.snapshot(&self.state.delivered)
    }
}

/// Read handle over a consumer's assigned partitions
pub struct PullConsumer<T> {
    topic_name: String,
    group_name: String,
    batch_size: usize,
    auto_commit: bool,
    partitions: Range<usize>,
    readers: Vec<PartitionReader<T>>,
    commits: Arc<CommitState>,
    backoff: Backoff,
}

impl<T> std::fmt::Debug for PullConsumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullConsumer")
            .field("topic_name", &self.topic_name)
            .field("group_name", &self.group_name)
            .field("partitions", &self.partitions)
            .field("batch_size", &self.batch_size)
            .field("auto_commit", &self.auto_commit)
            .finish()
    }
}

impl<T> PullConsumer<T> {
    pub(crate) fn new(
        topic_name: String,
        group_name: String,
        batch_size: usize,
        auto_commit: bool,
        partitions: Range<usize>,
        readers: Vec<PartitionReader<T>>,
    ) -> Self {
        let start_offsets: Vec<u64> = readers.iter().map(PartitionReader::offset).collect();
        let commits = Arc::new(CommitState::new(partitions.clone(), &start_offsets));
        Self {
            topic_name,
            group_name,
            batch_size,
            auto_commit,
            partitions,
            readers,
            commits,
            backoff: BackoffPolicy::default().start(),
        }
    }

    /// Replace the empty-drain backoff policy
    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = policy.start();
        self
    }

    pub fn topic_name(&self) -> &str {
        &self.topic_name
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    /// Contiguous partition range this consumer owns
    pub fn partitions(&self) -> Range<usize> {
        self.partitions.clone()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    pub fn committer(&self) -> BufferCommitter {
        BufferCommitter {
            group_name: self.group_name.clone(),
            auto_commit: self.auto_commit,
            state: Arc::clone(&self.commits),
        }
    }

    /// Commit everything delivered so far (manual-commit consumers only)
    pub fn commit(&self) -> QueueResult<()> {
        self.committer().commit()
    }

    pub fn committed_offsets(&self) -> Vec<(usize, u64)> {
        self.commits.snapshot(&self.commits.committed)
    }

    /// One non-blocking pass over the owned partitions
    ///
    /// Drains each partition in index order until `batch_size` items are
    /// collected or every partition is exhausted. May return an empty batch.
    pub fn try_next_batch(&mut self) -> QueueResult<Batch<T>> {
        let mut batch = Vec::new();
        for (slot, reader) in self.readers.iter_mut().enumerate() {
            let remaining = self.batch_size - batch.len();
            if remaining == 0 {
                break;
            }
            if reader.drain_into(remaining, &mut batch)? > 0 {
                self.commits
                    .record_delivery(slot, reader.offset(), self.auto_commit);
            }
        }
        Ok(batch)
    }

    /// Wait for the next non-empty batch
    ///
    /// Returns `None` once `signal` is triggered, or if draining fails on a
    /// poisoned internal lock (the failure is logged).
    pub async fn next_batch(&mut self, signal: &mut ShutdownSignal) -> Option<Batch<T>> {
        loop {
            if signal.is_triggered() {
                return None;
            }

            match self.try_next_batch() {
                Ok(batch) if !batch.is_empty() => {
                    self.backoff.reset();
                    return Some(batch);
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!(
                        "Consumer for topic '{}' group '{}' stopped: {}",
                        self.topic_name,
                        self.group_name,
                        e
                    );
                    return None;
                }
            }

            let delay = self.backoff.next_delay();
            tokio::select! {
                _ = signal.triggered() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Lazy sequence of non-empty batches, ending when `signal` triggers
    ///
    /// The consumer stays borrowed while the stream lives, so `commit()` and
    /// the committer remain usable once it is dropped.
    pub fn consume(&mut self, signal: ShutdownSignal) -> impl Stream<Item = Batch<T>> + '_
    where
        T: Send + Sync,
    {
        futures::stream::unfold((self, signal), |(consumer, mut signal)| async move {
            let batch = consumer.next_batch(&mut signal).await?;
            Some((batch, (consumer, signal)))
        })
    }
}
