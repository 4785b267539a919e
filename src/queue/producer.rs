//! Producer handle for one topic
//!
//! Items go to partitions in round-robin order. Unbounded topics pick the
//! partition with a single atomic increment. Bounded topics first sum the
//! partitions' approximate lengths and refuse the item when the total has
//! reached the bound; that check and the enqueue happen under one gate per
//! topic so concurrent producers cannot jointly overshoot.

use crate::core::sync::lock_gate;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::partition::Partition;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) struct ProducerShared<T> {
    topic_name: String,
    partitions: Arc<[Arc<Partition<T>>]>,
    cursor: AtomicUsize,
    bounded_capacity: Option<u64>,
    admission_gate: Mutex<()>,
}

/// Write handle bound to a topic
///
/// Cheap to clone; all clones share the round-robin cursor and the admission
/// gate of their topic.
///
/// # Example
///
/// ```rust,no_run
/// # use bufferqueue::queue::api::{BufferQueue, TopicOptions};
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = BufferQueue::builder()
///     .add_topic::<String>(TopicOptions::new("orders").with_bounded_capacity(2))?
///     .build();
/// let producer = queue.get_producer::<String>("orders")?;
///
/// producer.produce("first".to_string())?;
/// assert!(producer.try_produce("second".to_string()));
/// assert!(!producer.try_produce("third".to_string()));
/// # Ok(())
/// # }
/// ```
pub struct Producer<T> {
    shared: Arc<ProducerShared<T>>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Producer<T> {
    pub(crate) fn new(
        topic_name: String,
        partitions: Arc<[Arc<Partition<T>>]>,
        bounded_capacity: Option<u64>,
    ) -> Self {
        Self {
            shared: Arc::new(ProducerShared {
                topic_name,
                partitions,
                cursor: AtomicUsize::new(0),
                bounded_capacity,
                admission_gate: Mutex::new(()),
            }),
        }
    }

    pub fn topic_name(&self) -> &str {
        &self.shared.topic_name
    }

    pub fn bounded_capacity(&self) -> Option<u64> {
        self.shared.bounded_capacity
    }

    /// Enqueue an item, failing with `QueueFull` if a bounded topic is at capacity
    pub fn produce(&self, item: T) -> QueueResult<()> {
        match self.admit(item) {
            Ok(()) => Ok(()),
            Err(_refused) => Err(QueueError::QueueFull {
                topic: self.shared.topic_name.clone(),
                capacity: self.shared.bounded_capacity.unwrap_or_default(),
            }),
        }
    }

    /// Enqueue an item, returning `false` if a bounded topic is at capacity
    pub fn try_produce(&self, item: T) -> bool {
        self.admit(item).is_ok()
    }

    /// Shared admission logic; hands the item back when it is refused
    fn admit(&self, item: T) -> Result<(), T> {
        let shared = &*self.shared;
        let Some(capacity) = shared.bounded_capacity else {
            self.enqueue(item);
            return Ok(());
        };

        let _gate = lock_gate(&shared.admission_gate);
        let mut total = 0u64;
        for partition in shared.partitions.iter() {
            total += partition.approximate_length();
            if total >= capacity {
                log::trace!(
                    "topic '{}' refused item: {} items at capacity {}",
                    shared.topic_name,
                    total,
                    capacity
                );
                return Err(item);
            }
        }
        self.enqueue(item);
        Ok(())
    }

    fn enqueue(&self, item: T) {
        let shared = &*self.shared;
        let slot = shared.cursor.fetch_add(1, Ordering::Relaxed) % shared.partitions.len();
        shared.partitions[slot].append(item);
    }
}
