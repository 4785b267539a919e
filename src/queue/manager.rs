//! BufferQueue - registry of typed topics
//!
//! The `BufferQueue` is built once at startup with every topic it will ever
//! serve. Each topic is stored type-erased and recovered by downcasting, so a
//! lookup with the wrong item type is reported instead of silently creating a
//! second topic.

use crate::queue::consumer::PullConsumer;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::options::{PullConsumerOptions, TopicOptions};
use crate::queue::producer::Producer;
use crate::queue::topic::TopicStore;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

struct RegisteredTopic {
    item_type: &'static str,
    store: Arc<dyn Any + Send + Sync>,
}

/// Builder collecting topic registrations
#[derive(Default)]
pub struct BufferQueueBuilder {
    topics: HashMap<String, RegisteredTopic>,
}

impl BufferQueueBuilder {
    /// Register a topic carrying items of type `T`
    ///
    /// Fails on invalid options or a topic name that is already registered.
    pub fn add_topic<T>(mut self, options: TopicOptions) -> QueueResult<Self>
    where
        T: Send + Sync + 'static,
    {
        if self.topics.contains_key(&options.topic_name) {
            return Err(QueueError::TopicAlreadyRegistered {
                topic: options.topic_name,
            });
        }

        let topic_name = options.topic_name.clone();
        let store: Arc<TopicStore<T>> = Arc::new(TopicStore::new(options)?);
        self.topics.insert(
            topic_name,
            RegisteredTopic {
                item_type: std::any::type_name::<T>(),
                store,
            },
        );
        Ok(self)
    }

    pub fn build(self) -> Arc<BufferQueue> {
        log::debug!("BufferQueue built with {} topics", self.topics.len());
        Arc::new(BufferQueue {
            topics: self.topics,
        })
    }
}

/// Process-wide registry of topics
///
/// Thread-safe; share it as `Arc<BufferQueue>`.
///
/// # Example
///
/// ```rust,no_run
/// use bufferqueue::queue::api::{BufferQueue, PullConsumerOptions, TopicOptions};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = BufferQueue::builder()
///     .add_topic::<u64>(TopicOptions::new("ticks").with_partitions(4))?
///     .build();
///
/// let producer = queue.get_producer::<u64>("ticks")?;
/// producer.produce(42)?;
///
/// let consumers = queue.create_pull_consumers::<u64>(
///     &PullConsumerOptions::new("ticks", "stats").with_batch_size(16),
///     2,
/// )?;
/// assert_eq!(consumers[0].partitions(), 0..2);
/// # Ok(())
/// # }
/// ```
pub struct BufferQueue {
    topics: HashMap<String, RegisteredTopic>,
}

impl BufferQueue {
    pub fn builder() -> BufferQueueBuilder {
        BufferQueueBuilder::default()
    }

    /// Registered topic names in sorted order
    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up the store of a topic carrying `T`
    pub fn topic<T>(&self, topic_name: &str) -> QueueResult<Arc<TopicStore<T>>>
    where
        T: Send + Sync + 'static,
    {
        let registered =
            self.topics
                .get(topic_name)
                .ok_or_else(|| QueueError::TopicNotRegistered {
                    topic: topic_name.to_string(),
                })?;

        Arc::clone(&registered.store)
            .downcast::<TopicStore<T>>()
            .map_err(|_| QueueError::TopicTypeMismatch {
                topic: topic_name.to_string(),
                registered: registered.item_type,
                requested: std::any::type_name::<T>(),
            })
    }

    pub fn get_producer<T>(&self, topic_name: &str) -> QueueResult<Producer<T>>
    where
        T: Send + Sync + 'static,
    {
        Ok(self.topic::<T>(topic_name)?.producer())
    }

    /// Create a consumer group with a single consumer owning every partition
    pub fn create_pull_consumer<T>(
        &self,
        options: &PullConsumerOptions,
    ) -> QueueResult<PullConsumer<T>>
    where
        T: Send + Sync + 'static,
    {
        let mut consumers = self.create_pull_consumers::<T>(options, 1)?;
        consumers.pop().ok_or_else(|| QueueError::OperationFailed {
            message: "consumer group created without consumers".to_string(),
        })
    }

    /// Create a consumer group with `consumer_number` consumers
    pub fn create_pull_consumers<T>(
        &self,
        options: &PullConsumerOptions,
        consumer_number: usize,
    ) -> QueueResult<Vec<PullConsumer<T>>>
    where
        T: Send + Sync + 'static,
    {
        options.validate()?;
        self.topic::<T>(&options.topic_name)?
            .create_consumers(options, consumer_number)
    }
}
