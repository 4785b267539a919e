//! Push consumer host
//!
//! Turns registered descriptors into running consumption loops. For each
//! descriptor the host creates `concurrency` pull consumers in one consumer
//! group and runs one tokio task per consumer. Each task resolves a handler
//! per the descriptor's lifetime, dispatches every batch to it, and reports
//! handler failures (errors and panics) without stopping. A failed batch is
//! neither retried nor requeued.

use crate::core::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::notifications::api::{
    get_notification_service_arc, ConsumerEvent, ConsumerEventType, Event, NotificationService,
};
use crate::push::factory::{HandlerFactory, HandlerInstance, HandlerScope};
use crate::push::options::PushConsumerOptions;
use crate::queue::api::{BufferQueue, PullConsumer, QueueError, QueueResult};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::task::JoinSet;

/// Counters for one consumption loop
#[derive(Debug, Default)]
struct LoopCounters {
    batches: AtomicU64,
    items: AtomicU64,
    failures: AtomicU64,
}

/// Snapshot of one loop's counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConsumerStats {
    pub topic_name: String,
    pub group_name: String,
    pub consumer: usize,
    pub batches: u64,
    pub items: u64,
    pub failures: u64,
}

struct LoopHandle {
    topic_name: String,
    group_name: String,
    consumer: usize,
    counters: Arc<LoopCounters>,
}

/// Where a loop sends its lifecycle and failure reports
#[derive(Clone)]
struct LoopContext {
    topic_name: String,
    group_name: String,
    consumer: usize,
    notifications: NotificationService,
    counters: Arc<LoopCounters>,
}

impl LoopContext {
    async fn publish(&self, event_type: ConsumerEventType, message: Option<String>) {
        let topic = self.topic_name.clone();
        let group = self.group_name.clone();
        let event = match message {
            Some(message) => {
                ConsumerEvent::with_message(event_type, topic, group, self.consumer, message)
            }
            None => ConsumerEvent::new(event_type, topic, group, self.consumer),
        };
        let mut notifications = self.notifications.lock().await;
        if let Err(e) = notifications.publish(Event::Consumer(event)).await {
            log::debug!("Consumer event not delivered to every subscriber: {}", e);
        }
    }

    async fn report_failure(&self, message: String) {
        self.counters.failures.fetch_add(1, Ordering::Relaxed);
        log::error!(
            "Handler for topic '{}' group '{}' (consumer {}) failed: {}",
            self.topic_name,
            self.group_name,
            self.consumer,
            message
        );
        self.publish(ConsumerEventType::HandlerFailed, Some(message))
            .await;
    }
}

/// One registered descriptor with its handler factory
struct Registration<T: Send + Sync + 'static> {
    options: PushConsumerOptions,
    factory: HandlerFactory<T>,
    singleton: OnceLock<HandlerInstance<T>>,
}

impl<T: Send + Sync + 'static> Registration<T> {
    fn singleton(&self) -> HandlerInstance<T> {
        self.singleton
            .get_or_init(|| self.factory.create())
            .clone()
    }

    async fn run(
        self: Arc<Self>,
        mut consumer: PullConsumer<T>,
        mut signal: ShutdownSignal,
        context: LoopContext,
    ) {
        context.publish(ConsumerEventType::Started, None).await;
        log::debug!(
            "Push consumer {} started on topic '{}' group '{}' partitions {:?}",
            context.consumer,
            context.topic_name,
            context.group_name,
            consumer.partitions()
        );

        let committer = consumer.committer();

        while let Some(batch) = consumer.next_batch(&mut signal).await {
            let items = batch.len() as u64;

            // Building, dispatching to and releasing the handler all run under
            // the guard; a panic in any of them fails this batch only
            let outcome = AssertUnwindSafe(async {
                let scope = if self.options.lifetime.is_per_batch() {
                    self.factory.scope()
                } else {
                    HandlerScope::shared(self.singleton())
                };
                let dispatched =
                    AssertUnwindSafe(scope.instance().dispatch(batch, &committer, &signal))
                        .catch_unwind()
                        .await;
                drop(scope);
                dispatched
            })
            .catch_unwind()
            .await;

            context.counters.batches.fetch_add(1, Ordering::Relaxed);
            context.counters.items.fetch_add(items, Ordering::Relaxed);
            match outcome {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => context.report_failure(e.to_string()).await,
                Ok(Err(panic)) | Err(panic) => {
                    context.report_failure(panic_message(&*panic)).await
                }
            }
        }

        log::debug!(
            "Push consumer {} stopped on topic '{}' group '{}'",
            context.consumer,
            context.topic_name,
            context.group_name
        );
        context.publish(ConsumerEventType::Stopped, None).await;
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("handler panicked: {}", message)
    } else {
        "handler panicked".to_string()
    }
}

/// Type-erased view of a registration so descriptors of any item type can
/// live in one host
trait StartConsumers: Send + Sync {
    fn options(&self) -> &PushConsumerOptions;

    /// Fail if the descriptor's group already exists on the queue
    fn check_group_available(&self, queue: &BufferQueue) -> QueueResult<()>;

    /// Create the consumer group and return one unstarted loop per consumer
    fn prepare(
        self: Arc<Self>,
        queue: &BufferQueue,
        signal: &ShutdownSignal,
        notifications: &NotificationService,
    ) -> QueueResult<Vec<(LoopHandle, BoxFuture<'static, ()>)>>;
}

impl<T: Send + Sync + 'static> StartConsumers for Registration<T> {
    fn options(&self) -> &PushConsumerOptions {
        &self.options
    }

    fn check_group_available(&self, queue: &BufferQueue) -> QueueResult<()> {
        let topic = queue.topic::<T>(&self.options.topic_name)?;
        if topic.group_names()?.contains(&self.options.group_name) {
            return Err(QueueError::GroupAlreadyExists {
                topic: self.options.topic_name.clone(),
                group: self.options.group_name.clone(),
            });
        }
        Ok(())
    }

    fn prepare(
        self: Arc<Self>,
        queue: &BufferQueue,
        signal: &ShutdownSignal,
        notifications: &NotificationService,
    ) -> QueueResult<Vec<(LoopHandle, BoxFuture<'static, ()>)>> {
        let consumers =
            queue.create_pull_consumers::<T>(&self.options.pull_options(), self.options.concurrency)?;

        Ok(consumers
            .into_iter()
            .enumerate()
            .map(|(index, consumer)| {
                let counters = Arc::new(LoopCounters::default());
                let context = LoopContext {
                    topic_name: self.options.topic_name.clone(),
                    group_name: self.options.group_name.clone(),
                    consumer: index,
                    notifications: Arc::clone(notifications),
                    counters: Arc::clone(&counters),
                };
                let handle = LoopHandle {
                    topic_name: self.options.topic_name.clone(),
                    group_name: self.options.group_name.clone(),
                    consumer: index,
                    counters,
                };
                let task = Arc::clone(&self)
                    .run(consumer, signal.clone(), context)
                    .boxed();
                (handle, task)
            })
            .collect())
    }
}

/// Builder collecting push consumer registrations
pub struct PushConsumerHostBuilder {
    queue: Arc<BufferQueue>,
    notifications: Option<NotificationService>,
    registrations: Vec<Arc<dyn StartConsumers>>,
}

impl PushConsumerHostBuilder {
    /// Report to `service` instead of the process-wide notification service
    pub fn with_notifications(mut self, service: NotificationService) -> Self {
        self.notifications = Some(service);
        self
    }

    /// Register a handler for one consumer group
    ///
    /// Fails fast on invalid options, an unknown topic or item type, a
    /// concurrency above the topic's partition count, a group registered
    /// twice with this host, or a factory whose contract disagrees with
    /// `options.commit_mode`.
    pub fn add_consumer<T>(
        mut self,
        options: PushConsumerOptions,
        factory: HandlerFactory<T>,
    ) -> QueueResult<Self>
    where
        T: Send + Sync + 'static,
    {
        options.validate()?;

        if factory.commit_mode() != options.commit_mode {
            return Err(QueueError::HandlerContractMismatch {
                topic: options.topic_name,
                group: options.group_name,
                expected: options.commit_mode.contract_name(),
            });
        }

        let topic = self.queue.topic::<T>(&options.topic_name)?;
        if options.concurrency > topic.partition_count() {
            return Err(QueueError::ConsumerNumberOutOfRange {
                topic: options.topic_name,
                requested: options.concurrency,
                partitions: topic.partition_count(),
            });
        }

        let duplicate = self.registrations.iter().any(|existing| {
            existing.options().topic_name == options.topic_name
                && existing.options().group_name == options.group_name
        });
        if duplicate {
            return Err(QueueError::GroupAlreadyExists {
                topic: options.topic_name,
                group: options.group_name,
            });
        }

        self.registrations.push(Arc::new(Registration {
            options,
            factory,
            singleton: OnceLock::new(),
        }));
        Ok(self)
    }

    pub fn build(self) -> PushConsumerHost {
        PushConsumerHost {
            queue: self.queue,
            notifications: self
                .notifications
                .unwrap_or_else(get_notification_service_arc),
            registrations: self.registrations,
            stop: Arc::new(ShutdownCoordinator::new().0),
            loops: Vec::new(),
            tasks: JoinSet::new(),
            started: false,
        }
    }
}

/// Runs push consumer loops for every registered descriptor
///
/// # Example
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use bufferqueue::core::shutdown::{ShutdownCoordinator, ShutdownSignal};
/// use bufferqueue::push::api::{
///     AutoCommitHandler, HandlerFactory, HandlerResult, PushConsumerHost, PushConsumerOptions,
/// };
/// use bufferqueue::queue::api::{Batch, BufferQueue, TopicOptions};
///
/// struct Printer;
///
/// #[async_trait]
/// impl AutoCommitHandler<String> for Printer {
///     async fn consume(&self, batch: Batch<String>, _signal: &ShutdownSignal) -> HandlerResult {
///         for line in &batch {
///             println!("{}", line);
///         }
///         Ok(())
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = BufferQueue::builder()
///     .add_topic::<String>(TopicOptions::new("lines").with_partitions(2))?
///     .build();
/// let mut host = PushConsumerHost::builder(queue.clone())
///     .add_consumer::<String>(
///         PushConsumerOptions::new("lines", "printer").with_concurrency(2),
///         HandlerFactory::auto(|| Printer),
///     )?
///     .build();
///
/// let (coordinator, _rx) = ShutdownCoordinator::new();
/// host.start(&coordinator)?;
/// queue.get_producer::<String>("lines")?.produce("hello".to_string())?;
/// coordinator.trigger_shutdown();
/// host.join().await;
/// # Ok(())
/// # }
/// ```
pub struct PushConsumerHost {
    queue: Arc<BufferQueue>,
    notifications: NotificationService,
    registrations: Vec<Arc<dyn StartConsumers>>,
    stop: Arc<ShutdownCoordinator>,
    loops: Vec<LoopHandle>,
    tasks: JoinSet<()>,
    started: bool,
}

impl PushConsumerHost {
    pub fn builder(queue: Arc<BufferQueue>) -> PushConsumerHostBuilder {
        PushConsumerHostBuilder {
            queue,
            notifications: None,
            registrations: Vec::new(),
        }
    }

    /// Create every consumer group and spawn their loops
    ///
    /// Loops end when `shutdown` triggers or `stop()` is called. Every group
    /// name is checked against the queue before any group is created, and all
    /// groups are created before any loop is spawned, so a start that fails on
    /// a taken group registers nothing. Must be called from within a Tokio
    /// runtime, and only once.
    pub fn start(&mut self, shutdown: &ShutdownCoordinator) -> QueueResult<()> {
        if self.started {
            return Err(QueueError::OperationFailed {
                message: "push consumer host already started".to_string(),
            });
        }
        for registration in &self.registrations {
            registration.check_group_available(&self.queue)?;
        }
        self.started = true;

        let signal = self.stop.signal();
        let mut prepared = Vec::new();
        for registration in &self.registrations {
            prepared.extend(Arc::clone(registration).prepare(
                &self.queue,
                &signal,
                &self.notifications,
            )?);
        }

        // Forward the caller's shutdown into the host's own stop signal
        let mut external = shutdown.signal();
        let mut stopped = self.stop.signal();
        let stop = Arc::clone(&self.stop);
        self.tasks.spawn(async move {
            tokio::select! {
                _ = external.triggered() => stop.trigger_shutdown(),
                _ = stopped.triggered() => {}
            }
        });

        for (handle, task) in prepared {
            self.loops.push(handle);
            self.tasks.spawn(task);
        }

        log::info!(
            "Push consumer host started {} loops for {} descriptors",
            self.loops.len(),
            self.registrations.len()
        );
        Ok(())
    }

    /// Ask every loop to finish after its current batch
    pub fn stop(&self) {
        self.stop.trigger_shutdown();
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_shutdown_requested()
    }

    /// Wait for every loop to finish
    pub async fn join(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                log::error!("Push consumer task ended abnormally: {}", e);
            }
        }
        log::info!("Push consumer host stopped");
    }

    /// Number of registered descriptors
    pub fn descriptor_count(&self) -> usize {
        self.registrations.len()
    }

    /// Counters for every running loop, in start order
    pub fn statistics(&self) -> Vec<PushConsumerStats> {
        self.loops
            .iter()
            .map(|handle| PushConsumerStats {
                topic_name: handle.topic_name.clone(),
                group_name: handle.group_name.clone(),
                consumer: handle.consumer,
                batches: handle.counters.batches.load(Ordering::Relaxed),
                items: handle.counters.items.load(Ordering::Relaxed),
                failures: handle.counters.failures.load(Ordering::Relaxed),
            })
            .collect()
    }
}
