//! Push consumer integration tests through the public API

mod common;

use async_trait::async_trait;
use bufferqueue::core::shutdown::{ShutdownCoordinator, ShutdownSignal};
use bufferqueue::notifications::api::{
    AsyncNotificationManager, ConsumerEventType, Event, EventFilter, NotificationService,
};
use bufferqueue::push::api::{
    AutoCommitHandler, CommitMode, HandlerFactory, HandlerLifetime, HandlerResult,
    ManualCommitHandler, PushConsumerHost, PushConsumerOptions,
};
use bufferqueue::queue::api::{Batch, BufferCommitter, QueueError, TopicOptions};
use common::{assert_exactly_once, eventually, single_topic_queue, values};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;

/// Records every delivered item; shared across handler instances
#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<u64>>>,
    batches: Arc<Mutex<Vec<usize>>>,
}

impl Recorder {
    fn record(&self, batch: &Batch<u64>) {
        self.batches.lock().unwrap().push(batch.len());
        self.seen.lock().unwrap().extend(values(batch));
    }

    fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl AutoCommitHandler<u64> for Recorder {
    async fn consume(&self, batch: Batch<u64>, _signal: &ShutdownSignal) -> HandlerResult {
        self.record(&batch);
        Ok(())
    }
}

#[async_trait]
impl ManualCommitHandler<u64> for Recorder {
    async fn consume(
        &self,
        batch: Batch<u64>,
        committer: &BufferCommitter,
        _signal: &ShutdownSignal,
    ) -> HandlerResult {
        self.record(&batch);
        committer.commit()?;
        Ok(())
    }
}

fn private_notifications() -> NotificationService {
    Arc::new(AsyncMutex::new(AsyncNotificationManager::new()))
}

/// Run one descriptor over 300 items on a 2-partition topic
async fn deliver_300(options: PushConsumerOptions, factory: HandlerFactory<u64>, recorder: &Recorder) {
    let queue = single_topic_queue(TopicOptions::new("orders").with_partitions(2));
    let mut host = PushConsumerHost::builder(queue.clone())
        .with_notifications(private_notifications())
        .add_consumer::<u64>(options, factory)
        .unwrap()
        .build();

    let (coordinator, _rx) = ShutdownCoordinator::new();
    host.start(&coordinator).unwrap();

    let producer = queue.get_producer::<u64>("orders").unwrap();
    for value in 0..300 {
        producer.produce(value).unwrap();
    }

    assert!(eventually(|| recorder.count() >= 300).await);
    // Give a duplicate delivery the chance to show up
    tokio::time::sleep(Duration::from_millis(20)).await;

    coordinator.trigger_shutdown();
    timeout(Duration::from_secs(5), host.join())
        .await
        .expect("host should stop");

    let total_items: u64 = host.statistics().iter().map(|stats| stats.items).sum();
    assert_eq!(total_items, 300);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrency_two_auto_commit_delivers_300_items_exactly_once() {
    let recorder = Recorder::default();
    let shared = recorder.clone();
    deliver_300(
        PushConsumerOptions::new("orders", "billing")
            .with_batch_size(100)
            .with_concurrency(2),
        HandlerFactory::auto(move || shared.clone()),
        &recorder,
    )
    .await;

    let seen = recorder.seen.lock().unwrap().clone();
    assert_exactly_once(&seen, 300);
    assert!(recorder.batches.lock().unwrap().iter().all(|size| *size <= 100 && *size > 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn manual_commit_scoped_handlers_deliver_every_item() {
    let recorder = Recorder::default();
    let shared = recorder.clone();
    let released = Arc::new(AtomicUsize::new(0));
    let release_count = Arc::clone(&released);
    deliver_300(
        PushConsumerOptions::new("orders", "ledger")
            .with_batch_size(100)
            .with_concurrency(2)
            .with_commit_mode(CommitMode::Manual)
            .with_lifetime(HandlerLifetime::Scoped),
        HandlerFactory::manual(move || shared.clone()).with_release(move |_| {
            release_count.fetch_add(1, Ordering::SeqCst);
        }),
        &recorder,
    )
    .await;

    assert_exactly_once(&recorder.seen.lock().unwrap(), 300);
    assert_eq!(
        released.load(Ordering::SeqCst),
        recorder.batches.lock().unwrap().len()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transient_handlers_are_built_per_batch() {
    let recorder = Recorder::default();
    let shared = recorder.clone();
    let built = Arc::new(AtomicUsize::new(0));
    let build_count = Arc::clone(&built);
    deliver_300(
        PushConsumerOptions::new("orders", "audit")
            .with_batch_size(50)
            .with_lifetime(HandlerLifetime::Transient),
        HandlerFactory::auto(move || {
            build_count.fetch_add(1, Ordering::SeqCst);
            shared.clone()
        }),
        &recorder,
    )
    .await;

    assert_exactly_once(&recorder.seen.lock().unwrap(), 300);
    assert_eq!(
        built.load(Ordering::SeqCst),
        recorder.batches.lock().unwrap().len()
    );
}

struct AlwaysFails;

#[async_trait]
impl AutoCommitHandler<u64> for AlwaysFails {
    async fn consume(&self, batch: Batch<u64>, _signal: &ShutdownSignal) -> HandlerResult {
        Err(format!("rejected {} items", batch.len()).into())
    }
}

#[tokio::test]
async fn handler_failures_are_published_as_consumer_events() {
    let queue = single_topic_queue(TopicOptions::new("orders"));
    let notifications = private_notifications();
    let mut events = notifications.lock().await.subscribe(
        "integration".to_string(),
        EventFilter::ConsumerOnly,
        "push-integration".to_string(),
    );
    let mut host = PushConsumerHost::builder(queue.clone())
        .with_notifications(notifications.clone())
        .add_consumer::<u64>(
            PushConsumerOptions::new("orders", "broken"),
            HandlerFactory::auto(|| AlwaysFails),
        )
        .unwrap()
        .build();

    let (coordinator, _rx) = ShutdownCoordinator::new();
    host.start(&coordinator).unwrap();
    queue.get_producer::<u64>("orders").unwrap().produce(7).unwrap();

    let failure = loop {
        match timeout(Duration::from_secs(2), events.recv()).await {
            Ok(Some(Event::Consumer(event)))
                if event.event_type == ConsumerEventType::HandlerFailed =>
            {
                break event;
            }
            Ok(Some(_)) => continue,
            other => panic!("no failure event: {:?}", other.is_ok()),
        }
    };
    assert_eq!(failure.topic, "orders");
    assert_eq!(failure.group, "broken");
    assert_eq!(failure.message.as_deref(), Some("rejected 1 items"));

    host.stop();
    timeout(Duration::from_secs(2), host.join())
        .await
        .expect("host should stop");
    assert_eq!(host.statistics()[0].failures, 1);
}

#[test]
fn manual_descriptor_rejects_auto_commit_factory() {
    let queue = single_topic_queue(TopicOptions::new("orders"));
    let result = PushConsumerHost::builder(queue).add_consumer::<u64>(
        PushConsumerOptions::new("orders", "g").with_commit_mode(CommitMode::Manual),
        HandlerFactory::auto(Recorder::default),
    );
    assert!(matches!(
        result,
        Err(QueueError::HandlerContractMismatch {
            expected: "manual-commit",
            ..
        })
    ));
}
