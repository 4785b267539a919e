//! Demo and load runner
//!
//! Registers the configured topics, starts a push consumer per configured
//! group, produces `items` sequence numbers on every topic, then waits until
//! every group has drained (or the timeout or Ctrl-C hits) and collects
//! statistics. Each group sums what it receives, so a complete run shows the
//! same checksum in every group of a topic.

use crate::app::cli::config::BufferConfig;
use crate::core::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::notifications::api::{
    get_notification_service_arc, Event, NotificationService, QueueEvent, QueueEventType,
};
use crate::push::api::{
    AutoCommitHandler, CommitMode, HandlerFactory, HandlerResult, ManualCommitHandler,
    PushConsumerHost, PushConsumerStats,
};
use crate::queue::api::{
    Batch, BufferCommitter, BufferQueue, Producer, QueueResult, TopicStats,
};
use async_trait::async_trait;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How long to poll between drain checks
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Pause before retrying a refused item on a full topic
const FULL_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Runtime knobs taken from the command line
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub items: usize,
    pub timeout: Duration,
}

/// What the producers of one topic managed to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerTally {
    pub topic_name: String,
    pub produced: u64,
    pub refusals: u64,
}

/// Sum of everything one consumer group received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChecksum {
    pub topic_name: String,
    pub group_name: String,
    pub checksum: u64,
    pub expected: u64,
}

impl GroupChecksum {
    pub fn is_complete(&self) -> bool {
        self.checksum == self.expected
    }
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub producers: Vec<ProducerTally>,
    pub topics: Vec<TopicStats>,
    pub consumers: Vec<PushConsumerStats>,
    pub checksums: Vec<GroupChecksum>,
    /// Every group caught up before the timeout
    pub drained: bool,
    pub elapsed: Duration,
}

/// Adds every received sequence number into a shared total
struct ChecksumHandler {
    total: Arc<AtomicU64>,
}

impl ChecksumHandler {
    fn add(&self, batch: &Batch<u64>) {
        let sum: u64 = batch.iter().map(|item| **item).sum();
        self.total.fetch_add(sum, Ordering::Relaxed);
    }
}

#[async_trait]
impl AutoCommitHandler<u64> for ChecksumHandler {
    async fn consume(&self, batch: Batch<u64>, _signal: &ShutdownSignal) -> HandlerResult {
        self.add(&batch);
        Ok(())
    }
}

#[async_trait]
impl ManualCommitHandler<u64> for ChecksumHandler {
    async fn consume(
        &self,
        batch: Batch<u64>,
        committer: &BufferCommitter,
        _signal: &ShutdownSignal,
    ) -> HandlerResult {
        self.add(&batch);
        committer.commit()?;
        Ok(())
    }
}

fn checksum_factory(commit_mode: CommitMode, total: &Arc<AtomicU64>) -> HandlerFactory<u64> {
    let total = Arc::clone(total);
    let build = move || ChecksumHandler {
        total: Arc::clone(&total),
    };
    let factory = match commit_mode {
        CommitMode::Auto => HandlerFactory::auto(build),
        CommitMode::Manual => HandlerFactory::manual(build),
    };
    factory.with_release(|instance| {
        log::trace!("Released {} handler", instance.commit_mode().contract_name());
    })
}

async fn publish(service: &NotificationService, event: Event) {
    if let Err(e) = service.lock().await.publish(event).await {
        log::debug!("Queue event not delivered to every subscriber: {}", e);
    }
}

/// Run the configured topics and consumers once
pub async fn run(
    config: &BufferConfig,
    settings: &RunSettings,
    shutdown: &ShutdownCoordinator,
) -> QueueResult<RunReport> {
    let started = Instant::now();
    let deadline = started + settings.timeout;
    let notifications = get_notification_service_arc();

    let mut builder = BufferQueue::builder();
    for topic in &config.topics {
        builder = builder.add_topic::<u64>(topic.clone())?;
    }
    let queue = builder.build();
    for topic in &config.topics {
        publish(
            &notifications,
            Event::Queue(QueueEvent::new(
                QueueEventType::TopicRegistered,
                topic.topic_name.clone(),
            )),
        )
        .await;
    }

    let mut host_builder =
        PushConsumerHost::builder(Arc::clone(&queue)).with_notifications(notifications.clone());
    let mut totals = Vec::new();
    for consumer in &config.consumers {
        let total = Arc::new(AtomicU64::new(0));
        host_builder = host_builder
            .add_consumer(consumer.clone(), checksum_factory(consumer.commit_mode, &total))?;
        totals.push((consumer, total));
    }
    let mut host = host_builder.build();
    host.start(shutdown)?;

    let producers = config
        .topics
        .iter()
        .map(|topic| {
            let producer = queue.get_producer::<u64>(&topic.topic_name)?;
            Ok(produce_all(
                producer,
                settings.items,
                deadline,
                shutdown.signal(),
                notifications.clone(),
            ))
        })
        .collect::<QueueResult<Vec<_>>>()?;
    let producers = futures::future::join_all(producers).await;

    let drained = wait_for_drain(&queue, config, deadline, shutdown.signal()).await?;
    if !drained {
        log::warn!("Consumers did not catch up before the run ended");
    }

    host.stop();
    host.join().await;

    let topics = config
        .topics
        .iter()
        .map(|topic| queue.topic::<u64>(&topic.topic_name)?.stats())
        .collect::<QueueResult<Vec<_>>>()?;

    let checksums = totals
        .into_iter()
        .map(|(consumer, total)| {
            let produced = producers
                .iter()
                .find(|tally| tally.topic_name == consumer.topic_name)
                .map_or(0, |tally| tally.produced);
            GroupChecksum {
                topic_name: consumer.topic_name.clone(),
                group_name: consumer.group_name.clone(),
                checksum: total.load(Ordering::Relaxed),
                // Items are 0..produced
                expected: produced * produced.saturating_sub(1) / 2,
            }
        })
        .collect();

    Ok(RunReport {
        producers,
        topics,
        consumers: host.statistics(),
        checksums,
        drained,
        elapsed: started.elapsed(),
    })
}

/// Publish `0..items` on one topic, retrying refused items until accepted
async fn produce_all(
    producer: Producer<u64>,
    items: usize,
    deadline: Instant,
    signal: ShutdownSignal,
    notifications: NotificationService,
) -> ProducerTally {
    let mut tally = ProducerTally {
        topic_name: producer.topic_name().to_string(),
        produced: 0,
        refusals: 0,
    };

    for sequence in 0..items as u64 {
        while !producer.try_produce(sequence) {
            tally.refusals += 1;
            if tally.refusals == 1 {
                let capacity = producer.bounded_capacity().unwrap_or_default();
                publish(
                    &notifications,
                    Event::Queue(QueueEvent::with_message(
                        QueueEventType::CapacityReached,
                        tally.topic_name.clone(),
                        format!("{} items pending", capacity),
                    )),
                )
                .await;
            }
            if signal.is_triggered() || Instant::now() >= deadline {
                log::warn!(
                    "Stopped producing on '{}' after {} items",
                    tally.topic_name,
                    tally.produced
                );
                return tally;
            }
            tokio::time::sleep(FULL_RETRY_DELAY).await;
        }
        tally.produced += 1;

        // Let consumer tasks run on single-threaded runtimes
        if sequence % 1024 == 1023 {
            tokio::task::yield_now().await;
        }
    }

    log::debug!(
        "Produced {} items on '{}' ({} refusals)",
        tally.produced,
        tally.topic_name,
        tally.refusals
    );
    tally
}

/// Wait until no configured group lags behind its topic
async fn wait_for_drain(
    queue: &BufferQueue,
    config: &BufferConfig,
    deadline: Instant,
    mut signal: ShutdownSignal,
) -> QueueResult<bool> {
    loop {
        let mut lagging = 0;
        for consumer in &config.consumers {
            let topic = queue.topic::<u64>(&consumer.topic_name)?;
            if let Some(lag) = topic.group_lag(&consumer.group_name)? {
                lagging += lag.total_lag;
            }
        }
        if lagging == 0 {
            return Ok(true);
        }
        if signal.is_triggered() || Instant::now() >= deadline {
            log::debug!("{} items still pending at the end of the run", lagging);
            return Ok(false);
        }
        tokio::select! {
            _ = tokio::time::sleep(DRAIN_POLL_INTERVAL) => {}
            _ = signal.triggered() => {}
        }
    }
}

fn header(titles: &[&str], use_color: bool) -> Row {
    let spec = if use_color { "bFc" } else { "b" };
    Row::new(
        titles
            .iter()
            .map(|title| Cell::new(title).style_spec(spec))
            .collect(),
    )
}

/// Per-topic table: partitions, capacity, production and retention
pub fn topic_table(report: &RunReport, use_color: bool) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(header(
        &["Topic", "Partitions", "Capacity", "Produced", "Refused", "Pending", "Segments"],
        use_color,
    ));

    for stats in &report.topics {
        let tally = report
            .producers
            .iter()
            .find(|tally| tally.topic_name == stats.topic_name);
        let segments: usize = stats.partitions.iter().map(|p| p.retained_segments).sum();
        table.add_row(Row::new(vec![
            Cell::new(&stats.topic_name),
            Cell::new(&stats.partitions.len().to_string()).style_spec("r"),
            Cell::new(
                &stats
                    .bounded_capacity
                    .map_or_else(|| "-".to_string(), |c| c.to_string()),
            )
            .style_spec("r"),
            Cell::new(&tally.map_or(0, |t| t.produced).to_string()).style_spec("r"),
            Cell::new(&tally.map_or(0, |t| t.refusals).to_string()).style_spec("r"),
            Cell::new(&stats.total_length().to_string()).style_spec("r"),
            Cell::new(&segments.to_string()).style_spec("r"),
        ]));
    }
    table
}

/// Per-loop table: batches, items and failures of every push consumer
pub fn consumer_table(report: &RunReport, use_color: bool) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(header(
        &["Topic", "Group", "Consumer", "Batches", "Items", "Failures"],
        use_color,
    ));

    for stats in &report.consumers {
        let failures = Cell::new(&stats.failures.to_string());
        let failures = if use_color && stats.failures > 0 {
            failures.style_spec("rFr")
        } else {
            failures.style_spec("r")
        };
        table.add_row(Row::new(vec![
            Cell::new(&stats.topic_name),
            Cell::new(&stats.group_name),
            Cell::new(&stats.consumer.to_string()).style_spec("r"),
            Cell::new(&stats.batches.to_string()).style_spec("r"),
            Cell::new(&stats.items.to_string()).style_spec("r"),
            failures,
        ]));
    }
    table
}

/// Print the report to stdout
pub fn print_report(report: &RunReport, use_color: bool) {
    topic_table(report, use_color).printstd();
    println!();
    consumer_table(report, use_color).printstd();
    println!();

    for checksum in &report.checksums {
        let status = match (checksum.is_complete(), use_color) {
            (true, true) => "complete".green().to_string(),
            (true, false) => "complete".to_string(),
            (false, true) => "incomplete".red().bold().to_string(),
            (false, false) => "incomplete".to_string(),
        };
        println!(
            "{}/{}: checksum {} of {} ({})",
            checksum.topic_name, checksum.group_name, checksum.checksum, checksum.expected, status
        );
    }
    println!("Finished in {:.2?}", report.elapsed);
}
