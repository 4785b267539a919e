//! Partitioned in-process buffer queue
//!
//! Producers publish typed items to named topics; consumer groups pull them
//! back out in batches.
//!
//! # Overview
//!
//! - **Topics** have a fixed number of partitions chosen at registration and an
//!   optional bounded capacity.
//! - **Producers** spread items round-robin over a topic's partitions. Appends
//!   are lock-free; bounded topics serialize only their capacity check.
//! - **Consumer groups** are created once per (topic, group name). Their
//!   consumers own disjoint, contiguous partition ranges that never change.
//! - **Pull consumers** drain their partitions in index order into non-empty
//!   batches and stop when their shutdown signal fires.
//! - **Fan-out**: every group sees every item; items are delivered as
//!   `Arc<T>` so groups share them without copying.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐
//! │ Producer A │   │ Producer B │          round-robin
//! └─────┬──────┘   └─────┬──────┘
//!       ▼                ▼
//! ┌─────────────────────────────────────────────┐
//! │ TopicStore "orders"                          │
//! │  P0 [■■■■■]  P1 [■■■■]  P2 [■■■■■]  P3 [■■■] │
//! └──────┬─────────────┬────────────┬───────────┘
//!        │ group "billing" (2 consumers)
//!   ┌────┴─────┐  ┌────┴─────┐
//!   │ P0, P1   │  │ P2, P3   │
//!   └──────────┘  └──────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bufferqueue::core::shutdown::ShutdownCoordinator;
//! use bufferqueue::queue::api::{BufferQueue, PullConsumerOptions, TopicOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = BufferQueue::builder()
//!     .add_topic::<String>(TopicOptions::new("orders").with_partitions(2))?
//!     .build();
//!
//! let producer = queue.get_producer::<String>("orders")?;
//! producer.produce("order-1".to_string())?;
//!
//! let (coordinator, _rx) = ShutdownCoordinator::new();
//! let mut consumer = queue.create_pull_consumer::<String>(
//!     &PullConsumerOptions::new("orders", "billing").with_batch_size(50),
//! )?;
//! let mut signal = coordinator.signal();
//! if let Some(batch) = consumer.next_batch(&mut signal).await {
//!     for order in &batch {
//!         println!("Processing {}", order);
//!     }
//!     consumer.commit()?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;

pub(crate) mod consumer;
pub(crate) mod error;
pub(crate) mod manager;
pub(crate) mod options;
pub(crate) mod partition;
pub(crate) mod producer;
pub(crate) mod topic;
pub(crate) mod types;

#[cfg(test)]
mod tests;
