//! Common test utilities and helpers
//!
//! Shared fixtures for the queue and push integration tests.

#![allow(dead_code)]

use bufferqueue::queue::api::{Batch, BufferQueue, TopicOptions};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Register one topic of `u64` items
pub fn single_topic_queue(options: TopicOptions) -> Arc<BufferQueue> {
    BufferQueue::builder()
        .add_topic::<u64>(options)
        .expect("topic options should be valid")
        .build()
}

pub fn values(batch: &Batch<u64>) -> Vec<u64> {
    batch.iter().map(|item| **item).collect()
}

/// Assert that `seen` holds every value in `0..count` exactly once
pub fn assert_exactly_once(seen: &[u64], count: u64) {
    let unique: HashSet<u64> = seen.iter().copied().collect();
    assert_eq!(unique.len(), seen.len(), "an item was delivered twice");
    assert_eq!(seen.len() as u64, count, "an item was lost");
    assert!(seen.iter().all(|value| *value < count));
}

/// Poll `condition` until it holds or five seconds pass
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
