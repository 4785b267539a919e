//! Per-subscriber bookkeeping for the notification system

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Instant;

/// Statistics tracking for a subscriber
#[derive(Debug, Default)]
pub struct SubscriberStatistics {
    events_sent: AtomicUsize,
    events_filtered: AtomicUsize,
    last_event_time: RwLock<Option<Instant>>,
}

impl SubscriberStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events delivered into the subscriber's channel
    pub fn events_sent(&self) -> usize {
        self.events_sent.load(Ordering::Relaxed)
    }

    pub fn record_event_sent(&self) {
        self.events_sent.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut time) = self.last_event_time.write() {
            *time = Some(Instant::now());
        }
    }

    /// Events skipped because the subscriber's filter rejected them
    pub fn events_filtered(&self) -> usize {
        self.events_filtered.load(Ordering::Relaxed)
    }

    pub fn record_event_filtered(&self) {
        self.events_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_event_time(&self) -> Option<Instant> {
        *self.last_event_time.read().ok()?
    }
}
