//! Shared fixtures for push consumer tests

#[cfg(test)]
pub(super) mod fixtures {
    use crate::notifications::api::{AsyncNotificationManager, NotificationService};
    use crate::queue::api::{BufferQueue, TopicOptions};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    pub fn queue(partitions: usize) -> Arc<BufferQueue> {
        BufferQueue::builder()
            .add_topic::<u32>(TopicOptions::new("jobs").with_partitions(partitions))
            .unwrap()
            .build()
    }

    /// A private notification manager so tests don't race on the global one
    pub fn notifications() -> NotificationService {
        Arc::new(Mutex::new(AsyncNotificationManager::new()))
    }

    /// Poll `condition` until it holds or two seconds pass
    pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        condition()
    }
}
