//! Tests for multiple consumer groups, capacity accounting and reclamation

#[cfg(test)]
mod tests {
    use crate::queue::api::{BufferQueue, PullConsumerOptions, TopicOptions};
    use std::sync::Arc;

    fn values(batch: &[Arc<String>]) -> Vec<String> {
        batch.iter().map(|item| item.as_str().to_string()).collect()
    }

    #[test]
    fn test_every_group_sees_every_item() {
        let queue = BufferQueue::builder()
            .add_topic::<String>(TopicOptions::new("orders").with_partitions(2))
            .unwrap()
            .build();
        let mut billing = queue
            .create_pull_consumer::<String>(&PullConsumerOptions::new("orders", "billing"))
            .unwrap();
        let mut audit = queue
            .create_pull_consumer::<String>(&PullConsumerOptions::new("orders", "audit"))
            .unwrap();

        let producer = queue.get_producer::<String>("orders").unwrap();
        for id in 0..4 {
            producer.produce(format!("order-{}", id)).unwrap();
        }

        let first = billing.try_next_batch().unwrap();
        let second = audit.try_next_batch().unwrap();
        assert_eq!(values(&first), values(&second));
        assert_eq!(first.len(), 4);
        // Groups share the same allocation
        assert!(Arc::ptr_eq(&first[0], &second[0]));
    }

    #[test]
    fn test_bound_counts_slowest_group() {
        let queue = BufferQueue::builder()
            .add_topic::<u32>(TopicOptions::new("bounded").with_bounded_capacity(3))
            .unwrap()
            .build();
        let mut fast = queue
            .create_pull_consumer::<u32>(&PullConsumerOptions::new("bounded", "fast"))
            .unwrap();
        let mut slow = queue
            .create_pull_consumer::<u32>(
                &PullConsumerOptions::new("bounded", "slow").with_batch_size(1),
            )
            .unwrap();
        let producer = queue.get_producer::<u32>("bounded").unwrap();

        for value in 0..3 {
            producer.produce(value).unwrap();
        }
        assert!(!producer.try_produce(3));

        fast.try_next_batch().unwrap();
        assert!(!producer.try_produce(3), "slow group still holds the items");

        slow.try_next_batch().unwrap();
        assert!(producer.try_produce(3));
        assert!(!producer.try_produce(4));
    }

    #[test]
    fn test_late_group_starts_at_oldest_undrained_item() {
        let queue = BufferQueue::builder()
            .add_topic::<u32>(TopicOptions::new("history"))
            .unwrap()
            .build();
        let producer = queue.get_producer::<u32>("history").unwrap();
        for value in 0..3 {
            producer.produce(value).unwrap();
        }

        // First group sees everything produced before it existed
        let mut first = queue
            .create_pull_consumer::<u32>(
                &PullConsumerOptions::new("history", "first").with_batch_size(2),
            )
            .unwrap();
        first.try_next_batch().unwrap();

        let mut late = queue
            .create_pull_consumer::<u32>(&PullConsumerOptions::new("history", "late"))
            .unwrap();
        let batch = late.try_next_batch().unwrap();
        assert_eq!(batch.iter().map(|v| **v).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_stats_and_lag() {
        let queue = BufferQueue::builder()
            .add_topic::<u32>(
                TopicOptions::new("metrics")
                    .with_partitions(2)
                    .with_segment_size(2),
            )
            .unwrap()
            .build();
        let mut consumer = queue
            .create_pull_consumer::<u32>(
                &PullConsumerOptions::new("metrics", "reader").with_batch_size(5),
            )
            .unwrap();
        let producer = queue.get_producer::<u32>("metrics").unwrap();
        for value in 0..10 {
            producer.produce(value).unwrap();
        }

        let topic = queue.topic::<u32>("metrics").unwrap();
        let lag = topic.group_lag("reader").unwrap().unwrap();
        assert_eq!(lag.partitions, vec![(0, 5), (1, 5)]);
        assert_eq!(lag.total_lag, 10);
        assert_eq!(lag.max_lag, 5);

        // Batch of 5 drains partition 0 completely
        consumer.try_next_batch().unwrap();
        let lag = topic.group_lag("reader").unwrap().unwrap();
        assert_eq!(lag.partitions, vec![(0, 0), (1, 5)]);

        let stats = topic.stats().unwrap();
        assert_eq!(stats.total_appended(), 10);
        assert_eq!(stats.total_length(), 5);
        assert_eq!(stats.partitions[0].low_watermark, 5);
        // Segments [0,2) and [2,4) are gone; [4,6) is still the head
        assert_eq!(stats.partitions[0].retained_segments, 1);
        assert_eq!(stats.partitions[1].retained_segments, 3);

        assert!(topic.group_lag("unknown").unwrap().is_none());
    }
}
