//! Tests for handler resolution per lifetime

#[cfg(test)]
mod tests {
    use super::super::support::fixtures::{notifications, queue, wait_until};
    use crate::core::shutdown::{ShutdownCoordinator, ShutdownSignal};
    use crate::push::api::{
        AutoCommitHandler, HandlerFactory, HandlerLifetime, HandlerResult, PushConsumerHost,
        PushConsumerOptions,
    };
    use crate::queue::api::Batch;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Counting {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AutoCommitHandler<u32> for Counting {
        async fn consume(&self, batch: Batch<u32>, _signal: &ShutdownSignal) -> HandlerResult {
            self.seen.fetch_add(batch.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    struct Counters {
        built: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
        seen: Arc<AtomicUsize>,
    }

    fn counting_factory() -> (HandlerFactory<u32>, Counters) {
        let counters = Counters {
            built: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(AtomicUsize::new(0)),
        };
        let built = Arc::clone(&counters.built);
        let released = Arc::clone(&counters.released);
        let seen = Arc::clone(&counters.seen);
        let factory = HandlerFactory::auto(move || {
            built.fetch_add(1, Ordering::SeqCst);
            Counting {
                seen: Arc::clone(&seen),
            }
        })
        .with_release(move |_| {
            released.fetch_add(1, Ordering::SeqCst);
        });
        (factory, counters)
    }

    async fn run_with_lifetime(lifetime: HandlerLifetime, items: u32) -> Counters {
        let queue = queue(2);
        let (factory, counters) = counting_factory();
        let mut host = PushConsumerHost::builder(queue.clone())
            .with_notifications(notifications())
            .add_consumer(
                PushConsumerOptions::new("jobs", "workers")
                    .with_batch_size(1)
                    .with_concurrency(2)
                    .with_lifetime(lifetime),
                factory,
            )
            .unwrap()
            .build();

        let (coordinator, _rx) = ShutdownCoordinator::new();
        host.start(&coordinator).unwrap();

        let producer = queue.get_producer::<u32>("jobs").unwrap();
        for value in 0..items {
            producer.produce(value).unwrap();
        }

        let seen = Arc::clone(&counters.seen);
        assert!(wait_until(|| seen.load(Ordering::SeqCst) == items as usize).await);

        host.stop();
        timeout(Duration::from_secs(2), host.join())
            .await
            .expect("host should stop");
        counters
    }

    #[tokio::test]
    async fn test_singleton_is_built_once_per_descriptor() {
        let counters = run_with_lifetime(HandlerLifetime::Singleton, 10).await;

        assert_eq!(counters.built.load(Ordering::SeqCst), 1);
        assert_eq!(counters.released.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scoped_handlers_are_built_and_released_per_batch() {
        let counters = run_with_lifetime(HandlerLifetime::Scoped, 6).await;

        assert_eq!(counters.built.load(Ordering::SeqCst), 6);
        assert_eq!(counters.released.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_transient_handlers_are_built_and_released_per_batch() {
        let counters = run_with_lifetime(HandlerLifetime::Transient, 4).await;

        assert_eq!(counters.built.load(Ordering::SeqCst), 4);
        assert_eq!(counters.released.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_instance_factory_shares_one_handler_across_loops() {
        let queue = queue(2);
        let seen = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Counting {
            seen: Arc::clone(&seen),
        });
        let mut host = PushConsumerHost::builder(queue.clone())
            .with_notifications(notifications())
            .add_consumer::<u32>(
                PushConsumerOptions::new("jobs", "shared").with_concurrency(2),
                HandlerFactory::auto_instance(Arc::clone(&handler)),
            )
            .unwrap()
            .build();

        let (coordinator, _rx) = ShutdownCoordinator::new();
        host.start(&coordinator).unwrap();
        let producer = queue.get_producer::<u32>("jobs").unwrap();
        for value in 0..8 {
            producer.produce(value).unwrap();
        }

        assert!(wait_until(|| seen.load(Ordering::SeqCst) == 8).await);
        coordinator.trigger_shutdown();
        timeout(Duration::from_secs(2), host.join())
            .await
            .expect("host should stop");
    }
}
