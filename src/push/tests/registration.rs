//! Tests for descriptor validation when consumers are added

#[cfg(test)]
mod tests {
    use super::super::support::fixtures::queue;
    use crate::core::shutdown::ShutdownSignal;
    use crate::push::api::{
        AutoCommitHandler, CommitMode, HandlerFactory, HandlerResult, PushConsumerHost,
        PushConsumerOptions,
    };
    use crate::queue::api::{Batch, QueueError};
    use async_trait::async_trait;

    struct Ignore;

    #[async_trait]
    impl AutoCommitHandler<u32> for Ignore {
        async fn consume(&self, _batch: Batch<u32>, _signal: &ShutdownSignal) -> HandlerResult {
            Ok(())
        }
    }

    #[async_trait]
    impl AutoCommitHandler<String> for Ignore {
        async fn consume(&self, _batch: Batch<String>, _signal: &ShutdownSignal) -> HandlerResult {
            Ok(())
        }
    }

    #[test]
    fn test_contract_must_match_commit_mode() {
        let result = PushConsumerHost::builder(queue(2)).add_consumer::<u32>(
            PushConsumerOptions::new("jobs", "g").with_commit_mode(CommitMode::Manual),
            HandlerFactory::auto(|| Ignore),
        );

        match result {
            Err(QueueError::HandlerContractMismatch {
                topic,
                group,
                expected,
            }) => {
                assert_eq!(topic, "jobs");
                assert_eq!(group, "g");
                assert_eq!(expected, "manual-commit");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("mismatched contract accepted"),
        }
    }

    #[test]
    fn test_concurrency_cannot_exceed_partitions() {
        let result = PushConsumerHost::builder(queue(2)).add_consumer::<u32>(
            PushConsumerOptions::new("jobs", "g").with_concurrency(3),
            HandlerFactory::auto(|| Ignore),
        );
        assert!(matches!(
            result,
            Err(QueueError::ConsumerNumberOutOfRange {
                requested: 3,
                partitions: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_topic_must_exist_with_matching_type() {
        let unknown = PushConsumerHost::builder(queue(1)).add_consumer::<u32>(
            PushConsumerOptions::new("missing", "g"),
            HandlerFactory::auto(|| Ignore),
        );
        assert!(matches!(unknown, Err(QueueError::TopicNotRegistered { .. })));

        let wrong_type = PushConsumerHost::builder(queue(1)).add_consumer::<String>(
            PushConsumerOptions::new("jobs", "g"),
            HandlerFactory::auto(|| Ignore),
        );
        assert!(matches!(wrong_type, Err(QueueError::TopicTypeMismatch { .. })));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let result = PushConsumerHost::builder(queue(1)).add_consumer::<u32>(
            PushConsumerOptions::new("jobs", "g").with_batch_size(0),
            HandlerFactory::auto(|| Ignore),
        );
        assert!(matches!(
            result,
            Err(QueueError::InvalidOption {
                field: "batch_size",
                ..
            })
        ));
    }

    #[test]
    fn test_same_group_cannot_be_added_twice() {
        let result = PushConsumerHost::builder(queue(2))
            .add_consumer::<u32>(
                PushConsumerOptions::new("jobs", "g"),
                HandlerFactory::auto(|| Ignore),
            )
            .and_then(|builder| {
                builder.add_consumer::<u32>(
                    PushConsumerOptions::new("jobs", "g"),
                    HandlerFactory::auto(|| Ignore),
                )
            });
        assert!(matches!(result, Err(QueueError::GroupAlreadyExists { .. })));
    }

    #[test]
    fn test_descriptors_are_counted() {
        let host = PushConsumerHost::builder(queue(2))
            .add_consumer::<u32>(
                PushConsumerOptions::new("jobs", "a"),
                HandlerFactory::auto(|| Ignore),
            )
            .unwrap()
            .add_consumer::<u32>(
                PushConsumerOptions::new("jobs", "b").with_concurrency(2),
                HandlerFactory::auto(|| Ignore),
            )
            .unwrap()
            .build();

        assert_eq!(host.descriptor_count(), 2);
        assert!(host.statistics().is_empty());
    }
}
