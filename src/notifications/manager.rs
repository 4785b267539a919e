//! AsyncNotificationManager implementation

use crate::notifications::error::NotificationError;
use crate::notifications::event::{Event, EventFilter};
use crate::notifications::traits::SubscriberStatistics;
use std::collections::HashMap;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Receiving end handed to a subscriber
pub type EventReceiver = UnboundedReceiver<Event>;

struct SubscriberInfo {
    filter: EventFilter,
    source: String,
    sender: UnboundedSender<Event>,
    statistics: SubscriberStatistics,
}

/// Fan-out of events to filtered subscribers
///
/// Each subscriber gets its own unbounded channel. Subscribers whose receiver
/// has been dropped are removed on the next publish that targets them.
#[derive(Default)]
pub struct AsyncNotificationManager {
    subscribers: HashMap<String, SubscriberInfo>,
}

impl AsyncNotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; replaces any subscriber with the same id
    pub fn subscribe(
        &mut self,
        subscriber_id: String,
        filter: EventFilter,
        source: String,
    ) -> EventReceiver {
        let (sender, receiver) = unbounded_channel();

        let subscriber_info = SubscriberInfo {
            filter,
            source: source.clone(),
            sender,
            statistics: SubscriberStatistics::new(),
        };

        if let Some(existing) = self.subscribers.insert(subscriber_id.clone(), subscriber_info) {
            log::warn!(
                "Subscriber '{}' replaced existing subscription (source: {} -> {})",
                subscriber_id,
                existing.source,
                source
            );
        }

        receiver
    }

    pub fn unsubscribe(&mut self, subscriber_id: &str) -> bool {
        self.subscribers.remove(subscriber_id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn has_subscriber(&self, subscriber_id: &str) -> bool {
        self.subscribers.contains_key(subscriber_id)
    }

    pub fn get_subscriber_statistics(&self, subscriber_id: &str) -> Option<&SubscriberStatistics> {
        self.subscribers
            .get(subscriber_id)
            .map(|info| &info.statistics)
    }

    /// Deliver an event to every subscriber whose filter accepts it
    ///
    /// Subscribers with closed channels are dropped and reported in the
    /// returned error; delivery to the others still happens.
    pub async fn publish(&mut self, event: Event) -> Result<(), NotificationError> {
        let mut failed_subscribers = Vec::new();

        for (subscriber_id, subscriber_info) in &self.subscribers {
            if !subscriber_info.filter.accepts(&event) {
                subscriber_info.statistics.record_event_filtered();
                continue;
            }
            if subscriber_info.sender.send(event.clone()).is_err() {
                failed_subscribers.push(subscriber_id.clone());
            } else {
                subscriber_info.statistics.record_event_sent();
            }
        }

        for subscriber_id in &failed_subscribers {
            self.subscribers.remove(subscriber_id);
            log::debug!("Removed subscriber '{}' with closed channel", subscriber_id);
        }

        if !failed_subscribers.is_empty() {
            return Err(NotificationError::PublishFailed {
                event_type: event.category().to_string(),
                failed_subscribers,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::event::{
        ConsumerEvent, ConsumerEventType, SystemEvent, SystemEventType,
    };

    fn failure_event() -> Event {
        Event::Consumer(ConsumerEvent::with_message(
            ConsumerEventType::HandlerFailed,
            "orders".to_string(),
            "billing".to_string(),
            0,
            "handler error".to_string(),
        ))
    }

    #[tokio::test]
    async fn test_publish_respects_filters() {
        let mut manager = AsyncNotificationManager::new();
        let mut consumers = manager.subscribe(
            "consumers".to_string(),
            EventFilter::ConsumerOnly,
            "test".to_string(),
        );
        let mut system = manager.subscribe(
            "system".to_string(),
            EventFilter::SystemOnly,
            "test".to_string(),
        );

        manager.publish(failure_event()).await.unwrap();

        assert!(matches!(consumers.try_recv(), Ok(Event::Consumer(_))));
        assert!(system.try_recv().is_err());

        let stats = manager.get_subscriber_statistics("system").unwrap();
        assert_eq!(stats.events_filtered(), 1);
        assert_eq!(stats.events_sent(), 0);
        let stats = manager.get_subscriber_statistics("consumers").unwrap();
        assert_eq!(stats.events_sent(), 1);
        assert!(stats.last_event_time().is_some());
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_removed() {
        let mut manager = AsyncNotificationManager::new();
        let receiver = manager.subscribe(
            "gone".to_string(),
            EventFilter::All,
            "test".to_string(),
        );
        let _kept = manager.subscribe("kept".to_string(), EventFilter::All, "test".to_string());
        drop(receiver);

        let result = manager
            .publish(Event::System(SystemEvent::new(SystemEventType::Startup)))
            .await;

        match result {
            Err(NotificationError::PublishFailed {
                event_type,
                failed_subscribers,
            }) => {
                assert_eq!(event_type, "System");
                assert_eq!(failed_subscribers, vec!["gone".to_string()]);
            }
            other => panic!("Expected PublishFailed, got {:?}", other),
        }
        assert!(!manager.has_subscriber("gone"));
        assert!(manager.has_subscriber("kept"));
    }

    #[tokio::test]
    async fn test_resubscribe_replaces_and_unsubscribe_removes() {
        let mut manager = AsyncNotificationManager::new();
        let _first = manager.subscribe("id".to_string(), EventFilter::All, "a".to_string());
        let _second = manager.subscribe("id".to_string(), EventFilter::All, "b".to_string());
        assert_eq!(manager.subscriber_count(), 1);

        assert!(manager.unsubscribe("id"));
        assert!(!manager.unsubscribe("id"));
        assert_eq!(manager.subscriber_count(), 0);
    }
}
