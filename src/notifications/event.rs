//! Event types published through the notification system

use std::time::SystemTime;

#[derive(Clone, Debug, PartialEq)]
pub enum QueueEventType {
    TopicRegistered,
    CapacityReached,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConsumerEventType {
    Started,
    HandlerFailed,
    Stopped,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SystemEventType {
    Startup,
    Shutdown,
}

#[derive(Clone, Debug)]
pub struct QueueEvent {
    pub event_type: QueueEventType,
    pub timestamp: SystemTime,
    pub topic: String,
    pub message: Option<String>,
}

impl QueueEvent {
    pub fn new(event_type: QueueEventType, topic: String) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            topic,
            message: None,
        }
    }

    pub fn with_message(event_type: QueueEventType, topic: String, message: String) -> Self {
        Self {
            message: Some(message),
            ..Self::new(event_type, topic)
        }
    }
}

/// Lifecycle and failure reports from push consumer loops
#[derive(Clone, Debug)]
pub struct ConsumerEvent {
    pub event_type: ConsumerEventType,
    pub timestamp: SystemTime,
    pub topic: String,
    pub group: String,
    /// Index of the loop within its consumer group
    pub consumer: usize,
    pub message: Option<String>,
}

impl ConsumerEvent {
    pub fn new(event_type: ConsumerEventType, topic: String, group: String, consumer: usize) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            topic,
            group,
            consumer,
            message: None,
        }
    }

    pub fn with_message(
        event_type: ConsumerEventType,
        topic: String,
        group: String,
        consumer: usize,
        message: String,
    ) -> Self {
        Self {
            message: Some(message),
            ..Self::new(event_type, topic, group, consumer)
        }
    }
}

#[derive(Clone, Debug)]
pub struct SystemEvent {
    pub event_type: SystemEventType,
    pub timestamp: SystemTime,
    pub message: Option<String>,
}

impl SystemEvent {
    pub fn new(event_type: SystemEventType) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            message: None,
        }
    }

    pub fn with_message(event_type: SystemEventType, message: String) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            message: Some(message),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Event {
    Queue(QueueEvent),
    Consumer(ConsumerEvent),
    System(SystemEvent),
}

impl Event {
    /// Short category name used in logs and errors
    pub fn category(&self) -> &'static str {
        match self {
            Event::Queue(_) => "Queue",
            Event::Consumer(_) => "Consumer",
            Event::System(_) => "System",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EventFilter {
    QueueOnly,
    ConsumerOnly,
    SystemOnly,
    QueueAndConsumer,
    ConsumerAndSystem,
    All,
}

impl EventFilter {
    pub fn accepts(&self, event: &Event) -> bool {
        matches!(
            (self, event),
            (EventFilter::QueueOnly, Event::Queue(_))
                | (EventFilter::ConsumerOnly, Event::Consumer(_))
                | (EventFilter::SystemOnly, Event::System(_))
                | (EventFilter::QueueAndConsumer, Event::Queue(_))
                | (EventFilter::QueueAndConsumer, Event::Consumer(_))
                | (EventFilter::ConsumerAndSystem, Event::Consumer(_))
                | (EventFilter::ConsumerAndSystem, Event::System(_))
                | (EventFilter::All, _)
        )
    }
}
