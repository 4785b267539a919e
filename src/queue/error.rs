//! Queue Error Types

use crate::core::error_handling::ContextualError;

/// Broad classification of queue failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid options or registrations detected at setup time
    Configuration,
    /// A topic name that was never registered
    Lookup,
    /// Bounded topic refused an item
    Capacity,
    /// Internal synchronisation failure
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Topic name cannot be empty")]
    EmptyTopicName,

    #[error("Group name cannot be empty")]
    EmptyGroupName,

    #[error("Invalid option '{field}': {message}")]
    InvalidOption {
        field: &'static str,
        message: String,
    },

    #[error("Topic '{topic}' is already registered")]
    TopicAlreadyRegistered { topic: String },

    #[error("Topic '{topic}' is not registered")]
    TopicNotRegistered { topic: String },

    #[error("Topic '{topic}' is registered with item type {registered}, not {requested}")]
    TopicTypeMismatch {
        topic: String,
        registered: &'static str,
        requested: &'static str,
    },

    #[error("Consumer group '{group}' already exists for topic '{topic}'")]
    GroupAlreadyExists { topic: String, group: String },

    #[error(
        "Consumer number {requested} for topic '{topic}' must be between 1 and the partition count {partitions}"
    )]
    ConsumerNumberOutOfRange {
        topic: String,
        requested: usize,
        partitions: usize,
    },

    #[error("Handler for topic '{topic}' group '{group}' does not implement the {expected} contract")]
    HandlerContractMismatch {
        topic: String,
        group: String,
        expected: &'static str,
    },

    #[error("Topic '{topic}' is full (capacity: {capacity})")]
    QueueFull { topic: String, capacity: u64 },

    #[error("Consumer group '{group}' uses auto-commit; commit is not available")]
    AutoCommitEnabled { group: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::EmptyTopicName
            | QueueError::EmptyGroupName
            | QueueError::InvalidOption { .. }
            | QueueError::TopicAlreadyRegistered { .. }
            | QueueError::TopicTypeMismatch { .. }
            | QueueError::GroupAlreadyExists { .. }
            | QueueError::ConsumerNumberOutOfRange { .. }
            | QueueError::HandlerContractMismatch { .. }
            | QueueError::AutoCommitEnabled { .. } => ErrorKind::Configuration,
            QueueError::TopicNotRegistered { .. } => ErrorKind::Lookup,
            QueueError::QueueFull { .. } => ErrorKind::Capacity,
            QueueError::OperationFailed { .. } => ErrorKind::Internal,
        }
    }

    pub fn is_queue_full(&self) -> bool {
        matches!(self, QueueError::QueueFull { .. })
    }
}

impl ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Lookup
        )
    }

    fn user_message(&self) -> Option<String> {
        if self.is_user_actionable() {
            Some(self.to_string())
        } else {
            None
        }
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
