//! Validation utilities for topic and consumer configuration
//!
//! Shared checks used by option structs before any queue state is created.

use crate::queue::error::{QueueError, QueueResult};

/// Validate a topic name (non-empty, not only whitespace)
pub fn validate_topic_name(name: &str) -> QueueResult<()> {
    if name.trim().is_empty() {
        return Err(QueueError::EmptyTopicName);
    }
    Ok(())
}

/// Validate a consumer group name (non-empty, not only whitespace)
pub fn validate_group_name(name: &str) -> QueueResult<()> {
    if name.trim().is_empty() {
        return Err(QueueError::EmptyGroupName);
    }
    Ok(())
}

/// Validate that a numeric option is at least 1
pub fn validate_positive(field: &'static str, value: u64) -> QueueResult<()> {
    if value == 0 {
        return Err(QueueError::InvalidOption {
            field,
            message: "value must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// Validate a CLI-provided positive integer
pub fn validate_positive_int(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}
