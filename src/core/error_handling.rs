//! Generic error handling utilities
//!
//! Provides unified error logging that works across error types while keeping
//! the distinction between configuration mistakes a caller can fix and
//! internal failures.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; otherwise it returns `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error carries a specific message the caller can act on
    ///
    /// Examples: blank topic names, out-of-range consumer counts, duplicate
    /// consumer groups, unknown topics.
    fn is_user_actionable(&self) -> bool;

    /// Returns the specific user message if this is a user-actionable error
    fn user_message(&self) -> Option<String>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// User-actionable errors log their own message; system errors log the
/// operation context and keep the details at debug level.
///
/// # Examples
/// ```rust,no_run
/// # use bufferqueue::core::error_handling::log_error_with_context;
/// # use bufferqueue::queue::api::QueueError;
/// let err = QueueError::EmptyGroupName;
/// log_error_with_context(&err, "Creating pull consumers");
/// // Logs: "Creating pull consumers: Group name cannot be empty"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => {
            log::error!("{}: {}", operation_context, user_msg);
        }
        _ => {
            log::error!("{} failed", operation_context);
        }
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

/// Render an error and its source chain on one line
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
