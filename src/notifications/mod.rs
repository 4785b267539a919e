//! Notification system
//!
//! Queue, consumer and system events fan out to filtered subscribers through
//! an `AsyncNotificationManager`. The push consumer host reports loop
//! lifecycle and handler failures here; the runner reports topic registration
//! and refused items. Components take a `NotificationService` so tests can
//! inject a private manager instead of the process-wide one.

pub(crate) mod error;
pub(crate) mod event;
pub(crate) mod manager;
pub(crate) mod traits;

// Public API module - the only public interface for the notification system
pub mod api;

#[cfg(test)]
mod tests;
