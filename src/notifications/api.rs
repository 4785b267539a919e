//! Public API for the notification system
//!
//! External modules should import from here rather than directly from
//! internal modules.

use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;

// Core event types and enums
pub use crate::notifications::event::{
    ConsumerEvent, ConsumerEventType, Event, EventFilter, QueueEvent, QueueEventType, SystemEvent,
    SystemEventType,
};

// Manager and utilities
pub use crate::notifications::error::NotificationError;
pub use crate::notifications::manager::{AsyncNotificationManager, EventReceiver};

// Statistics
pub use crate::notifications::traits::SubscriberStatistics;

/// Shared handle to a notification manager
pub type NotificationService = Arc<Mutex<AsyncNotificationManager>>;

/// Global notification service instance
static NOTIFICATION_SERVICE: LazyLock<NotificationService> = LazyLock::new(|| {
    log::trace!("Initializing notification service");
    Arc::new(Mutex::new(AsyncNotificationManager::new()))
});

/// Access notification service
///
/// Returns a guard over the process-wide notification manager. Each call
/// locks the same shared instance.
///
/// # Examples
/// ```no_run
/// # use bufferqueue::notifications::api::{get_notification_service, Event, SystemEvent, SystemEventType};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut manager = get_notification_service().await;
/// let event = Event::System(SystemEvent::new(SystemEventType::Startup));
/// manager.publish(event).await?;
/// # Ok(())
/// # }
/// ```
pub async fn get_notification_service() -> tokio::sync::MutexGuard<'static, AsyncNotificationManager>
{
    log::trace!("Acquiring notification service lock");
    NOTIFICATION_SERVICE.lock().await
}

/// Shared reference to the process-wide service, for injecting into components
pub fn get_notification_service_arc() -> NotificationService {
    NOTIFICATION_SERVICE.clone()
}
