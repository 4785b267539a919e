//! Public API for push consumers
//!
//! External modules should import from here rather than directly from
//! internal modules.

// Descriptors
pub use crate::push::options::{CommitMode, HandlerLifetime, PushConsumerOptions};

// Handler contracts
pub use crate::push::traits::{AutoCommitHandler, HandlerError, HandlerResult, ManualCommitHandler};

// Handler resolution
pub use crate::push::factory::{HandlerFactory, HandlerInstance, HandlerScope};

// Hosting
pub use crate::push::host::{PushConsumerHost, PushConsumerHostBuilder, PushConsumerStats};
