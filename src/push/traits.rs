//! Handler contracts for push consumers

use crate::core::shutdown::ShutdownSignal;
use crate::queue::api::{Batch, BufferCommitter};
use async_trait::async_trait;

/// Error returned by a handler for one batch
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<(), HandlerError>;

/// Handler whose batches count as processed on delivery
#[async_trait]
pub trait AutoCommitHandler<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Process one non-empty batch
    ///
    /// `signal` fires on shutdown; long-running handlers should watch it.
    async fn consume(&self, batch: Batch<T>, signal: &ShutdownSignal) -> HandlerResult;
}

/// Handler that checkpoints progress through a committer
#[async_trait]
pub trait ManualCommitHandler<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Process one non-empty batch and call `committer.commit()` when done
    async fn consume(
        &self,
        batch: Batch<T>,
        committer: &BufferCommitter,
        signal: &ShutdownSignal,
    ) -> HandlerResult;
}
