//! Push consumers
//!
//! A push consumer is a descriptor (topic, group, batch size, concurrency,
//! commit mode, handler lifetime) paired with a handler factory. The
//! `PushConsumerHost` creates the descriptor's consumer group and runs one
//! loop per pull consumer, handing every batch to a handler.
//!
//! # Handler contracts
//!
//! - [`AutoCommitHandler`](api::AutoCommitHandler) receives the batch and the
//!   shutdown signal. Batches count as processed on delivery.
//! - [`ManualCommitHandler`](api::ManualCommitHandler) also receives a
//!   [`BufferCommitter`](crate::queue::api::BufferCommitter) and checkpoints
//!   explicitly.
//!
//! The factory's contract must match the descriptor's commit mode; the host
//! rejects mismatches when the consumer is added.
//!
//! # Lifetimes
//!
//! - `Singleton`: one instance per descriptor, shared by all of its loops.
//! - `Scoped` and `Transient`: a fresh instance per batch, released once the
//!   batch is done.
//!
//! Handler errors and panics are logged and published as
//! `ConsumerEventType::HandlerFailed`; the loop moves on to the next batch.

pub mod api;
pub(crate) mod factory;
pub(crate) mod host;
pub(crate) mod options;
pub(crate) mod traits;

#[cfg(test)]
mod tests;
