//! Handler factories and per-batch scopes
//!
//! A `HandlerFactory` pairs a constructor with the handler contract it
//! produces, so the contract can be checked against a descriptor's commit mode
//! at registration time. The descriptor's lifetime decides how often the
//! constructor runs: once per descriptor for singletons, once per batch for
//! scoped and transient handlers. Per-batch instances live in a
//! `HandlerScope` that runs the release hook when dropped, including when the
//! handler failed or panicked.

use crate::core::shutdown::ShutdownSignal;
use crate::push::options::CommitMode;
use crate::push::traits::{AutoCommitHandler, HandlerResult, ManualCommitHandler};
use crate::queue::api::{Batch, BufferCommitter};
use std::sync::Arc;

/// A resolved handler behind one of the two contracts
pub enum HandlerInstance<T: Send + Sync + 'static> {
    Auto(Arc<dyn AutoCommitHandler<T>>),
    Manual(Arc<dyn ManualCommitHandler<T>>),
}

impl<T: Send + Sync + 'static> Clone for HandlerInstance<T> {
    fn clone(&self) -> Self {
        match self {
            HandlerInstance::Auto(handler) => HandlerInstance::Auto(Arc::clone(handler)),
            HandlerInstance::Manual(handler) => HandlerInstance::Manual(Arc::clone(handler)),
        }
    }
}

impl<T: Send + Sync + 'static> HandlerInstance<T> {
    pub fn commit_mode(&self) -> CommitMode {
        match self {
            HandlerInstance::Auto(_) => CommitMode::Auto,
            HandlerInstance::Manual(_) => CommitMode::Manual,
        }
    }

    /// Route a batch to whichever contract this instance implements
    pub async fn dispatch(
        &self,
        batch: Batch<T>,
        committer: &BufferCommitter,
        signal: &ShutdownSignal,
    ) -> HandlerResult {
        match self {
            HandlerInstance::Auto(handler) => handler.consume(batch, signal).await,
            HandlerInstance::Manual(handler) => handler.consume(batch, committer, signal).await,
        }
    }
}

type BuildFn<T> = dyn Fn() -> HandlerInstance<T> + Send + Sync;
type ReleaseFn<T> = dyn Fn(&HandlerInstance<T>) + Send + Sync;

/// Constructor for the handler instances of one push consumer descriptor
pub struct HandlerFactory<T: Send + Sync + 'static> {
    commit_mode: CommitMode,
    build: Box<BuildFn<T>>,
    release: Option<Box<ReleaseFn<T>>>,
}

impl<T: Send + Sync + 'static> HandlerFactory<T> {
    /// Factory for auto-commit handlers built by `build`
    pub fn auto<H, F>(build: F) -> Self
    where
        H: AutoCommitHandler<T> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        Self {
            commit_mode: CommitMode::Auto,
            build: Box::new(move || HandlerInstance::Auto(Arc::new(build()))),
            release: None,
        }
    }

    /// Factory for manual-commit handlers built by `build`
    pub fn manual<H, F>(build: F) -> Self
    where
        H: ManualCommitHandler<T> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        Self {
            commit_mode: CommitMode::Manual,
            build: Box::new(move || HandlerInstance::Manual(Arc::new(build()))),
            release: None,
        }
    }

    /// Factory that always hands out the same auto-commit handler
    pub fn auto_instance<H>(handler: Arc<H>) -> Self
    where
        H: AutoCommitHandler<T> + 'static,
    {
        Self {
            commit_mode: CommitMode::Auto,
            build: Box::new(move || HandlerInstance::Auto(handler.clone())),
            release: None,
        }
    }

    /// Factory that always hands out the same manual-commit handler
    pub fn manual_instance<H>(handler: Arc<H>) -> Self
    where
        H: ManualCommitHandler<T> + 'static,
    {
        Self {
            commit_mode: CommitMode::Manual,
            build: Box::new(move || HandlerInstance::Manual(handler.clone())),
            release: None,
        }
    }

    /// Run `hook` on every per-batch instance once its batch is done
    pub fn with_release<R>(mut self, hook: R) -> Self
    where
        R: Fn(&HandlerInstance<T>) + Send + Sync + 'static,
    {
        self.release = Some(Box::new(hook));
        self
    }

    pub fn commit_mode(&self) -> CommitMode {
        self.commit_mode
    }

    pub fn create(&self) -> HandlerInstance<T> {
        (self.build)()
    }

    /// Build a fresh instance bound to a release-on-drop scope
    pub fn scope(&self) -> HandlerScope<'_, T> {
        HandlerScope {
            instance: self.create(),
            release: self.release.as_deref(),
        }
    }
}

/// A handler instance resolved for one batch
pub struct HandlerScope<'a, T: Send + Sync + 'static> {
    instance: HandlerInstance<T>,
    release: Option<&'a ReleaseFn<T>>,
}

impl<'a, T: Send + Sync + 'static> HandlerScope<'a, T> {
    /// Scope around a shared instance; nothing is released
    pub fn shared(instance: HandlerInstance<T>) -> Self {
        Self {
            instance,
            release: None,
        }
    }

    pub fn instance(&self) -> &HandlerInstance<T> {
        &self.instance
    }
}

impl<T: Send + Sync + 'static> Drop for HandlerScope<'_, T> {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            release(&self.instance);
        }
    }
}
