//! Shutdown and cancellation coordination
//!
//! `ShutdownCoordinator` is the cancellation source for every long-running loop
//! in the crate. Loops hold a `ShutdownSignal`, check it between units of work,
//! and suspend on it while idle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Coordinates graceful shutdown across the application
pub struct ShutdownCoordinator {
    pub shutdown_tx: broadcast::Sender<()>,
    pub shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new() -> (Self, broadcast::Receiver<()>) {
        // Use a larger channel to avoid dropping bursts of shutdown signals
        let (shutdown_tx, shutdown_rx) = broadcast::channel(8);
        let shutdown_requested = Arc::new(AtomicBool::new(false));

        let coordinator = Self {
            shutdown_tx,
            shutdown_requested,
        };

        (coordinator, shutdown_rx)
    }

    /// Subscribe to shutdown notifications
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Hand out a cancellation signal bound to this coordinator
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_tx.subscribe(),
            requested: Arc::clone(&self.shutdown_requested),
        }
    }

    /// Trigger shutdown
    pub fn trigger_shutdown(&self) {
        // Release pairs with the Acquire load in is_shutdown_requested()
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    /// Check if shutdown has been requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Guard execution of a future with shutdown coordination
    ///
    /// Installs Ctrl-C/termination handlers that trigger the coordinator, then
    /// hands the coordinator to the closure.
    pub async fn guard<F, Fut, R, E>(future_fn: F) -> Result<R, E>
    where
        F: FnOnce(Self) -> Fut,
        Fut: std::future::Future<Output = Result<R, E>>,
    {
        let (coordinator, _shutdown_rx) = Self::new();

        setup_signal_handlers(
            coordinator.shutdown_tx.clone(),
            coordinator.shutdown_requested.clone(),
        );

        future_fn(coordinator).await
    }
}

/// Cancellation signal observed by pull loops and handlers
///
/// Cheap to clone; every clone observes the same coordinator.
pub struct ShutdownSignal {
    rx: broadcast::Receiver<()>,
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Non-blocking check used between drain attempts and dispatches
    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Suspend until shutdown is triggered
    ///
    /// Never resolves if the coordinator is dropped without triggering.
    pub async fn triggered(&mut self) {
        if self.is_triggered() {
            return;
        }
        match self.rx.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => {
                if !self.is_triggered() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

impl Clone for ShutdownSignal {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.resubscribe(),
            requested: Arc::clone(&self.requested),
        }
    }
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>, shutdown_requested: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let tx = shutdown_tx.clone();
        let requested = shutdown_requested.clone();
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                if sig.recv().await.is_some() {
                    requested.store(true, Ordering::Release);
                    let _ = tx.send(());
                }
            }
        });
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_requested.store(true, Ordering::Release);
            let _ = shutdown_tx.send(());
            // Second Ctrl-C forces exit
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Ctrl-C received twice; exiting");
                std::process::exit(130);
            }
        }
    });
}
