//! Graceful shutdown handling
//!
//! Signal handling (SIGTERM, SIGINT) plus in-flight request draining. While
//! draining, readiness reports unavailable so load balancers stop routing.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Tracks in-flight requests for graceful draining
#[derive(Default)]
pub struct RequestTracker {
    active: AtomicU64,
    total: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request starting; the returned guard marks it finished on drop.
    pub fn request_start(self: &Arc<Self>) -> RequestGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        RequestGuard {
            tracker: Arc::clone(self),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }
}

/// Decrements the active request count when dropped
pub struct RequestGuard {
    tracker: Arc<RequestTracker>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.tracker.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Coordinates shutdown between the signal handler, the server and readiness.
pub struct ShutdownCoordinator {
    shutdown: AtomicBool,
    watch_tx: watch::Sender<bool>,
    request_tracker: Arc<RequestTracker>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(false);
        Self {
            shutdown: AtomicBool::new(false),
            watch_tx,
            request_tracker: Arc::new(RequestTracker::new()),
        }
    }

    pub fn request_tracker(&self) -> Arc<RequestTracker> {
        self.request_tracker.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Initiate shutdown. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Initiating graceful shutdown");
        self.watch_tx.send_replace(true);
    }

    /// Resolves once shutdown has been initiated.
    pub async fn wait(&self) {
        let mut rx = self.watch_tx.subscribe();
        // Sender lives in self, so the channel cannot close while we wait.
        let _ = rx.wait_for(|down| *down).await;
    }

    /// Initiate shutdown and drive `server` until it finishes or
    /// `drain_timeout` elapses. `None` means in-flight work was abandoned.
    pub async fn drain<F: Future>(&self, server: F, drain_timeout: Duration) -> Option<F::Output> {
        self.shutdown();
        info!(
            active = self.request_tracker.active_count(),
            "Waiting for in-flight requests to complete"
        );
        match tokio::time::timeout(drain_timeout, server).await {
            Ok(output) => {
                info!("All requests drained");
                Some(output)
            }
            Err(_) => {
                warn!(
                    active = self.request_tracker.active_count(),
                    "Drain timeout elapsed, abandoning in-flight requests"
                );
                None
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Completes on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
