//! Periodic background workers with graceful shutdown.
//!
//! A [`PeriodicWorker`] drives a recurring job on a fixed interval until a
//! broadcast shutdown signal arrives. A failing tick is logged and the loop
//! keeps going; one bad run must not kill the worker.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A named background job driven on a fixed interval.
///
/// # Shutdown
///
/// The worker listens on a `broadcast::Receiver<()>`; the first message (or
/// a closed channel) ends the loop after the current tick completes. Use
/// [`drain`] to await worker handles with a bounded timeout.
pub struct PeriodicWorker {
    name: &'static str,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl PeriodicWorker {
    /// Create a worker that ticks every `interval`.
    #[must_use]
    pub const fn new(
        name: &'static str,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            name,
            interval,
            shutdown,
        }
    }

    /// Spawn the worker loop, running `job` once per tick.
    ///
    /// The first tick fires after one full interval, not immediately. Errors
    /// returned by `job` are logged at `warn` and the loop continues.
    pub fn spawn<F, Fut, E>(mut self, mut job: F) -> JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), E>> + Send,
        E: std::fmt::Display,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // Consume the immediate first tick so the job starts one interval in.
            ticker.tick().await;
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            info!(
                worker = self.name,
                interval_secs = self.interval.as_secs(),
                "Periodic worker started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = job().await {
                            warn!(worker = self.name, error = %err, "Worker tick failed");
                        }
                    }
                    _ = self.shutdown.recv() => {
                        info!(worker = self.name, "Shutdown signal received");
                        break;
                    }
                }
            }

            info!(worker = self.name, "Periodic worker stopped");
        })
    }
}

/// Wait for background task handles to finish, bounded by `timeout` each.
///
/// Tasks that outlive the timeout are logged and left to be dropped with the
/// runtime.
pub async fn drain(handles: Vec<JoinHandle<()>>, timeout: Duration) {
    for (idx, handle) in handles.into_iter().enumerate() {
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => info!(task = idx, "Background task stopped gracefully"),
            Ok(Err(e)) => warn!(task = idx, error = %e, "Background task failed"),
            Err(_) => warn!(task = idx, "Background task shutdown timed out"),
        }
    }
}
