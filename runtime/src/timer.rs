//! One-shot deferred callbacks fired at UTC instants.
//!
//! A [`TimerPool`] owns the tasks backing its pending timers. Dropping the
//! pool aborts everything still pending, so an engine that owns a pool never
//! leaks timers past its own lifetime. Timers are best-effort: they do not
//! survive a process restart, and a timer that fires after its target state
//! has moved on must be neutralized by a guard re-check at the callback site,
//! not by explicit cancellation here.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// A pool of one-shot timers, each firing a callback at a UTC instant.
///
/// Completed tasks are pruned lazily on each `schedule` call, so the handle
/// list stays proportional to the number of pending timers.
pub struct TimerPool {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TimerPool {
    /// Create an empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Schedule `callback` to run once at `fires_at`.
    ///
    /// `now` is passed in rather than read from the system so callers can
    /// schedule against an injected clock. A target instant already in the
    /// past fires immediately.
    pub fn schedule_at(
        &self,
        now: DateTime<Utc>,
        fires_at: DateTime<Utc>,
        callback: BoxFuture<'static, ()>,
    ) {
        let delay = (fires_at - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        self.schedule_after(delay, callback);
    }

    /// Schedule `callback` to run once after `delay`.
    pub fn schedule_after(&self, delay: std::time::Duration, callback: BoxFuture<'static, ()>) {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback.await;
        });

        let mut handles = match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        debug!(pending = handles.len(), delay_ms = delay.as_millis(), "Timer scheduled");
    }

    /// Number of timers not yet finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        let handles = match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handles.iter().filter(|h| !h.is_finished()).count()
    }
}

impl Default for TimerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerPool {
    fn drop(&mut self) {
        let handles = match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for handle in handles.iter() {
            handle.abort();
        }
    }
}
