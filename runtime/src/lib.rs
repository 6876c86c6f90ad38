//! # Slotbook Runtime
//!
//! Execution machinery for the Slotbook scheduling engine:
//!
//! - [`retry`] - retry policies with exponential backoff for transient
//!   failures (notification delivery, degraded collaborators)
//! - [`timer`] - [`TimerPool`](timer::TimerPool), one-shot callbacks fired at
//!   UTC instants; pending timers are cancelled when the pool is dropped
//! - [`worker`] - [`PeriodicWorker`](worker::PeriodicWorker), a fixed-interval
//!   background job with broadcast-based graceful shutdown and per-tick
//!   failure isolation
//!
//! One-shot timers here are best-effort by design: they do not survive a
//! process restart. Durable reconciliation belongs to a periodic worker.

pub mod retry;
pub mod timer;
pub mod worker;

pub use retry::{RetryPolicy, retry_with_backoff};
pub use timer::TimerPool;
pub use worker::{PeriodicWorker, drain};
