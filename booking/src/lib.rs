//! Slotbook - an appointment booking backend.
//!
//! Appointments move through a four-state lifecycle (`NOT_APPROVED` →
//! `APPROVED` → `COMPLETED`, with `CANCELED` reachable from either active
//! state) under a conflict-avoidance engine that keeps staff calendars,
//! client calendars and workspace capacity consistent.
//!
//! # Architecture
//!
//! ```text
//! Write side (single writer):
//! ┌──────────────────┐   ┌────────────────────┐
//! │ BookingService   │   │ TransitionService  │
//! │ (resolve+validate)│  │ (role+machine)     │
//! └────────┬─────────┘   └─────────┬──────────┘
//!          └──────────┬────────────┘
//!                     ▼
//!          ┌─────────────────────┐
//!          │  SchedulingEngine   │  one reducer, one write lock:
//!          │  (appointment book) │  check+insert is atomic, racing
//!          └─────────┬───────────┘  writers are serialized
//!                    │ Effect::Delay
//!                    ▼
//!          ┌─────────────────────┐   ┌──────────────────┐
//!          │     TimerPool       │   │   CleanupSweep   │
//!          │ (one-shot, lossy)   │   │ (periodic, durable)
//!          └─────────────────────┘   └──────────────────┘
//! ```
//!
//! Time-driven transitions are belt and suspenders: a one-shot timer fires
//! at the appointment's end for low latency, and the periodic sweep enforces
//! the same rules as a durable backstop. Both paths re-check the expected
//! precursor status before writing, so a timer that lost a race with a user
//! action is a silent no-op.
//!
//! All timestamps are UTC.

pub mod app;
pub mod availability;
pub mod catalog;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod machine;
pub mod notify;
pub mod sweep;
pub mod types;

pub use app::{AppointmentFilter, AppointmentSummary, BookingService, TransitionService};
pub use config::Config;
pub use engine::{SchedulingEngine, SchedulingEnvironment};
pub use error::{BookingError, ErrorKind};
pub use sweep::{CleanupSweep, SweepReport, SweepWorker};
