//! The scheduling engine: the appointment book, the reducer that owns every
//! status write, and the store that serializes mutations and executes timer
//! effects.
//!
//! All four mutation paths - booking, user-driven transitions, firing timers
//! and sweep removals - go through one reducer behind one write lock, so the
//! availability check and the subsequent insert are atomic, and concurrent
//! writers to the same appointment are serialized. A timer that lost the
//! race observes the changed status in its guard re-check and becomes a
//! no-op.

mod reducer;
mod store;

pub use reducer::{
    Rejection, SchedulingAction, SchedulingEnvironment, SchedulingReducer, SchedulingState,
    StatusChange,
};
pub use store::SchedulingEngine;
