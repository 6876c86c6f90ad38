//! Application layer: the booking and transition orchestrators plus
//! read-side queries over the appointment book.

mod queries;
mod services;

pub use queries::{AppointmentFilter, AppointmentSummary, list_appointments};
pub use services::{BookingService, TransitionService};
