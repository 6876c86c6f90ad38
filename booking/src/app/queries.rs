//! Read-side queries over the appointment book.
//!
//! Queries take a snapshot under the read lock and filter outside it, so a
//! slow caller never blocks the write path.

use crate::engine::SchedulingEngine;
use crate::types::{AppointmentId, AppointmentStatus, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on rows a single query returns
const MAX_RESULTS: usize = 100;

/// Filter over the appointment book; unset fields match everything
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    /// Match this client email only
    pub client_email: Option<String>,
    /// Match this staff email only
    pub staff_email: Option<String>,
    /// Match this status only
    pub status: Option<AppointmentStatus>,
    /// Cap on returned rows, clamped to the query maximum
    pub limit: Option<usize>,
}

/// A read-model row, ordered by start time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSummary {
    /// The appointment
    pub id: AppointmentId,
    /// Booking client
    pub client_email: String,
    /// Serving staff member
    pub staff_email: String,
    /// Current status
    pub status: AppointmentStatus,
    /// Interval start
    pub start: DateTime<Utc>,
    /// Interval end
    pub end: DateTime<Utc>,
    /// Price captured at booking time
    pub price: Money,
}

/// List appointments matching `filter`, sorted by start time ascending
pub async fn list_appointments(
    engine: &SchedulingEngine,
    filter: &AppointmentFilter,
) -> Vec<AppointmentSummary> {
    let limit = filter.limit.unwrap_or(MAX_RESULTS).min(MAX_RESULTS);

    let mut rows: Vec<AppointmentSummary> = engine
        .snapshot()
        .await
        .into_iter()
        .filter(|appointment| {
            filter
                .client_email
                .as_ref()
                .is_none_or(|email| appointment.client_email == *email)
                && filter
                    .staff_email
                    .as_ref()
                    .is_none_or(|email| appointment.staff_email == *email)
                && filter
                    .status
                    .is_none_or(|status| appointment.status == status)
        })
        .map(|appointment| AppointmentSummary {
            id: appointment.id,
            client_email: appointment.client_email,
            staff_email: appointment.staff_email,
            status: appointment.status,
            start: appointment.slot.start(),
            end: appointment.slot.end(),
            price: appointment.price,
        })
        .collect();

    rows.sort_by_key(|row| row.start);
    rows.truncate(limit);
    rows
}
