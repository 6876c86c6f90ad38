//! Domain types for the appointment booking engine.
//!
//! This module contains all value objects and entities: identifiers, money,
//! roles, the appointment status enumeration, time slots, working hours, and
//! the directory/catalog record types shared with collaborators.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an appointment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentId(Uuid);

impl AppointmentId {
    /// Creates a new random `AppointmentId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `AppointmentId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AppointmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(Uuid);

impl ServiceId {
    /// Creates a new random `ServiceId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ServiceId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ServiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a workspace
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(Uuid);

impl WorkspaceId {
    /// Creates a new random `WorkspaceId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `WorkspaceId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Creates a `Money` value from dollars, saturating on overflow
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in whole dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Adds two money amounts, saturating at `u64::MAX` cents
    ///
    /// Used for accumulating profit aggregates, which must never panic
    /// inside a sweep.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Roles and Status
// ============================================================================

/// User roles relevant to scheduling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Books appointments; may cancel, never approve or complete
    Client,
    /// Is booked for services; may approve, complete and cancel
    Staff,
    /// Full transition rights, same as staff for scheduling purposes
    Admin,
}

impl Role {
    /// Whether this role may drive an appointment into the given status
    #[must_use]
    pub const fn may_set(&self, status: AppointmentStatus) -> bool {
        match status {
            AppointmentStatus::Approved | AppointmentStatus::Completed => {
                matches!(self, Self::Staff | Self::Admin)
            }
            AppointmentStatus::Canceled | AppointmentStatus::NotApproved => true,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "CLIENT"),
            Self::Staff => write!(f, "STAFF"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Lifecycle status of an appointment
///
/// `NotApproved` is the initial state and is reachable only via creation,
/// never via update. `Completed` and `Canceled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    /// Created, awaiting staff approval
    NotApproved,
    /// Approved by staff; will auto-complete at its end time
    Approved,
    /// Finished; awaiting aggregate accounting and removal by the sweep
    Completed,
    /// Canceled by a party or expired unapproved
    Canceled,
}

impl AppointmentStatus {
    /// Whether this status admits no further transitions
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Whether appointments in this status occupy staff/client/workspace time
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::NotApproved | Self::Approved)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApproved => write!(f, "NOT_APPROVED"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Canceled => write!(f, "CANCELED"),
        }
    }
}

// ============================================================================
// Time
// ============================================================================

/// A half-open `[start, end)` UTC interval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeSlot {
    /// Create a slot; `end` must be strictly after `start`
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if end > start { Some(Self { start, end }) } else { None }
    }

    /// Start of the slot (inclusive)
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the slot (exclusive)
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Strict overlap test: `self.start < other.end && self.end > other.start`
    ///
    /// Back-to-back slots (one ending exactly when the other starts) do not
    /// overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// A staff member's daily working window `[begin, end)`, wall-clock UTC
///
/// Overnight windows (begin >= end) are rejected at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    begin: NaiveTime,
    end: NaiveTime,
}

impl WorkingHours {
    /// Create a working window; `begin` must precede `end`
    #[must_use]
    pub fn new(begin: NaiveTime, end: NaiveTime) -> Option<Self> {
        if begin < end { Some(Self { begin, end }) } else { None }
    }

    /// Whether the window fully contains the slot
    ///
    /// A slot spanning midnight can never fit a same-day window and is
    /// rejected outright.
    #[must_use]
    pub fn contains(&self, slot: &TimeSlot) -> bool {
        if slot.start().date_naive() != slot.end().date_naive() {
            return false;
        }
        slot.start().time() >= self.begin && slot.end().time() <= self.end
    }
}

// ============================================================================
// Appointment
// ============================================================================

/// The central scheduling entity
///
/// References client, staff, service and workspace by identity; the workspace
/// is captured at booking time (derived from the service) so capacity checks
/// never need a catalog lookup. The price owed is the price agreed when the
/// booking was made.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Appointment identity
    pub id: AppointmentId,
    /// Client email (role CLIENT)
    pub client_email: String,
    /// Staff email (role STAFF)
    pub staff_email: String,
    /// Booked service
    pub service_id: ServiceId,
    /// Workspace the service belongs to, captured at booking time
    pub workspace_id: WorkspaceId,
    /// The booked `[start, end)` interval
    pub slot: TimeSlot,
    /// Current lifecycle status
    pub status: AppointmentStatus,
    /// Price agreed at booking time
    pub price: Money,
    /// When the booking was made
    pub booked_at: DateTime<Utc>,
}

impl Appointment {
    /// End of the booked interval
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.slot.end()
    }

    /// Whether the booked interval has passed as of `now`
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        now >= self.slot.end()
    }
}

// ============================================================================
// Directory / catalog records
// ============================================================================

/// A user as the directory reports it
///
/// Staff carry a working window and service assignments; clients carry
/// neither.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Login email, the directory key
    pub email: String,
    /// Scheduling role
    pub role: Role,
    /// Daily working window (staff only)
    pub working_hours: Option<WorkingHours>,
    /// Whether the user currently accepts bookings
    pub available: bool,
    /// Services this staff member is assigned to
    pub services: HashSet<ServiceId>,
}

impl UserRecord {
    /// A client record: no working window, no service assignments
    #[must_use]
    pub fn client(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: Role::Client,
            working_hours: None,
            available: true,
            services: HashSet::new(),
        }
    }

    /// A staff record with a working window and service assignments
    #[must_use]
    pub fn staff(
        email: impl Into<String>,
        working_hours: WorkingHours,
        services: impl IntoIterator<Item = ServiceId>,
    ) -> Self {
        Self {
            email: email.into(),
            role: Role::Staff,
            working_hours: Some(working_hours),
            available: true,
            services: services.into_iter().collect(),
        }
    }
}

/// Per-staff aggregate counters, mutated only by the cleanup sweep
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffStats {
    /// Number of appointments this staff member has completed
    pub completed_appointments: u64,
    /// Accumulated profit from completed appointments
    pub profit: Money,
}

/// A service as the catalog reports it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Service identity
    pub id: ServiceId,
    /// Display name
    pub name: String,
    /// Appointment duration; the end time is always `start + duration`
    pub duration: Duration,
    /// Price charged per appointment
    pub price: Money,
    /// Whether this service is currently bookable
    pub available: bool,
    /// The workspace this service runs in
    pub workspace_id: WorkspaceId,
}

/// A workspace as the catalog reports it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    /// Workspace identity
    pub id: WorkspaceId,
    /// Unique display name
    pub name: String,
    /// Maximum concurrent appointments across all the workspace's services
    pub capacity: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slot(start_h: u32, end_h: u32) -> TimeSlot {
        let day = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        TimeSlot::new(
            day + chrono::Duration::hours(i64::from(start_h)),
            day + chrono::Duration::hours(i64::from(end_h)),
        )
        .unwrap()
    }

    #[test]
    fn slot_rejects_empty_interval() {
        let t = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        assert!(TimeSlot::new(t, t).is_none());
        assert!(TimeSlot::new(t, t - chrono::Duration::minutes(1)).is_none());
    }

    #[test]
    fn overlap_is_strict() {
        assert!(slot(9, 11).overlaps(&slot(10, 12)));
        assert!(slot(10, 12).overlaps(&slot(9, 11)));
        assert!(slot(9, 12).overlaps(&slot(10, 11)));
        // Back-to-back slots do not overlap
        assert!(!slot(9, 10).overlaps(&slot(10, 11)));
        assert!(!slot(10, 11).overlaps(&slot(9, 10)));
    }

    #[test]
    fn working_hours_containment() {
        let hours = WorkingHours::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
        .unwrap();

        assert!(hours.contains(&slot(9, 17)));
        assert!(hours.contains(&slot(10, 11)));
        assert!(!hours.contains(&slot(8, 10)));
        assert!(!hours.contains(&slot(16, 18)));
    }

    #[test]
    fn working_hours_reject_overnight_window() {
        let begin = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        assert!(WorkingHours::new(begin, end).is_none());
    }

    #[test]
    fn midnight_spanning_slot_is_never_contained() {
        let hours = WorkingHours::new(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        )
        .unwrap();
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 23, 0, 0).unwrap();
        let crossing = TimeSlot::new(start, start + chrono::Duration::hours(2)).unwrap();
        assert!(!hours.contains(&crossing));
    }

    #[test]
    fn money_display_and_arithmetic() {
        let price = Money::from_cents(12_345);
        assert_eq!(price.to_string(), "$123.45");
        assert_eq!(Money::from_dollars(50).cents(), 5000);
        assert_eq!(
            Money::from_cents(u64::MAX).saturating_add(Money::from_cents(1)),
            Money::from_cents(u64::MAX)
        );
    }

    #[test]
    fn role_transition_rights() {
        assert!(!Role::Client.may_set(AppointmentStatus::Approved));
        assert!(!Role::Client.may_set(AppointmentStatus::Completed));
        assert!(Role::Client.may_set(AppointmentStatus::Canceled));
        assert!(Role::Staff.may_set(AppointmentStatus::Approved));
        assert!(Role::Admin.may_set(AppointmentStatus::Completed));
    }

    #[test]
    fn appointment_serde_round_trip() {
        let appointment = Appointment {
            id: AppointmentId::new(),
            client_email: "client@example.com".to_string(),
            staff_email: "staff@example.com".to_string(),
            service_id: ServiceId::new(),
            workspace_id: WorkspaceId::new(),
            slot: slot(9, 10),
            status: AppointmentStatus::NotApproved,
            price: Money::from_dollars(40),
            booked_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        };

        let json = serde_json::to_string(&appointment).unwrap();
        let back: Appointment = serde_json::from_str(&json).unwrap();
        assert_eq!(appointment, back);
    }
}
