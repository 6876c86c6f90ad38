//! The availability checker: read-only validation that staff, client and
//! workspace are all free for a requested interval.
//!
//! This is a pure function over the in-state appointment book. Only active
//! appointments (`NOT_APPROVED` or `APPROVED`) occupy time; terminal rows
//! awaiting the sweep never block a booking.

use crate::types::{Appointment, ServiceId, TimeSlot, UserRecord, WorkspaceId};

/// Structured reason a slot is unavailable
///
/// The orchestrator maps each variant onto a precise user-facing error
/// instead of reporting a bare "unavailable".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unavailability {
    /// Staff is flagged unavailable or the slot falls outside working hours
    StaffNotAvailable {
        /// The staff member
        email: String,
    },
    /// Staff is not assigned to the requested service
    StaffNotContainingService {
        /// The staff member
        email: String,
        /// The requested service
        service: ServiceId,
    },
    /// Staff or client already has an active appointment in the interval
    Overlap {
        /// Whose calendar conflicts
        email: String,
    },
    /// The workspace is at capacity for the interval
    WorkspaceNotAvailable {
        /// The full workspace
        workspace: WorkspaceId,
    },
}

/// Check that staff, client and workspace are all free for `slot`.
///
/// Guard order: staff flag and working-hours containment, then service
/// assignment, then the strict overlap scan over staff and client calendars,
/// then the workspace capacity count.
///
/// # Errors
///
/// The first [`Unavailability`] encountered, in the order above.
pub fn check_availability<'a>(
    appointments: impl Iterator<Item = &'a Appointment> + Clone,
    staff: &UserRecord,
    client_email: &str,
    service_id: ServiceId,
    workspace_id: WorkspaceId,
    capacity: u32,
    slot: &TimeSlot,
) -> Result<(), Unavailability> {
    let staff_free = staff.available
        && staff
            .working_hours
            .as_ref()
            .is_some_and(|hours| hours.contains(slot));
    if !staff_free {
        return Err(Unavailability::StaffNotAvailable {
            email: staff.email.clone(),
        });
    }

    if !staff.services.contains(&service_id) {
        return Err(Unavailability::StaffNotContainingService {
            email: staff.email.clone(),
            service: service_id,
        });
    }

    let active_overlapping = appointments
        .filter(|a| a.status.is_active())
        .filter(|a| a.slot.overlaps(slot));

    for existing in active_overlapping.clone() {
        if existing.staff_email == staff.email {
            return Err(Unavailability::Overlap {
                email: staff.email.clone(),
            });
        }
        if existing.client_email == client_email {
            return Err(Unavailability::Overlap {
                email: client_email.to_string(),
            });
        }
    }

    let occupied = active_overlapping
        .filter(|a| a.workspace_id == workspace_id)
        .count();
    if occupied >= capacity as usize {
        return Err(Unavailability::WorkspaceNotAvailable {
            workspace: workspace_id,
        });
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{AppointmentId, AppointmentStatus, Money, WorkingHours};
    use chrono::{NaiveTime, TimeZone, Utc};

    fn slot(start_h: u32, end_h: u32) -> TimeSlot {
        let day = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        TimeSlot::new(
            day + chrono::Duration::hours(i64::from(start_h)),
            day + chrono::Duration::hours(i64::from(end_h)),
        )
        .unwrap()
    }

    fn nine_to_five() -> WorkingHours {
        WorkingHours::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn appointment(
        staff: &str,
        client: &str,
        workspace_id: WorkspaceId,
        s: TimeSlot,
        status: AppointmentStatus,
    ) -> Appointment {
        Appointment {
            id: AppointmentId::new(),
            client_email: client.to_string(),
            staff_email: staff.to_string(),
            service_id: ServiceId::new(),
            workspace_id,
            slot: s,
            status,
            price: Money::from_dollars(30),
            booked_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn free_calendar_is_available() {
        let service = ServiceId::new();
        let workspace = WorkspaceId::new();
        let staff = UserRecord::staff("staff@example.com", nine_to_five(), [service]);

        let result = check_availability(
            [].iter(),
            &staff,
            "client@example.com",
            service,
            workspace,
            2,
            &slot(10, 11),
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn unavailable_staff_is_rejected_first() {
        let service = ServiceId::new();
        let workspace = WorkspaceId::new();
        let mut staff = UserRecord::staff("staff@example.com", nine_to_five(), [service]);
        staff.available = false;

        let result = check_availability(
            [].iter(),
            &staff,
            "client@example.com",
            service,
            workspace,
            2,
            &slot(10, 11),
        );
        assert!(matches!(result, Err(Unavailability::StaffNotAvailable { .. })));
    }

    #[test]
    fn slot_outside_working_hours_is_staff_not_available() {
        let service = ServiceId::new();
        let workspace = WorkspaceId::new();
        let staff = UserRecord::staff("staff@example.com", nine_to_five(), [service]);

        let result = check_availability(
            [].iter(),
            &staff,
            "client@example.com",
            service,
            workspace,
            2,
            &slot(7, 8),
        );
        assert!(matches!(result, Err(Unavailability::StaffNotAvailable { .. })));
    }

    #[test]
    fn unassigned_service_is_rejected() {
        let workspace = WorkspaceId::new();
        let staff = UserRecord::staff("staff@example.com", nine_to_five(), [ServiceId::new()]);
        let other_service = ServiceId::new();

        let result = check_availability(
            [].iter(),
            &staff,
            "client@example.com",
            other_service,
            workspace,
            2,
            &slot(10, 11),
        );
        assert!(matches!(
            result,
            Err(Unavailability::StaffNotContainingService { .. })
        ));
    }

    #[test]
    fn staff_overlap_is_detected() {
        let service = ServiceId::new();
        let workspace = WorkspaceId::new();
        let staff = UserRecord::staff("staff@example.com", nine_to_five(), [service]);
        let book = vec![appointment(
            "staff@example.com",
            "someone-else@example.com",
            workspace,
            slot(10, 11),
            AppointmentStatus::NotApproved,
        )];

        let result = check_availability(
            book.iter(),
            &staff,
            "client@example.com",
            service,
            workspace,
            5,
            &slot(10, 11),
        );
        assert_eq!(
            result,
            Err(Unavailability::Overlap {
                email: "staff@example.com".to_string()
            })
        );
    }

    #[test]
    fn client_overlap_is_detected_across_staff() {
        let service = ServiceId::new();
        let workspace = WorkspaceId::new();
        let staff = UserRecord::staff("staff@example.com", nine_to_five(), [service]);
        let book = vec![appointment(
            "other-staff@example.com",
            "client@example.com",
            WorkspaceId::new(),
            slot(10, 11),
            AppointmentStatus::Approved,
        )];

        let result = check_availability(
            book.iter(),
            &staff,
            "client@example.com",
            service,
            workspace,
            5,
            &slot(10, 12),
        );
        assert_eq!(
            result,
            Err(Unavailability::Overlap {
                email: "client@example.com".to_string()
            })
        );
    }

    #[test]
    fn terminal_appointments_do_not_occupy_time() {
        let service = ServiceId::new();
        let workspace = WorkspaceId::new();
        let staff = UserRecord::staff("staff@example.com", nine_to_five(), [service]);
        let book = vec![
            appointment(
                "staff@example.com",
                "a@example.com",
                workspace,
                slot(10, 11),
                AppointmentStatus::Canceled,
            ),
            appointment(
                "staff@example.com",
                "b@example.com",
                workspace,
                slot(10, 11),
                AppointmentStatus::Completed,
            ),
        ];

        let result = check_availability(
            book.iter(),
            &staff,
            "client@example.com",
            service,
            workspace,
            1,
            &slot(10, 11),
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn workspace_capacity_is_enforced_across_staff() {
        let service = ServiceId::new();
        let workspace = WorkspaceId::new();
        let staff = UserRecord::staff("staff@example.com", nine_to_five(), [service]);
        // Capacity 1, already one active appointment in the same workspace with
        // different staff and client.
        let book = vec![appointment(
            "other-staff@example.com",
            "other-client@example.com",
            workspace,
            slot(10, 11),
            AppointmentStatus::Approved,
        )];

        let result = check_availability(
            book.iter(),
            &staff,
            "client@example.com",
            service,
            workspace,
            1,
            &slot(10, 11),
        );
        assert_eq!(
            result,
            Err(Unavailability::WorkspaceNotAvailable { workspace })
        );
    }
}
