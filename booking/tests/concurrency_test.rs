//! Concurrency integration tests.
//!
//! Verifies that racing bookings for the same resources cannot both land:
//! the availability check and the insert happen under one write lock, so
//! exactly one concurrent writer wins.
//!
//! Run with: `cargo test --test concurrency_test`

#![allow(clippy::unwrap_used)]

use chrono::{Duration, NaiveTime, Utc};
use slotbook_core::environment::Clock;
use slotbook::engine::{SchedulingEngine, SchedulingEnvironment};
use slotbook::types::{
    Appointment, AppointmentId, AppointmentStatus, Money, Role, ServiceId, TimeSlot, UserRecord,
    WorkingHours, WorkspaceId,
};
use slotbook_testing::test_clock;
use std::sync::Arc;

fn all_day() -> WorkingHours {
    WorkingHours::new(
        NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
    )
    .unwrap()
}

fn appointment_for(
    staff_email: &str,
    client_email: &str,
    service: ServiceId,
    workspace: WorkspaceId,
    slot: TimeSlot,
) -> Appointment {
    Appointment {
        id: AppointmentId::new(),
        client_email: client_email.to_string(),
        staff_email: staff_email.to_string(),
        service_id: service,
        workspace_id: workspace,
        slot,
        status: AppointmentStatus::NotApproved,
        price: Money::from_dollars(40),
        booked_at: Utc::now(),
    }
}

#[tokio::test]
async fn racing_bookings_for_the_same_staff_admit_exactly_one() {
    let clock = Arc::new(test_clock());
    let engine = SchedulingEngine::new(SchedulingEnvironment::new(clock.clone()));

    let service = ServiceId::new();
    let workspace = WorkspaceId::new();
    let start = clock.now() + Duration::hours(1);
    let slot = TimeSlot::new(start, start + Duration::hours(1)).unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let engine = engine.clone();
        let client = format!("client-{i}@example.com");
        let appointment =
            appointment_for("staff@example.com", &client, service, workspace, slot);
        let staff = UserRecord::staff("staff@example.com", all_day(), [service]);
        handles.push(tokio::spawn(async move {
            engine.book(appointment, staff, 100).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1, "exactly one racing booking may win");
    assert_eq!(engine.count().await, 1);
}

#[tokio::test]
async fn racing_bookings_cannot_blow_workspace_capacity() {
    let clock = Arc::new(test_clock());
    let engine = SchedulingEngine::new(SchedulingEnvironment::new(clock.clone()));

    let workspace = WorkspaceId::new();
    let start = clock.now() + Duration::hours(1);
    let slot = TimeSlot::new(start, start + Duration::hours(1)).unwrap();
    let capacity = 3u32;

    // Distinct staff and clients per attempt, so only capacity can reject.
    let mut handles = Vec::new();
    for i in 0..16 {
        let engine = engine.clone();
        let service = ServiceId::new();
        let staff_email = format!("staff-{i}@example.com");
        let client_email = format!("client-{i}@example.com");
        let appointment =
            appointment_for(&staff_email, &client_email, service, workspace, slot);
        let staff = UserRecord::staff(&staff_email, all_day(), [service]);
        handles.push(tokio::spawn(async move {
            engine.book(appointment, staff, capacity).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 3, "admissions must stop at workspace capacity");
    assert_eq!(engine.count().await, 3);
}

#[tokio::test]
async fn concurrent_transitions_on_one_appointment_admit_exactly_one() {
    let clock = Arc::new(test_clock());
    let engine = SchedulingEngine::new(SchedulingEnvironment::new(clock.clone()));

    let service = ServiceId::new();
    let start = clock.now() + Duration::hours(1);
    let slot = TimeSlot::new(start, start + Duration::hours(1)).unwrap();
    let appointment = appointment_for(
        "staff@example.com",
        "client@example.com",
        service,
        WorkspaceId::new(),
        slot,
    );
    let id = appointment.id;
    let staff = UserRecord::staff("staff@example.com", all_day(), [service]);
    engine.book(appointment, staff, 1).await.unwrap();

    // A cancel races an approval; whichever lands second must observe the
    // first and either fail (approve after cancel is terminal) or succeed
    // along a valid edge (cancel after approve). Both orderings leave the
    // book in a legal state.
    let cancel = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .update_status(id, AppointmentStatus::Canceled, Role::Client)
                .await
        })
    };
    let approve = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .update_status(id, AppointmentStatus::Approved, Role::Staff)
                .await
        })
    };

    let cancel_result = cancel.await.unwrap();
    let approve_result = approve.await.unwrap();
    let final_status = engine.get(id).await.unwrap().status;

    // Cancel is valid from both NOT_APPROVED and APPROVED, so it always
    // lands; the approval only succeeds if it got in first.
    assert!(cancel_result.is_ok());
    assert_eq!(final_status, AppointmentStatus::Canceled);
    if approve_result.is_err() {
        let err = approve_result.unwrap_err();
        assert_eq!(err.code(), "APPOINTMENT_CANNOT_BE_MODIFIED");
    }
}
