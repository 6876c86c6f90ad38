//! The scheduling reducer - every status write in the system happens here.

use crate::availability::{Unavailability, check_availability};
use crate::machine::{self, TransitionError};
use crate::types::{Appointment, AppointmentId, AppointmentStatus, Role, UserRecord};
use chrono::{DateTime, Utc};
use slotbook_core::{
    SmallVec, effect::Effect, environment::Clock, reducer::Reducer, smallvec,
};
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the scheduling engine
#[derive(Clone, Debug)]
pub enum SchedulingAction {
    // Commands
    /// Book a new appointment: availability check + insert, atomically
    Book {
        /// The fully resolved appointment to insert (status `NOT_APPROVED`)
        appointment: Appointment,
        /// Directory snapshot of the staff member being booked
        staff: UserRecord,
        /// Capacity of the appointment's workspace
        capacity: u32,
    },

    /// A user-driven status change (approve / cancel / complete)
    RequestTransition {
        /// Appointment to transition
        id: AppointmentId,
        /// The status asked for
        requested: AppointmentStatus,
        /// Role of the requesting actor
        actor: Role,
    },

    /// Arm a one-shot deferred transition firing at a UTC instant
    ArmDeferred {
        /// Appointment to watch
        id: AppointmentId,
        /// Status the timer will attempt (`Completed` or `Canceled`)
        target: AppointmentStatus,
        /// When the timer fires
        fires_at: DateTime<Utc>,
    },

    /// A deferred transition firing: guarded, stale timers become no-ops
    ApplyDeferred {
        /// Appointment to transition
        id: AppointmentId,
        /// Status the timer was armed for
        target: AppointmentStatus,
    },

    /// Remove an appointment from the book (sweep deletions)
    Remove {
        /// Appointment to remove
        id: AppointmentId,
    },

    // Events
    /// An appointment passed the availability check and was inserted
    Booked {
        /// The inserted appointment
        appointment: Appointment,
    },

    /// An appointment's status changed along a valid edge
    StatusChanged {
        /// The appointment
        id: AppointmentId,
        /// Status before
        from: AppointmentStatus,
        /// Status after
        to: AppointmentStatus,
    },

    /// An appointment left the book
    Removed {
        /// The removed appointment
        id: AppointmentId,
    },
}

/// A rejected command, recorded in state for the store to surface
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// No appointment with this id
    NotFound(AppointmentId),
    /// The availability check failed
    Unavailable(Unavailability),
    /// The state machine refused the transition
    Transition {
        /// The appointment
        id: AppointmentId,
        /// Why the machine refused
        error: TransitionError,
    },
}

/// A status change applied by the most recent reduction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusChange {
    /// The appointment
    pub id: AppointmentId,
    /// Status before
    pub from: AppointmentStatus,
    /// Status after
    pub to: AppointmentStatus,
}

// ============================================================================
// State
// ============================================================================

/// The appointment book plus per-dispatch bookkeeping slots
#[derive(Clone, Debug, Default)]
pub struct SchedulingState {
    /// All live appointments, keyed by id
    pub appointments: HashMap<AppointmentId, Appointment>,
    /// Rejection recorded by the last reduction, if any
    pub last_rejection: Option<Rejection>,
    /// Status change applied by the last reduction, if any
    pub last_transition: Option<StatusChange>,
}

impl SchedulingState {
    /// An empty book
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an appointment
    #[must_use]
    pub fn get(&self, id: &AppointmentId) -> Option<&Appointment> {
        self.appointments.get(id)
    }

    /// Number of appointments in the book
    #[must_use]
    pub fn count(&self) -> usize {
        self.appointments.len()
    }

    /// Whether the book is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the scheduling reducer
#[derive(Clone)]
pub struct SchedulingEnvironment {
    /// Clock for expiry arithmetic and timer durations
    pub clock: Arc<dyn Clock>,
}

impl SchedulingEnvironment {
    /// Creates a new `SchedulingEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the scheduling engine
///
/// Commands validate and then apply events to state; the only effect this
/// reducer emits is `Effect::Delay` carrying a guarded `ApplyDeferred`.
#[derive(Clone, Debug, Default)]
pub struct SchedulingReducer;

impl SchedulingReducer {
    /// Creates a new `SchedulingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// The status a deferred transition expects to still find when it fires.
    ///
    /// Auto-complete supersedes only `APPROVED`; auto-cancel supersedes only
    /// `NOT_APPROVED`. Anything else means a user transition won the race
    /// and the timer is stale.
    const fn deferred_guard(target: AppointmentStatus) -> Option<AppointmentStatus> {
        match target {
            AppointmentStatus::Completed => Some(AppointmentStatus::Approved),
            AppointmentStatus::Canceled => Some(AppointmentStatus::NotApproved),
            AppointmentStatus::Approved | AppointmentStatus::NotApproved => None,
        }
    }

    /// Build a Delay effect firing `ApplyDeferred` at `fires_at`
    fn delay_until(
        now: DateTime<Utc>,
        fires_at: DateTime<Utc>,
        id: AppointmentId,
        target: AppointmentStatus,
    ) -> Effect<SchedulingAction> {
        let duration = (fires_at - now).to_std().unwrap_or(std::time::Duration::ZERO);
        Effect::Delay {
            duration,
            action: Box::new(SchedulingAction::ApplyDeferred { id, target }),
        }
    }

    /// Applies an event to state
    fn apply_event(state: &mut SchedulingState, action: &SchedulingAction) {
        match action {
            SchedulingAction::Booked { appointment } => {
                state
                    .appointments
                    .insert(appointment.id, appointment.clone());
                state.last_rejection = None;
            }

            SchedulingAction::StatusChanged { id, from, to } => {
                if let Some(appointment) = state.appointments.get_mut(id) {
                    appointment.status = *to;
                }
                state.last_transition = Some(StatusChange {
                    id: *id,
                    from: *from,
                    to: *to,
                });
                state.last_rejection = None;
            }

            SchedulingAction::Removed { id } => {
                state.appointments.remove(id);
                state.last_rejection = None;
            }

            // Commands don't modify state directly
            SchedulingAction::Book { .. }
            | SchedulingAction::RequestTransition { .. }
            | SchedulingAction::ArmDeferred { .. }
            | SchedulingAction::ApplyDeferred { .. }
            | SchedulingAction::Remove { .. } => {}
        }
    }
}

impl Reducer for SchedulingReducer {
    type State = SchedulingState;
    type Action = SchedulingAction;
    type Environment = SchedulingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Book: check + insert, one reduction ==========
            SchedulingAction::Book {
                appointment,
                staff,
                capacity,
            } => {
                if let Err(reason) = check_availability(
                    state.appointments.values(),
                    &staff,
                    &appointment.client_email,
                    appointment.service_id,
                    appointment.workspace_id,
                    capacity,
                    &appointment.slot,
                ) {
                    state.last_rejection = Some(Rejection::Unavailable(reason));
                    return SmallVec::new();
                }

                let id = appointment.id;
                let end = appointment.end();
                let event = SchedulingAction::Booked { appointment };
                Self::apply_event(state, &event);

                // Low-latency auto-cancel at the end time; the sweep is the
                // durable backstop if this timer is lost.
                smallvec![Self::delay_until(
                    env.clock.now(),
                    end,
                    id,
                    AppointmentStatus::Canceled,
                )]
            }

            // ========== User-driven transition ==========
            SchedulingAction::RequestTransition {
                id,
                requested,
                actor,
            } => {
                let Some(appointment) = state.appointments.get(&id) else {
                    state.last_rejection = Some(Rejection::NotFound(id));
                    return SmallVec::new();
                };
                let current = appointment.status;
                let end = appointment.end();

                // Actor role first, then the machine, short-circuiting.
                if let Err(error) = machine::authorize(actor, requested)
                    .and_then(|()| machine::check(current, requested))
                {
                    state.last_rejection = Some(Rejection::Transition { id, error });
                    return SmallVec::new();
                }

                let event = SchedulingAction::StatusChanged {
                    id,
                    from: current,
                    to: requested,
                };
                Self::apply_event(state, &event);

                if requested == AppointmentStatus::Approved {
                    // Arm the auto-complete timer at the end time.
                    return smallvec![Self::delay_until(
                        env.clock.now(),
                        end,
                        id,
                        AppointmentStatus::Completed,
                    )];
                }
                SmallVec::new()
            }

            // ========== Arm a deferred transition explicitly ==========
            SchedulingAction::ArmDeferred {
                id,
                target,
                fires_at,
            } => {
                if !state.appointments.contains_key(&id) {
                    state.last_rejection = Some(Rejection::NotFound(id));
                    return SmallVec::new();
                }
                smallvec![Self::delay_until(env.clock.now(), fires_at, id, target)]
            }

            // ========== A timer fired: guard re-check ==========
            SchedulingAction::ApplyDeferred { id, target } => {
                let Some(expected) = Self::deferred_guard(target) else {
                    return SmallVec::new();
                };

                if let Some(appointment) = state.appointments.get(&id) {
                    if appointment.status == expected {
                        let event = SchedulingAction::StatusChanged {
                            id,
                            from: expected,
                            to: target,
                        };
                        Self::apply_event(state, &event);
                    }
                    // Status moved on: the timer is stale, ignore it.
                }
                SmallVec::new()
            }

            // ========== Remove (sweep deletions) ==========
            SchedulingAction::Remove { id } => {
                let event = SchedulingAction::Removed { id };
                Self::apply_event(state, &event);
                SmallVec::new()
            }

            // ========== Events ==========
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Money, ServiceId, TimeSlot, WorkingHours, WorkspaceId};
    use chrono::{NaiveTime, TimeZone};
    use slotbook_testing::{ReducerTest, assertions, test_clock};

    fn env() -> SchedulingEnvironment {
        SchedulingEnvironment::new(Arc::new(test_clock()))
    }

    fn slot(start_h: u32, end_h: u32) -> TimeSlot {
        let day = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        TimeSlot::new(
            day + chrono::Duration::hours(i64::from(start_h)),
            day + chrono::Duration::hours(i64::from(end_h)),
        )
        .unwrap()
    }

    fn staff_record(service: ServiceId) -> UserRecord {
        UserRecord::staff(
            "staff@example.com",
            WorkingHours::new(
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            )
            .unwrap(),
            [service],
        )
    }

    fn appointment(service: ServiceId, workspace: WorkspaceId, s: TimeSlot) -> Appointment {
        Appointment {
            id: AppointmentId::new(),
            client_email: "client@example.com".to_string(),
            staff_email: "staff@example.com".to_string(),
            service_id: service,
            workspace_id: workspace,
            slot: s,
            status: AppointmentStatus::NotApproved,
            price: Money::from_dollars(25),
            booked_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn book_inserts_and_arms_auto_cancel() {
        let service = ServiceId::new();
        let workspace = WorkspaceId::new();
        let appt = appointment(service, workspace, slot(10, 11));
        let id = appt.id;

        ReducerTest::new(SchedulingReducer::new())
            .with_env(env())
            .given_state(SchedulingState::new())
            .when_action(SchedulingAction::Book {
                appointment: appt,
                staff: staff_record(service),
                capacity: 1,
            })
            .then_state(move |state| {
                assert_eq!(state.count(), 1);
                assert_eq!(
                    state.get(&id).unwrap().status,
                    AppointmentStatus::NotApproved
                );
                assert!(state.last_rejection.is_none());
            })
            .then_effects(assertions::assert_has_delay_effect)
            .run();
    }

    #[test]
    fn overlapping_book_is_rejected_without_insert() {
        let service = ServiceId::new();
        let workspace = WorkspaceId::new();
        let existing = appointment(service, workspace, slot(10, 11));
        let mut state = SchedulingState::new();
        state.appointments.insert(existing.id, existing);

        ReducerTest::new(SchedulingReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(SchedulingAction::Book {
                appointment: appointment(service, workspace, slot(10, 11)),
                staff: staff_record(service),
                capacity: 5,
            })
            .then_state(|state| {
                assert_eq!(state.count(), 1);
                assert!(matches!(
                    state.last_rejection,
                    Some(Rejection::Unavailable(Unavailability::Overlap { .. }))
                ));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn approval_arms_auto_complete() {
        let service = ServiceId::new();
        let appt = appointment(service, WorkspaceId::new(), slot(10, 11));
        let id = appt.id;
        let mut state = SchedulingState::new();
        state.appointments.insert(id, appt);

        ReducerTest::new(SchedulingReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(SchedulingAction::RequestTransition {
                id,
                requested: AppointmentStatus::Approved,
                actor: Role::Staff,
            })
            .then_state(move |state| {
                assert_eq!(state.get(&id).unwrap().status, AppointmentStatus::Approved);
                assert_eq!(
                    state.last_transition,
                    Some(StatusChange {
                        id,
                        from: AppointmentStatus::NotApproved,
                        to: AppointmentStatus::Approved,
                    })
                );
            })
            .then_effects(assertions::assert_has_delay_effect)
            .run();
    }

    #[test]
    fn client_approval_is_rejected_before_state_changes() {
        let service = ServiceId::new();
        let appt = appointment(service, WorkspaceId::new(), slot(10, 11));
        let id = appt.id;
        let mut state = SchedulingState::new();
        state.appointments.insert(id, appt);

        ReducerTest::new(SchedulingReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(SchedulingAction::RequestTransition {
                id,
                requested: AppointmentStatus::Approved,
                actor: Role::Client,
            })
            .then_state(move |state| {
                assert_eq!(
                    state.get(&id).unwrap().status,
                    AppointmentStatus::NotApproved
                );
                assert!(matches!(
                    state.last_rejection,
                    Some(Rejection::Transition {
                        error: TransitionError::RoleForbidden { .. },
                        ..
                    })
                ));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn stale_auto_complete_timer_is_ignored() {
        let service = ServiceId::new();
        let mut appt = appointment(service, WorkspaceId::new(), slot(10, 11));
        appt.status = AppointmentStatus::Canceled; // user canceled before the timer fired
        let id = appt.id;
        let mut state = SchedulingState::new();
        state.appointments.insert(id, appt);

        ReducerTest::new(SchedulingReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(SchedulingAction::ApplyDeferred {
                id,
                target: AppointmentStatus::Completed,
            })
            .then_state(move |state| {
                assert_eq!(state.get(&id).unwrap().status, AppointmentStatus::Canceled);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn deferred_cancel_only_supersedes_not_approved() {
        let service = ServiceId::new();
        let mut appt = appointment(service, WorkspaceId::new(), slot(10, 11));
        appt.status = AppointmentStatus::Approved;
        let id = appt.id;
        let mut state = SchedulingState::new();
        state.appointments.insert(id, appt);

        ReducerTest::new(SchedulingReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(SchedulingAction::ApplyDeferred {
                id,
                target: AppointmentStatus::Canceled,
            })
            .then_state(move |state| {
                // The stale auto-cancel timer must not cancel an approved
                // appointment.
                assert_eq!(state.get(&id).unwrap().status, AppointmentStatus::Approved);
            })
            .run();
    }

    #[test]
    fn remove_is_tolerant_of_missing_ids() {
        ReducerTest::new(SchedulingReducer::new())
            .with_env(env())
            .given_state(SchedulingState::new())
            .when_action(SchedulingAction::Remove {
                id: AppointmentId::new(),
            })
            .then_state(|state| {
                assert!(state.is_empty());
                assert!(state.last_rejection.is_none());
            })
            .run();
    }
}
