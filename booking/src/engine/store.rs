//! The scheduling store: serializes every mutation through the reducer and
//! executes the timer effects it emits.

use super::reducer::{
    Rejection, SchedulingAction, SchedulingEnvironment, SchedulingReducer, SchedulingState,
    StatusChange,
};
use crate::error::BookingError;
use crate::machine::TransitionError;
use crate::types::{Appointment, AppointmentId, AppointmentStatus, Role, UserRecord};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use slotbook_core::{effect::Effect, reducer::Reducer};
use slotbook_runtime::TimerPool;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// What one dispatch produced, captured while the write lock was held
#[derive(Debug, Default)]
struct DispatchOutcome {
    rejection: Option<Rejection>,
    transition: Option<StatusChange>,
    appointment: Option<Appointment>,
}

struct EngineInner {
    state: RwLock<SchedulingState>,
    reducer: SchedulingReducer,
    env: SchedulingEnvironment,
    timers: TimerPool,
}

/// The appointment book behind a single write lock.
///
/// Cloning the engine clones a handle to the same book. Dropping the last
/// handle aborts every pending one-shot timer; the cleanup sweep remains
/// the durable path for deferred transitions.
#[derive(Clone)]
pub struct SchedulingEngine {
    inner: Arc<EngineInner>,
}

impl SchedulingEngine {
    /// Creates an empty engine
    #[must_use]
    pub fn new(env: SchedulingEnvironment) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                state: RwLock::new(SchedulingState::new()),
                reducer: SchedulingReducer::new(),
                env,
                timers: TimerPool::new(),
            }),
        }
    }

    /// Book an appointment: availability check and insert under one lock.
    ///
    /// On success the auto-cancel timer for the appointment's end time is
    /// armed and the inserted appointment is returned.
    ///
    /// # Errors
    ///
    /// The availability rejection mapped onto its [`BookingError`].
    pub async fn book(
        &self,
        appointment: Appointment,
        staff: UserRecord,
        capacity: u32,
    ) -> Result<Appointment, BookingError> {
        let id = appointment.id;
        let outcome = dispatch(
            Arc::clone(&self.inner),
            SchedulingAction::Book {
                appointment,
                staff,
                capacity,
            },
        )
        .await;

        match outcome.rejection {
            Some(rejection) => Err(rejection_error(rejection)),
            None => outcome
                .appointment
                .ok_or(BookingError::AppointmentNotFound(id)),
        }
    }

    /// Apply a user-driven transition.
    ///
    /// Returns the appointment after the transition together with the status
    /// it held before, which the orchestrator needs to pick the right
    /// notification.
    ///
    /// # Errors
    ///
    /// [`BookingError::AppointmentNotFound`] for an unknown id, or the
    /// machine's rejection mapped onto its [`BookingError`].
    pub async fn update_status(
        &self,
        id: AppointmentId,
        requested: AppointmentStatus,
        actor: Role,
    ) -> Result<(Appointment, AppointmentStatus), BookingError> {
        let outcome = dispatch(
            Arc::clone(&self.inner),
            SchedulingAction::RequestTransition {
                id,
                requested,
                actor,
            },
        )
        .await;

        if let Some(rejection) = outcome.rejection {
            return Err(rejection_error(rejection));
        }
        match (outcome.appointment, outcome.transition) {
            (Some(appointment), Some(change)) => Ok((appointment, change.from)),
            _ => Err(BookingError::AppointmentNotFound(id)),
        }
    }

    /// Arm a one-shot deferred transition firing at `fires_at`.
    ///
    /// # Errors
    ///
    /// [`BookingError::AppointmentNotFound`] for an unknown id.
    pub async fn arm_deferred_transition(
        &self,
        id: AppointmentId,
        target: AppointmentStatus,
        fires_at: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        let outcome = dispatch(
            Arc::clone(&self.inner),
            SchedulingAction::ArmDeferred {
                id,
                target,
                fires_at,
            },
        )
        .await;

        match outcome.rejection {
            Some(rejection) => Err(rejection_error(rejection)),
            None => Ok(()),
        }
    }

    /// Apply a deferred transition directly, as the sweep does.
    ///
    /// Returns whether the transition was applied; a stale target is a
    /// silent no-op.
    pub async fn apply_deferred(&self, id: AppointmentId, target: AppointmentStatus) -> bool {
        let outcome = dispatch(
            Arc::clone(&self.inner),
            SchedulingAction::ApplyDeferred { id, target },
        )
        .await;
        let applied = outcome
            .transition
            .is_some_and(|change| change.id == id && change.to == target);
        if !applied {
            debug!(appointment_id = %id, target = %target, "deferred transition was stale");
        }
        applied
    }

    /// Remove an appointment from the book.
    ///
    /// Returns whether it existed. Removing an unknown id is tolerated so
    /// the sweep can race with itself.
    pub async fn remove(&self, id: AppointmentId) -> bool {
        let existed = self.inner.state.read().await.appointments.contains_key(&id);
        dispatch(Arc::clone(&self.inner), SchedulingAction::Remove { id }).await;
        existed
    }

    /// Look up an appointment by id
    pub async fn get(&self, id: AppointmentId) -> Option<Appointment> {
        self.inner.state.read().await.get(&id).cloned()
    }

    /// All appointments currently in the book, in no particular order
    pub async fn snapshot(&self) -> Vec<Appointment> {
        self.inner
            .state
            .read()
            .await
            .appointments
            .values()
            .cloned()
            .collect()
    }

    /// Number of appointments in the book
    pub async fn count(&self) -> usize {
        self.inner.state.read().await.count()
    }

    /// Number of one-shot timers still pending
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.pending()
    }
}

/// Run one action through the reducer and execute its effects.
///
/// The write lock covers the reduction only; timers are armed after it is
/// released so a firing timer can re-enter `dispatch` without deadlocking.
fn dispatch(
    inner: Arc<EngineInner>,
    action: SchedulingAction,
) -> BoxFuture<'static, DispatchOutcome> {
    Box::pin(async move {
        let target = action_target(&action);
        let (outcome, effects) = {
            let mut state = inner.state.write().await;
            let effects = inner.reducer.reduce(&mut state, action, &inner.env);
            let transition = state.last_transition.take();
            let rejection = state.last_rejection.take();
            let appointment = state.get(&target).cloned();
            (
                DispatchOutcome {
                    rejection,
                    transition,
                    appointment,
                },
                effects,
            )
        };
        for effect in effects {
            match effect {
                Effect::None => {}
                Effect::Delay { duration, action } => {
                    let weak = Arc::downgrade(&inner);
                    inner
                        .timers
                        .schedule_after(duration, Box::pin(fire(weak, *action)));
                }
                Effect::Future(future) => {
                    let weak = Arc::downgrade(&inner);
                    tokio::spawn(async move {
                        if let Some(action) = future.await {
                            if let Some(inner) = weak.upgrade() {
                                dispatch(inner, action).await;
                            }
                        }
                    });
                }
            }
        }

        outcome
    })
}

/// The appointment an action is about
fn action_target(action: &SchedulingAction) -> AppointmentId {
    match action {
        SchedulingAction::Book { appointment, .. }
        | SchedulingAction::Booked { appointment } => appointment.id,
        SchedulingAction::RequestTransition { id, .. }
        | SchedulingAction::ArmDeferred { id, .. }
        | SchedulingAction::ApplyDeferred { id, .. }
        | SchedulingAction::Remove { id }
        | SchedulingAction::StatusChanged { id, .. }
        | SchedulingAction::Removed { id } => *id,
    }
}

/// Timer callback: upgrade the engine handle and feed the action back in
async fn fire(weak: Weak<EngineInner>, action: SchedulingAction) {
    match weak.upgrade() {
        Some(inner) => {
            dispatch(inner, action).await;
        }
        None => warn!("timer fired after engine shutdown, dropping action"),
    }
}

/// Map a reducer rejection onto the public error taxonomy
fn rejection_error(rejection: Rejection) -> BookingError {
    use crate::availability::Unavailability;

    match rejection {
        Rejection::NotFound(id) => BookingError::AppointmentNotFound(id),
        Rejection::Unavailable(reason) => match reason {
            Unavailability::StaffNotAvailable { email } => {
                BookingError::StaffNotAvailable { email }
            }
            Unavailability::StaffNotContainingService { email, service } => {
                BookingError::StaffNotContainingService { email, service }
            }
            Unavailability::Overlap { email } => BookingError::Overlap { email },
            Unavailability::WorkspaceNotAvailable { workspace } => {
                BookingError::WorkspaceNotAvailable { workspace }
            }
        },
        Rejection::Transition { id, error } => match error {
            TransitionError::RoleForbidden { role, requested } => {
                BookingError::RoleForbidden { role, requested }
            }
            TransitionError::CannotBeModified { .. } => BookingError::CannotBeModified(id),
            TransitionError::AlreadyApproved => BookingError::AlreadyApproved(id),
            TransitionError::NotApprovedTarget => BookingError::NotApprovedTarget(id),
            TransitionError::NotAllowed { from, to } => {
                BookingError::StatusNotAllowed { id, from, to }
            }
        },
    }
}
