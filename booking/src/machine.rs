//! The appointment state machine as pure functions.
//!
//! States: `NOT_APPROVED` (initial), `APPROVED`, `COMPLETED`, `CANCELED`
//! (terminal). User-driven transitions go through [`authorize`] then
//! [`check`]; time-driven transitions (the one-shot timers and the sweep)
//! skip authorization and use [`check`] alone, which doubles as the guard
//! re-check that neutralizes stale timers.
//!
//! Guard ordering is part of the contract: role first, then terminal state,
//! then same-status, then edge validity, short-circuiting on the first
//! violation.

use crate::types::{AppointmentStatus, Role};
use thiserror::Error;

/// A rejected transition and why the machine refused it
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Client-role actors may not approve or complete
    #[error("role {role} may not set status {requested}")]
    RoleForbidden {
        /// The requesting actor's role
        role: Role,
        /// The status asked for
        requested: AppointmentStatus,
    },

    /// The appointment is already terminal
    #[error("appointment is {current} and cannot be modified")]
    CannotBeModified {
        /// The terminal status
        current: AppointmentStatus,
    },

    /// Approving an appointment that is already approved
    #[error("appointment is already approved")]
    AlreadyApproved,

    /// NOT_APPROVED can never be a transition target
    #[error("NOT_APPROVED is reachable only via creation")]
    NotApprovedTarget,

    /// No such edge in the transition table
    #[error("transition {from} -> {to} is not allowed")]
    NotAllowed {
        /// Current status
        from: AppointmentStatus,
        /// Requested status
        to: AppointmentStatus,
    },
}

/// Validate the actor's right to request this status.
///
/// Runs before the state machine is even consulted: a client asking for
/// `APPROVED` or `COMPLETED` is rejected here without touching state.
///
/// # Errors
///
/// [`TransitionError::RoleForbidden`] when the role may not set the status.
pub const fn authorize(actor: Role, requested: AppointmentStatus) -> Result<(), TransitionError> {
    if actor.may_set(requested) {
        Ok(())
    } else {
        Err(TransitionError::RoleForbidden {
            role: actor,
            requested,
        })
    }
}

/// Validate a transition edge from `current` to `requested`.
///
/// # Errors
///
/// In guard order: [`TransitionError::CannotBeModified`] for terminal
/// appointments, [`TransitionError::AlreadyApproved`] for a redundant
/// approval, [`TransitionError::NotApprovedTarget`] for an explicit
/// `NOT_APPROVED` target, and [`TransitionError::NotAllowed`] for any edge
/// outside the table.
pub const fn check(
    current: AppointmentStatus,
    requested: AppointmentStatus,
) -> Result<(), TransitionError> {
    use AppointmentStatus::{Approved, Canceled, Completed, NotApproved};

    if current.is_terminal() {
        return Err(TransitionError::CannotBeModified { current });
    }

    if matches!((current, requested), (Approved, Approved)) {
        return Err(TransitionError::AlreadyApproved);
    }

    if matches!(requested, NotApproved) {
        return Err(TransitionError::NotApprovedTarget);
    }

    match (current, requested) {
        (NotApproved, Approved | Canceled) | (Approved, Completed | Canceled) => Ok(()),
        (from, to) => Err(TransitionError::NotAllowed { from, to }),
    }
}
