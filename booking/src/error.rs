//! The public error surface of the booking engine.
//!
//! Every business-rule violation is detected synchronously inside the
//! orchestrators and surfaced as a [`BookingError`] carrying a
//! machine-readable reason code ([`BookingError::code`]) and a taxonomy
//! bucket ([`BookingError::kind`]). Notification failures never appear here;
//! they are logged at the boundary and swallowed.

use crate::types::{AppointmentId, AppointmentStatus, Role, ServiceId, WorkspaceId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Coarse error taxonomy, one bucket per transport-level outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// No matching record for an id or email
    NotFound,
    /// The request conflicts with current state or business rules
    Conflict,
    /// Malformed input, rejected before any lookup
    Validation,
    /// A downstream collaborator is degraded
    ServiceUnavailable,
}

/// Errors returned by the booking and transition orchestrators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// No appointment with this id
    #[error("appointment {0} not found")]
    AppointmentNotFound(AppointmentId),

    /// No user with this email
    #[error("user {0} not found")]
    UserNotFound(String),

    /// No service with this id
    #[error("service {0} not found")]
    ServiceNotFound(ServiceId),

    /// No workspace with this id
    #[error("workspace {0} not found")]
    WorkspaceNotFound(WorkspaceId),

    /// A user filled the wrong slot of the booking request
    #[error("user {email} has role {actual}, expected {expected}")]
    RoleMismatch {
        /// The offending user
        email: String,
        /// Role the booking slot requires
        expected: Role,
        /// Role the directory reports
        actual: Role,
    },

    /// The actor's role may not drive this transition
    #[error("role {role} may not set appointment status to {requested}")]
    RoleForbidden {
        /// The requesting actor's role
        role: Role,
        /// The status the actor asked for
        requested: AppointmentStatus,
    },

    /// The requested interval overlaps an existing active appointment
    #[error("requested slot overlaps an existing appointment for {email}")]
    Overlap {
        /// Staff or client email whose calendar conflicts
        email: String,
    },

    /// The workspace is at capacity for the requested interval
    #[error("workspace {workspace} is at capacity for the requested slot")]
    WorkspaceNotAvailable {
        /// The full workspace
        workspace: WorkspaceId,
    },

    /// Staff is unavailable or the slot falls outside their working hours
    #[error("staff {email} is not available for the requested slot")]
    StaffNotAvailable {
        /// The unavailable staff member
        email: String,
    },

    /// Staff is not assigned to the requested service
    #[error("staff {email} is not assigned to service {service}")]
    StaffNotContainingService {
        /// The staff member
        email: String,
        /// The requested service
        service: ServiceId,
    },

    /// The service is flagged unavailable
    #[error("service {0} is not currently bookable")]
    ServiceNotAvailable(ServiceId),

    /// The appointment is terminal; no further transitions
    #[error("appointment {0} is completed or canceled and cannot be modified")]
    CannotBeModified(AppointmentId),

    /// Re-approving an already approved appointment
    #[error("appointment {0} is already approved")]
    AlreadyApproved(AppointmentId),

    /// NOT_APPROVED is reachable only via creation, never via update
    #[error("appointment {0} cannot be set back to NOT_APPROVED")]
    NotApprovedTarget(AppointmentId),

    /// The transition edge does not exist in the state machine
    #[error("appointment {id}: transition {from} -> {to} is not allowed")]
    StatusNotAllowed {
        /// The appointment
        id: AppointmentId,
        /// Current status
        from: AppointmentStatus,
        /// Requested status
        to: AppointmentStatus,
    },

    /// Start time lies in the past
    #[error("start time {0} is in the past")]
    PastStart(DateTime<Utc>),

    /// Duration would produce an empty `[start, end)` interval
    #[error("service duration produces an empty interval")]
    EmptyInterval,

    /// The user directory or catalog is degraded
    #[error("downstream collaborator unavailable: {0}")]
    Downstream(String),
}

impl BookingError {
    /// The taxonomy bucket this error belongs to
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AppointmentNotFound(_)
            | Self::UserNotFound(_)
            | Self::ServiceNotFound(_)
            | Self::WorkspaceNotFound(_) => ErrorKind::NotFound,

            Self::RoleMismatch { .. }
            | Self::RoleForbidden { .. }
            | Self::Overlap { .. }
            | Self::WorkspaceNotAvailable { .. }
            | Self::StaffNotAvailable { .. }
            | Self::StaffNotContainingService { .. }
            | Self::ServiceNotAvailable(_)
            | Self::CannotBeModified(_)
            | Self::AlreadyApproved(_)
            | Self::NotApprovedTarget(_)
            | Self::StatusNotAllowed { .. } => ErrorKind::Conflict,

            Self::PastStart(_) | Self::EmptyInterval => ErrorKind::Validation,

            Self::Downstream(_) => ErrorKind::ServiceUnavailable,
        }
    }

    /// Stable machine-readable reason code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AppointmentNotFound(_)
            | Self::UserNotFound(_)
            | Self::ServiceNotFound(_)
            | Self::WorkspaceNotFound(_) => "NOT_FOUND",
            Self::RoleMismatch { .. } => "ROLE_MISMATCH",
            Self::RoleForbidden { .. } => "ROLE_FORBIDDEN",
            Self::Overlap { .. } => "OVERLAP",
            Self::WorkspaceNotAvailable { .. } => "WORKSPACE_NOT_AVAILABLE",
            Self::StaffNotAvailable { .. } => "STAFF_NOT_AVAILABLE",
            Self::StaffNotContainingService { .. } => "STAFF_NOT_CONTAINING_SERVICE",
            Self::ServiceNotAvailable(_) => "SERVICE_NOT_AVAILABLE",
            Self::CannotBeModified(_) => "APPOINTMENT_CANNOT_BE_MODIFIED",
            Self::AlreadyApproved(_) => "APPOINTMENT_ALREADY_IS_APPROVED",
            Self::NotApprovedTarget(_) => "APPOINTMENT_NOT_APPROVED",
            Self::StatusNotAllowed { .. } => "STATUS_NOT_ALLOWED",
            Self::PastStart(_) => "PAST_START",
            Self::EmptyInterval => "EMPTY_INTERVAL",
            Self::Downstream(_) => "DOWNSTREAM_UNAVAILABLE",
        }
    }
}

impl From<crate::directory::DirectoryError> for BookingError {
    fn from(error: crate::directory::DirectoryError) -> Self {
        use crate::directory::DirectoryError;
        match error {
            DirectoryError::UserNotFound(email) => Self::UserNotFound(email),
            DirectoryError::Unavailable(detail) => Self::Downstream(detail),
        }
    }
}

impl From<crate::catalog::CatalogError> for BookingError {
    fn from(error: crate::catalog::CatalogError) -> Self {
        use crate::catalog::CatalogError;
        match error {
            CatalogError::ServiceNotFound(id) => Self::ServiceNotFound(id),
            CatalogError::WorkspaceNotFound(id) => Self::WorkspaceNotFound(id),
            CatalogError::Unavailable(detail) => Self::Downstream(detail),
        }
    }
}
