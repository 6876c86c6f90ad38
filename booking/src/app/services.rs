//! The orchestrators: command handlers that coordinate the directory, the
//! catalog, the scheduling engine and the notification channel.
//!
//! 1. Validate input and resolve collaborator records
//! 2. Hand the resolved command to the engine (the only state writer)
//! 3. Fire the matching lifecycle notification off the request path

use crate::catalog::ServiceCatalog;
use crate::directory::UserDirectory;
use crate::engine::SchedulingEngine;
use crate::error::BookingError;
use crate::notify::{NotificationKind, NotificationSender, spawn_notify};
use crate::types::{
    Appointment, AppointmentId, AppointmentStatus, Role, ServiceId, TimeSlot,
};
use chrono::{DateTime, Utc};
use slotbook_core::environment::Clock;
use slotbook_runtime::RetryPolicy;
use std::sync::Arc;
use tracing::{info, instrument};

/// The booking orchestrator
pub struct BookingService {
    engine: SchedulingEngine,
    directory: Arc<dyn UserDirectory>,
    catalog: Arc<dyn ServiceCatalog>,
    notifier: Arc<dyn NotificationSender>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    /// Create a new booking service
    pub fn new(
        engine: SchedulingEngine,
        directory: Arc<dyn UserDirectory>,
        catalog: Arc<dyn ServiceCatalog>,
        notifier: Arc<dyn NotificationSender>,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            directory,
            catalog,
            notifier,
            retry,
            clock,
        }
    }

    /// Book a new appointment.
    ///
    /// Validation order: start time first (before any lookup), then the two
    /// user records and their roles, then the service flag, then the
    /// availability check inside the engine. Nothing is persisted unless
    /// every step passes.
    ///
    /// # Errors
    ///
    /// [`BookingError::PastStart`] for a start in the past,
    /// [`BookingError::RoleMismatch`] when an email resolves to the wrong
    /// role, [`BookingError::ServiceNotAvailable`] for a disabled service,
    /// plus the lookup and availability errors from the collaborators.
    #[instrument(skip(self))]
    pub async fn create_appointment(
        &self,
        service_id: ServiceId,
        client_email: &str,
        staff_email: &str,
        start: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        let now = self.clock.now();
        if start < now {
            return Err(BookingError::PastStart(start));
        }

        let client = self.directory.find_user(client_email).await?;
        if client.role != Role::Client {
            return Err(BookingError::RoleMismatch {
                email: client.email,
                expected: Role::Client,
                actual: client.role,
            });
        }

        let staff = self.directory.find_user(staff_email).await?;
        if staff.role != Role::Staff {
            return Err(BookingError::RoleMismatch {
                email: staff.email,
                expected: Role::Staff,
                actual: staff.role,
            });
        }

        let service = self.catalog.find_service(service_id).await?;
        if !service.available {
            return Err(BookingError::ServiceNotAvailable(service_id));
        }
        let workspace = self.catalog.find_workspace(service.workspace_id).await?;

        let slot =
            TimeSlot::new(start, start + service.duration).ok_or(BookingError::EmptyInterval)?;

        let appointment = Appointment {
            id: AppointmentId::new(),
            client_email: client.email,
            staff_email: staff.email.clone(),
            service_id,
            workspace_id: service.workspace_id,
            slot,
            status: AppointmentStatus::NotApproved,
            price: service.price,
            booked_at: now,
        };

        let booked = self
            .engine
            .book(appointment, staff, workspace.capacity)
            .await?;

        info!(appointment_id = %booked.id, start = %booked.slot.start(), "Appointment booked");
        spawn_notify(
            Arc::clone(&self.notifier),
            self.retry.clone(),
            NotificationKind::Created,
            booked.clone(),
        );
        Ok(booked)
    }
}

/// The transition orchestrator
pub struct TransitionService {
    engine: SchedulingEngine,
    notifier: Arc<dyn NotificationSender>,
    retry: RetryPolicy,
}

impl TransitionService {
    /// Create a new transition service
    pub fn new(
        engine: SchedulingEngine,
        notifier: Arc<dyn NotificationSender>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            engine,
            notifier,
            retry,
        }
    }

    /// Apply a user-driven status change and notify the client.
    ///
    /// A cancellation that lands while the appointment was still awaiting
    /// approval announces "not approved"; canceling an approved appointment
    /// announces a plain cancellation. Completion sends nothing.
    ///
    /// # Errors
    ///
    /// The engine's rejection: not found, role, terminal-state, same-status
    /// or missing-edge errors, in that guard order.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: AppointmentId,
        requested: AppointmentStatus,
        actor: Role,
    ) -> Result<Appointment, BookingError> {
        let (appointment, from) = self.engine.update_status(id, requested, actor).await?;

        let kind = match appointment.status {
            AppointmentStatus::Approved => Some(NotificationKind::Approved),
            AppointmentStatus::Canceled if from == AppointmentStatus::NotApproved => {
                Some(NotificationKind::NotApproved)
            }
            AppointmentStatus::Canceled => Some(NotificationKind::Canceled),
            AppointmentStatus::Completed | AppointmentStatus::NotApproved => None,
        };
        if let Some(kind) = kind {
            spawn_notify(
                Arc::clone(&self.notifier),
                self.retry.clone(),
                kind,
                appointment.clone(),
            );
        }

        info!(appointment_id = %id, from = %from, to = %appointment.status, "Status updated");
        Ok(appointment)
    }
}
