//! Outbound notifications for appointment lifecycle events.
//!
//! Notifications are fire-and-forget: the booking flow never waits on them
//! and a failing sender never fails a booking. Delivery is retried with
//! backoff and then dropped with a warning.

use crate::types::Appointment;
use async_trait::async_trait;
use slotbook_runtime::{RetryPolicy, retry_with_backoff};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Notification delivery failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// The lifecycle event a notification announces
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    /// A new appointment was booked, awaiting approval
    Created,
    /// Staff approved the appointment
    Approved,
    /// The appointment expired before approval
    NotApproved,
    /// An approved appointment was canceled
    Canceled,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Approved => write!(f, "approved"),
            Self::NotApproved => write!(f, "not approved"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Port to the notification channel (email, SMS, push)
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver one lifecycle notification to the appointment's client
    ///
    /// # Errors
    ///
    /// [`NotifyError`] when delivery fails; callers retry and then drop.
    async fn send(
        &self,
        kind: NotificationKind,
        appointment: &Appointment,
    ) -> Result<(), NotifyError>;
}

/// Console sender for demo and development, prints via tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl NotificationSender for ConsoleNotifier {
    async fn send(
        &self,
        kind: NotificationKind,
        appointment: &Appointment,
    ) -> Result<(), NotifyError> {
        info!(
            to = %appointment.client_email,
            appointment_id = %appointment.id,
            staff = %appointment.staff_email,
            start = %appointment.slot.start(),
            "Appointment {kind}"
        );
        Ok(())
    }
}

/// Deliver a notification off the request path.
///
/// Spawned so the booking flow returns without waiting on delivery.
/// Exhausted retries are logged and dropped.
pub fn spawn_notify(
    sender: Arc<dyn NotificationSender>,
    policy: RetryPolicy,
    kind: NotificationKind,
    appointment: Appointment,
) {
    tokio::spawn(async move {
        let result = retry_with_backoff(policy, || {
            let sender = Arc::clone(&sender);
            let appointment = appointment.clone();
            async move { sender.send(kind, &appointment).await }
        })
        .await;

        if let Err(error) = result {
            warn!(
                appointment_id = %appointment.id,
                kind = %kind,
                %error,
                "Notification dropped after retries"
            );
        }
    });
}

pub mod testing {
    //! A sender that records what it was asked to deliver.
    //!
    //! Used by the integration suite and the demo binary.

    use super::{NotificationKind, NotificationSender, NotifyError};
    use crate::types::{Appointment, AppointmentId};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records every notification; optionally fails the first N sends
    #[derive(Clone, Default)]
    pub struct RecordingNotifier {
        sent: Arc<Mutex<Vec<(NotificationKind, AppointmentId)>>>,
        failures_remaining: Arc<Mutex<u32>>,
    }

    impl RecordingNotifier {
        /// Creates a sender that always succeeds
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail the next `n` sends before succeeding
        #[must_use]
        pub fn failing_first(n: u32) -> Self {
            let notifier = Self::default();
            if let Ok(mut failures) = notifier.failures_remaining.lock() {
                *failures = n;
            }
            notifier
        }

        /// Everything delivered so far
        #[must_use]
        pub fn sent(&self) -> Vec<(NotificationKind, AppointmentId)> {
            self.sent.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl NotificationSender for RecordingNotifier {
        async fn send(
            &self,
            kind: NotificationKind,
            appointment: &Appointment,
        ) -> Result<(), NotifyError> {
            if let Ok(mut failures) = self.failures_remaining.lock() {
                if *failures > 0 {
                    *failures -= 1;
                    return Err(NotifyError("injected failure".to_string()));
                }
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((kind, appointment.id));
            }
            Ok(())
        }
    }
}
