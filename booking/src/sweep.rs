//! The periodic cleanup sweep, the durable half of deferred transitions.
//!
//! One-shot timers are fast but lossy; the sweep walks the whole book on a
//! fixed interval and enforces every time-driven rule, so a lost timer can
//! delay an auto-transition by at most one sweep interval, never lose it.
//!
//! Ordering invariant: a COMPLETED row is deleted strictly after its staff
//! aggregate credit succeeds, and the credit is idempotent per appointment
//! id, so a crash or retry mid-sweep cannot double-count profit.

use crate::directory::UserDirectory;
use crate::engine::SchedulingEngine;
use crate::types::{Appointment, AppointmentStatus};
use chrono::{DateTime, Duration, Utc};
use slotbook_core::environment::Clock;
use slotbook_runtime::PeriodicWorker;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What one sweep run did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Overdue APPROVED rows force-completed
    pub completed: u64,
    /// Overdue NOT_APPROVED rows expired into cancellation
    pub expired: u64,
    /// Staff aggregate credits applied (idempotent; repeats not counted)
    pub credited: u64,
    /// Rows deleted from the book
    pub removed: u64,
    /// Stuck rows deleted past the grace window without a credit
    pub purged: u64,
    /// Rows left in place because a collaborator call failed or the row
    /// changed under the sweep
    pub deferred: u64,
}

/// Walks the appointment book and applies every overdue time-driven rule
pub struct CleanupSweep {
    engine: SchedulingEngine,
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    approved_grace: Duration,
}

impl CleanupSweep {
    /// Create a new sweep over `engine`, crediting completions to `directory`
    pub fn new(
        engine: SchedulingEngine,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        approved_grace: Duration,
    ) -> Self {
        Self {
            engine,
            directory,
            clock,
            approved_grace,
        }
    }

    /// Run one full pass over the book.
    ///
    /// Each row is handled in isolation: a failing directory call defers
    /// that row to the next run and the pass continues.
    pub async fn run_once(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for appointment in self.engine.snapshot().await {
            self.sweep_row(&appointment, now, &mut report).await;
        }

        info!(
            completed = report.completed,
            expired = report.expired,
            credited = report.credited,
            removed = report.removed,
            purged = report.purged,
            deferred = report.deferred,
            "Sweep finished"
        );
        report
    }

    /// Handle one snapshot row.
    ///
    /// The snapshot is taken before any row is processed and the engine lock
    /// is released between calls, so `appointment` can be stale by the time
    /// its turn comes. Every deletion here is therefore conditional on a
    /// guarded re-check against live state; a stale row is left for the
    /// next pass to reclassify.
    async fn sweep_row(
        &self,
        appointment: &Appointment,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) {
        match appointment.status {
            AppointmentStatus::Canceled => {
                if self.engine.remove(appointment.id).await {
                    report.removed += 1;
                }
            }

            AppointmentStatus::Completed => {
                self.credit_and_remove(appointment, now, report).await;
            }

            AppointmentStatus::NotApproved if appointment.is_overdue(now) => {
                // Expired before approval: cancel (guarded), then delete.
                if self
                    .engine
                    .apply_deferred(appointment.id, AppointmentStatus::Canceled)
                    .await
                {
                    report.expired += 1;
                    if self.engine.remove(appointment.id).await {
                        report.removed += 1;
                    }
                } else {
                    // An approval landed after the snapshot; the live row
                    // is no longer ours to delete.
                    report.deferred += 1;
                }
            }

            AppointmentStatus::Approved if appointment.is_overdue(now) => {
                // Force the completion a lost timer failed to deliver,
                // then credit and delete in the same pass.
                if self
                    .engine
                    .apply_deferred(appointment.id, AppointmentStatus::Completed)
                    .await
                {
                    report.completed += 1;
                    self.credit_and_remove(appointment, now, report).await;
                }
            }

            AppointmentStatus::NotApproved | AppointmentStatus::Approved => {
                debug!(appointment_id = %appointment.id, "Not yet due, skipping");
            }
        }
    }

    /// Credit the staff aggregate for a completed appointment, then delete
    /// the row. Deletion is strictly ordered after a successful credit; a
    /// failing credit leaves the row for the next run until the grace
    /// window expires, after which the row is purged uncredited.
    async fn credit_and_remove(
        &self,
        appointment: &Appointment,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) {
        match self
            .directory
            .record_completion(&appointment.staff_email, appointment.id, appointment.price)
            .await
        {
            Ok(newly_credited) => {
                if newly_credited {
                    report.credited += 1;
                }
                if self.engine.remove(appointment.id).await {
                    report.removed += 1;
                }
            }
            Err(error) if now > appointment.end() + self.approved_grace => {
                warn!(
                    appointment_id = %appointment.id,
                    %error,
                    "Credit kept failing past the grace window, purging row"
                );
                if self.engine.remove(appointment.id).await {
                    report.purged += 1;
                }
            }
            Err(error) => {
                warn!(
                    appointment_id = %appointment.id,
                    %error,
                    "Credit failed, leaving row for the next run"
                );
                report.deferred += 1;
            }
        }
    }
}

/// Drives [`CleanupSweep`] on a fixed interval until shutdown
pub struct SweepWorker {
    sweep: CleanupSweep,
    interval: std::time::Duration,
    shutdown: broadcast::Receiver<()>,
}

impl SweepWorker {
    /// Create a worker running `sweep` every `interval`
    #[must_use]
    pub const fn new(
        sweep: CleanupSweep,
        interval: std::time::Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            sweep,
            interval,
            shutdown,
        }
    }

    /// Spawn the worker loop
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        let sweep = Arc::new(self.sweep);
        PeriodicWorker::new("cleanup-sweep", self.interval, self.shutdown).spawn(move || {
            let sweep = Arc::clone(&sweep);
            async move {
                sweep.run_once().await;
                Ok::<_, std::convert::Infallible>(())
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryDirectory, UserDirectory};
    use crate::engine::{SchedulingEngine, SchedulingEnvironment};
    use crate::types::{
        AppointmentId, Money, Role, ServiceId, TimeSlot, UserRecord, WorkingHours, WorkspaceId,
    };
    use chrono::NaiveTime;
    use slotbook_testing::{FixedClock, test_clock};

    const STAFF: &str = "staff@example.com";

    struct Fixture {
        engine: SchedulingEngine,
        directory: Arc<InMemoryDirectory>,
        sweep: CleanupSweep,
        clock: Arc<FixedClock>,
        appointment: Appointment,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(test_clock());
        let engine = SchedulingEngine::new(SchedulingEnvironment::new(clock.clone()));
        let service = ServiceId::new();
        let directory = Arc::new(InMemoryDirectory::new().with_user(UserRecord::staff(
            STAFF,
            WorkingHours::new(
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            )
            .unwrap(),
            [service],
        )));
        let sweep = CleanupSweep::new(
            engine.clone(),
            directory.clone(),
            clock.clone(),
            Duration::hours(72),
        );

        let start = clock.now() + Duration::hours(10);
        let appointment = Appointment {
            id: AppointmentId::new(),
            client_email: "client@example.com".to_string(),
            staff_email: STAFF.to_string(),
            service_id: service,
            workspace_id: WorkspaceId::new(),
            slot: TimeSlot::new(start, start + Duration::hours(1)).unwrap(),
            status: AppointmentStatus::NotApproved,
            price: Money::from_dollars(40),
            booked_at: clock.now(),
        };
        Fixture {
            engine,
            directory,
            sweep,
            clock,
            appointment,
        }
    }

    #[tokio::test]
    async fn stale_expiry_row_survives_a_concurrent_approval() {
        let app = fixture();
        let id = app.appointment.id;
        let staff = app.directory.find_user(STAFF).await.unwrap();

        app.engine
            .book(app.appointment.clone(), staff, 1)
            .await
            .unwrap();
        app.engine
            .update_status(id, AppointmentStatus::Approved, Role::Staff)
            .await
            .unwrap();

        // A pass working from a snapshot taken before the approval still
        // sees the row as NOT_APPROVED and overdue. The guard re-check must
        // keep the live row in the book.
        let now = app.appointment.end() + Duration::hours(1);
        let mut report = SweepReport::default();
        app.sweep.sweep_row(&app.appointment, now, &mut report).await;

        assert_eq!(report.expired, 0);
        assert_eq!(report.removed, 0);
        assert_eq!(report.deferred, 1);
        let live = app.engine.get(id).await.unwrap();
        assert_eq!(live.status, AppointmentStatus::Approved);

        // The next full pass sees the live status and settles the row.
        app.clock.set(now);
        let second = app.sweep.run_once().await;
        assert_eq!(second.completed, 1);
        assert_eq!(second.credited, 1);
        assert_eq!(second.removed, 1);
        assert!(app.engine.get(id).await.is_none());
    }

    #[tokio::test]
    async fn overdue_unapproved_row_is_expired_and_deleted() {
        let app = fixture();
        let id = app.appointment.id;
        let staff = app.directory.find_user(STAFF).await.unwrap();

        app.engine
            .book(app.appointment.clone(), staff, 1)
            .await
            .unwrap();

        let now = app.appointment.end() + Duration::hours(1);
        let mut report = SweepReport::default();
        app.sweep.sweep_row(&app.appointment, now, &mut report).await;

        assert_eq!(report.expired, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.deferred, 0);
        assert!(app.engine.get(id).await.is_none());
    }
}
