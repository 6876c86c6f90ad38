//! Slotbook Demo
//!
//! End-to-end demonstration of the appointment lifecycle against in-memory
//! collaborators:
//! - Booking with availability checking (overlap rejection)
//! - Role-guarded approval
//! - Time-driven auto-completion via the one-shot timer
//! - The cleanup sweep crediting staff aggregates
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin demo
//! ```

use chrono::{Duration as ChronoDuration, NaiveTime, Utc};
use slotbook::app::{AppointmentFilter, list_appointments};
use slotbook::catalog::{InMemoryCatalog, ServiceCatalog};
use slotbook::directory::{InMemoryDirectory, UserDirectory};
use slotbook::notify::ConsoleNotifier;
use slotbook::types::{
    AppointmentStatus, Money, Role, ServiceId, ServiceRecord, UserRecord, WorkingHours,
    WorkspaceId, WorkspaceRecord,
};
use slotbook::{
    BookingService, CleanupSweep, Config, SchedulingEngine, SchedulingEnvironment, SweepWorker,
    TransitionService,
};
use slotbook_core::environment::{Clock, SystemClock};
use slotbook_runtime::drain;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,slotbook=debug".into()),
        )
        .init();

    println!("\n📅 ============================================");
    println!("   Slotbook - Appointment Lifecycle Demo");
    println!("============================================\n");

    let config = Config::from_env();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // ========== Fixtures ==========

    let workspace = WorkspaceRecord {
        id: WorkspaceId::new(),
        name: "Studio A".to_string(),
        capacity: 1,
    };
    let service = ServiceRecord {
        id: ServiceId::new(),
        name: "Deep Tissue Massage".to_string(),
        duration: Duration::from_secs(3),
        price: Money::from_dollars(40),
        available: true,
        workspace_id: workspace.id,
    };

    let all_day = WorkingHours::new(
        NaiveTime::from_hms_opt(0, 0, 0).ok_or_else(|| anyhow::anyhow!("bad time"))?,
        NaiveTime::from_hms_opt(23, 59, 59).ok_or_else(|| anyhow::anyhow!("bad time"))?,
    )
    .ok_or_else(|| anyhow::anyhow!("bad working hours"))?;

    let directory = Arc::new(
        InMemoryDirectory::new()
            .with_user(UserRecord::client("alice@example.com"))
            .with_user(UserRecord::client("carol@example.com"))
            .with_user(UserRecord::staff("bob@example.com", all_day, [service.id])),
    );
    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_workspace(workspace)
            .with_service(service.clone()),
    );
    let notifier = Arc::new(ConsoleNotifier);

    let engine = SchedulingEngine::new(SchedulingEnvironment::new(Arc::clone(&clock)));
    let booking = BookingService::new(
        engine.clone(),
        Arc::clone(&directory) as Arc<dyn UserDirectory>,
        Arc::clone(&catalog) as Arc<dyn ServiceCatalog>,
        notifier.clone(),
        config.notifications.retry_policy(),
        Arc::clone(&clock),
    );
    let transitions = TransitionService::new(
        engine.clone(),
        notifier,
        config.notifications.retry_policy(),
    );

    // Background sweep on the configured interval; the demo also runs one
    // pass by hand below so the output is deterministic.
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let worker = SweepWorker::new(
        CleanupSweep::new(
            engine.clone(),
            Arc::clone(&directory) as Arc<dyn UserDirectory>,
            Arc::clone(&clock),
            config.sweep.approved_grace(),
        ),
        config.sweep.interval(),
        shutdown_rx,
    )
    .spawn();

    // ========== 1. Book ==========

    println!("1️⃣  Alice books a massage with Bob...");
    let start = Utc::now() + ChronoDuration::seconds(2);
    let appointment = booking
        .create_appointment(service.id, "alice@example.com", "bob@example.com", start)
        .await?;
    println!(
        "   ✓ Booked {} at {} ({})\n",
        appointment.id,
        appointment.slot.start(),
        appointment.status
    );

    // ========== 2. Conflict ==========

    println!("2️⃣  Carol tries the same slot...");
    match booking
        .create_appointment(service.id, "carol@example.com", "bob@example.com", start)
        .await
    {
        Ok(_) => println!("   ✗ unexpected success"),
        Err(err) => println!("   ✓ Rejected: {} [{}]\n", err, err.code()),
    }

    // ========== 3. Role guard ==========

    println!("3️⃣  Alice (client) tries to approve her own appointment...");
    match transitions
        .update_status(appointment.id, AppointmentStatus::Approved, Role::Client)
        .await
    {
        Ok(_) => println!("   ✗ unexpected success"),
        Err(err) => println!("   ✓ Rejected: {} [{}]\n", err, err.code()),
    }

    // ========== 4. Approval ==========

    println!("4️⃣  Bob approves...");
    let approved = transitions
        .update_status(appointment.id, AppointmentStatus::Approved, Role::Staff)
        .await?;
    println!("   ✓ Status: {}\n", approved.status);

    // ========== 5. Auto-complete ==========

    println!("5️⃣  Waiting for the end-of-appointment timer...");
    tokio::time::sleep(Duration::from_secs(6)).await;
    if let Some(current) = engine.get(appointment.id).await {
        println!("   ✓ Status after timer: {}\n", current.status);
    }

    // ========== 6. Sweep ==========

    println!("6️⃣  Running the cleanup sweep...");
    let sweep = CleanupSweep::new(
        engine.clone(),
        Arc::clone(&directory) as Arc<dyn UserDirectory>,
        Arc::clone(&clock),
        config.sweep.approved_grace(),
    );
    let report = sweep.run_once().await;
    println!(
        "   ✓ Sweep report: credited={} removed={}\n",
        report.credited, report.removed
    );

    let stats = directory.staff_stats("bob@example.com").await?;
    println!(
        "   💰 Bob's aggregates: {} completed, {} earned\n",
        stats.completed_appointments, stats.profit
    );

    let remaining = list_appointments(&engine, &AppointmentFilter::default()).await;
    println!("   📖 Appointments left in the book: {}\n", remaining.len());

    // ========== 7. Shutdown ==========

    shutdown_tx.send(()).ok();
    drain(vec![worker], Duration::from_secs(config.shutdown_timeout)).await;

    println!("✅ Demo complete");
    Ok(())
}
