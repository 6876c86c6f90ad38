//! The user directory port and its in-memory implementation.
//!
//! The directory is the system of record for users, their roles and the
//! per-staff completion aggregates. The engine never talks to it; only the
//! orchestrators and the cleanup sweep do.

use crate::types::{AppointmentId, Money, StaffStats, UserRecord};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Directory lookup and update failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// No user registered under this email
    #[error("no user registered for {0}")]
    UserNotFound(String),

    /// The directory backend is unreachable or degraded
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// Port to the user directory
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by email
    ///
    /// # Errors
    ///
    /// [`DirectoryError::UserNotFound`] for an unknown email, or
    /// [`DirectoryError::Unavailable`] when the backend is degraded.
    async fn find_user(&self, email: &str) -> Result<UserRecord, DirectoryError>;

    /// Credit a completed appointment to a staff member's aggregates.
    ///
    /// Idempotent per appointment id: crediting the same appointment twice
    /// counts it once and returns `false` the second time.
    ///
    /// # Errors
    ///
    /// [`DirectoryError::UserNotFound`] for an unknown staff email, or
    /// [`DirectoryError::Unavailable`] when the backend is degraded.
    async fn record_completion(
        &self,
        staff_email: &str,
        appointment_id: AppointmentId,
        price: Money,
    ) -> Result<bool, DirectoryError>;

    /// Current completion aggregates for a staff member
    ///
    /// # Errors
    ///
    /// [`DirectoryError::UserNotFound`] for an unknown staff email.
    async fn staff_stats(&self, email: &str) -> Result<StaffStats, DirectoryError>;
}

struct DirectoryState {
    users: HashMap<String, UserRecord>,
    stats: HashMap<String, StaffStats>,
    credited: HashSet<AppointmentId>,
}

/// In-memory directory for tests and the demo binary
#[derive(Clone)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    /// Creates an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState {
                users: HashMap::new(),
                stats: HashMap::new(),
                credited: HashSet::new(),
            })),
        }
    }

    /// Register a user, replacing any existing record under the same email
    pub async fn register(&self, user: UserRecord) {
        let mut state = self.state.write().await;
        state.users.insert(user.email.clone(), user);
    }

    /// Register a user at construction time, builder style.
    ///
    /// Only usable before the directory is shared; a contended lock means
    /// the builder phase is over, which debug builds treat as a bug and
    /// release builds resolve by dropping the record.
    #[must_use]
    pub fn with_user(self, user: UserRecord) -> Self {
        {
            let state = self.state.try_write();
            debug_assert!(
                state.is_ok(),
                "with_user called after the directory was shared"
            );
            if let Ok(mut state) = state {
                state.users.insert(user.email.clone(), user);
            }
        }
        self
    }

    /// Flip a user's availability flag, if the user exists
    pub async fn set_available(&self, email: &str, available: bool) {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(email) {
            user.available = available;
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_user(&self, email: &str) -> Result<UserRecord, DirectoryError> {
        let state = self.state.read().await;
        state
            .users
            .get(email)
            .cloned()
            .ok_or_else(|| DirectoryError::UserNotFound(email.to_string()))
    }

    async fn record_completion(
        &self,
        staff_email: &str,
        appointment_id: AppointmentId,
        price: Money,
    ) -> Result<bool, DirectoryError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(staff_email) {
            return Err(DirectoryError::UserNotFound(staff_email.to_string()));
        }
        if !state.credited.insert(appointment_id) {
            debug!(appointment_id = %appointment_id, "completion already credited");
            return Ok(false);
        }
        let stats = state.stats.entry(staff_email.to_string()).or_default();
        stats.completed_appointments += 1;
        stats.profit = stats.profit.saturating_add(price);
        Ok(true)
    }

    async fn staff_stats(&self, email: &str) -> Result<StaffStats, DirectoryError> {
        let state = self.state.read().await;
        if !state.users.contains_key(email) {
            return Err(DirectoryError::UserNotFound(email.to_string()));
        }
        Ok(state.stats.get(email).copied().unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ServiceId, WorkingHours};
    use chrono::NaiveTime;

    fn staff() -> UserRecord {
        UserRecord::staff(
            "staff@example.com",
            WorkingHours::new(
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            )
            .unwrap(),
            [ServiceId::new()],
        )
    }

    #[tokio::test]
    async fn find_user_returns_registered_record() {
        let directory = InMemoryDirectory::new().with_user(staff());
        let found = directory.find_user("staff@example.com").await.unwrap();
        assert_eq!(found.email, "staff@example.com");

        let missing = directory.find_user("ghost@example.com").await;
        assert_eq!(
            missing,
            Err(DirectoryError::UserNotFound("ghost@example.com".to_string()))
        );
    }

    #[tokio::test]
    async fn record_completion_is_idempotent_per_appointment() {
        let directory = InMemoryDirectory::new().with_user(staff());
        let id = AppointmentId::new();
        let price = Money::from_dollars(40);

        assert!(
            directory
                .record_completion("staff@example.com", id, price)
                .await
                .unwrap()
        );
        assert!(
            !directory
                .record_completion("staff@example.com", id, price)
                .await
                .unwrap()
        );

        let stats = directory.staff_stats("staff@example.com").await.unwrap();
        assert_eq!(stats.completed_appointments, 1);
        assert_eq!(stats.profit, price);
    }

    #[tokio::test]
    #[should_panic(expected = "after the directory was shared")]
    async fn builder_after_sharing_is_rejected_in_debug() {
        let directory = InMemoryDirectory::new();
        let shared = directory.clone();
        let _guard = shared.state.read().await;
        let _ = directory.with_user(staff());
    }

    #[tokio::test]
    async fn distinct_appointments_accumulate() {
        let directory = InMemoryDirectory::new().with_user(staff());
        for _ in 0..3 {
            directory
                .record_completion("staff@example.com", AppointmentId::new(), Money::from_dollars(10))
                .await
                .unwrap();
        }
        let stats = directory.staff_stats("staff@example.com").await.unwrap();
        assert_eq!(stats.completed_appointments, 3);
        assert_eq!(stats.profit, Money::from_dollars(30));
    }
}
