//! # Slotbook Testing
//!
//! Testing utilities for the Slotbook scheduling engine:
//!
//! - Mock implementations of Environment traits ([`mocks::FixedClock`])
//! - The Given-When-Then [`ReducerTest`] harness with effect assertions
//!
//! ## Example
//!
//! ```ignore
//! use slotbook_testing::{test_clock, ReducerTest};
//!
//! let clock = test_clock();
//! ReducerTest::new(SchedulingReducer::new())
//!     .with_env(SchedulingEnvironment::new(Arc::new(clock)))
//!     .given_state(SchedulingState::new())
//!     .when_action(action)
//!     .then_state(|state| assert_eq!(state.count(), 1))
//!     .run();
//! ```

use chrono::{DateTime, Duration, Utc};
use slotbook_core::environment::Clock;


/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::Mutex;

    /// Settable clock for deterministic tests.
    ///
    /// Returns the same instant until moved with [`FixedClock::set`] or
    /// [`FixedClock::advance`], so expiry and sweep logic can be driven
    /// through time without sleeping.
    ///
    /// # Example
    ///
    /// ```
    /// use slotbook_testing::mocks::FixedClock;
    /// use slotbook_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// clock.advance(Duration::hours(2));
    /// assert_eq!(clock.now(), before + Duration::hours(2));
    /// ```
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a new fixed clock pinned at the given time.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Pin the clock to a new instant.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.lock() = time;
        }

        /// Move the clock forward (or backward, with a negative duration).
        pub fn advance(&self, by: Duration) {
            let mut time = self.lock();
            *time += by;
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
            match self.time.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.lock()
        }
    }

    /// Create a default fixed clock for tests (2026-01-01 00:00:00 UTC).
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which should never
    /// happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
