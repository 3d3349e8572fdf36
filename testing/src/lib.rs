//! # Lottery Testing
//!
//! Testing utilities for the waitlist lottery engine.
//!
//! This crate provides:
//! - A deterministic clock
//! - An in-memory entrant store with failure and race injection
//! - A notification sink that records what it was handed
//! - Event and user fixtures
//! - A Given-When-Then scenario harness over [`lottery_runtime::LotteryService`]
//!
//! ## Example
//!
//! ```ignore
//! use lottery_core::EntrantStatus;
//! use lottery_runtime::InviteResponse;
//! use lottery_testing::{LotteryScenario, fixtures};
//!
//! #[tokio::test]
//! async fn test_accept_flow() {
//!     let scenario = LotteryScenario::new(fixtures::event(Some(1)))
//!         .given_entrant("ada", EntrantStatus::Invited);
//!
//!     scenario
//!         .when(|service, event_id| async move {
//!             service
//!                 .respond_to_invite(event_id, "ada".into(), InviteResponse::Accept)
//!                 .await
//!         })
//!         .await
//!         .unwrap();
//!
//!     scenario.then_status("ada", Some(EntrantStatus::Accepted));
//! }
//! ```

use chrono::{DateTime, Utc};
use lottery_core::environment::Clock;

/// Event and user fixtures
pub mod fixtures;

/// In-memory entrant store
pub mod repository_mocks;

/// Given-When-Then scenario harness
pub mod scenario;

/// Recording notification sink
pub mod sink_mocks;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use lottery_testing::mocks::FixedClock;
    /// use lottery_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// The instant [`test_clock`] reports (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which never happens
    /// in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_clock_time())
    }
}

/// Install a `tracing` subscriber writing to the test output.
///
/// Filtered by `RUST_LOG`, defaulting to `lottery=debug`. Safe to call from
/// every test; only the first call installs.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lottery=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock, test_clock_time};
pub use repository_mocks::InMemoryEntrantRepository;
pub use scenario::LotteryScenario;
pub use sink_mocks::RecordingNotificationSink;
