//! # Lottery Core
//!
//! Core types and traits for the waitlist lottery engine.
//!
//! Events have a bounded number of places. Interested users join a waiting list,
//! an organizer *draws* a random subset of the waiting list into `invited`, and
//! invitees accept or decline. This crate holds everything the engine agrees on
//! with its collaborators:
//!
//! - **Types** ([`types`]): events, entrants, the entrant state machine's states
//!   and transitions, draw requests and results
//! - **Errors** ([`error`]): the engine's typed error taxonomy
//! - **Repository** ([`repository`]): the store boundary (CRUD, all-or-nothing
//!   batch writes, aggregate counts, optimistic revisions)
//! - **Notifications** ([`notification`]): composed messages and the transport
//!   boundary
//! - **Environment** ([`environment`]): injected dependencies such as the clock
//!
//! ## Architecture Principles
//!
//! - All I/O sits behind dyn-compatible traits injected by the caller
//! - Writes are all-or-nothing; concurrency is handled by the store's revision
//!   token, not by in-process locks
//! - Every failure is a typed error carrying the event, user and transition
//!
//! ## Example
//!
//! ```
//! use lottery_core::types::{EntrantStatus, Transition};
//!
//! assert_eq!(Transition::Accept.target(), Some(EntrantStatus::Accepted));
//! assert!(EntrantStatus::Invited.is_committed());
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

/// Typed error taxonomy for engine operations.
pub mod error;

/// Notification messages and the transport boundary.
pub mod notification;

/// Entrant store boundary.
pub mod repository;

/// Domain types: events, entrants, transitions, draws.
pub mod types;

pub use error::LotteryError;
pub use notification::{NotificationError, NotificationKind, NotificationMessage, NotificationSink};
pub use repository::{EntrantRepository, RepositoryError, Revision};
pub use types::{
    Actor, DrawRequest, DrawResult, Entrant, EntrantCounts, EntrantStatus, Event, EventId,
    EventStatus, GeoPoint, RemainingCapacity, Transition, UserId,
};

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// by whoever wires the engine together.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use lottery_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
