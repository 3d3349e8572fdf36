//! Entrant store boundary.
//!
//! The engine never owns storage. It talks to a document store through
//! [`EntrantRepository`], which exposes CRUD on entrants scoped to an event,
//! an all-or-nothing batch status write, aggregate counts and the event's
//! metadata.
//!
//! # Optimistic concurrency
//!
//! Every event has a [`Revision`] that the store advances on each write
//! touching the event or its entrants. Writes accept an optional
//! `expected_revision`:
//!
//! - `Some(revision)`: the write only lands if the event is still at `revision`
//! - `None`: no revision check (the per-entrant status check still applies)
//!
//! A draw reads the revision before its snapshot and submits its batch with it,
//! so a draw racing an accept (or another draw) fails with
//! [`RepositoryError::RevisionConflict`] instead of overcommitting.
//!
//! Stores that cannot honour `expected_revision` must reject the write rather
//! than ignore the token.

use crate::types::{Entrant, EntrantStatus, Event, EventId, EventStatus, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`EntrantRepository`] methods.
pub type RepositoryFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + Send + 'a>>;

/// Per-event write counter used as an optimistic concurrency token.
///
/// # Examples
///
/// ```
/// use lottery_core::Revision;
///
/// let r0 = Revision::INITIAL;
/// assert_eq!(r0.next(), Revision::new(1));
/// assert_eq!(Revision::new(7).value(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Revision(u64);

impl Revision {
    /// Revision of an event nobody has written to yet.
    pub const INITIAL: Self = Self(0);

    /// Wrap a raw revision value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw value
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The revision after one more write
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors reported by the entrant store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The event or entrant does not exist.
    #[error("Record not found")]
    NotFound,

    /// An entrant already exists for this (event, user) pair.
    #[error("Record already exists")]
    AlreadyExists,

    /// The event moved past the revision the write was based on.
    #[error("Revision conflict: expected {expected}, found {actual}")]
    RevisionConflict {
        /// Revision the caller read
        expected: Revision,
        /// Revision the store holds
        actual: Revision,
    },

    /// An entrant was not in the status the write expected.
    #[error("Entrant {user_id} is {actual}, expected {expected}")]
    StatusMismatch {
        /// The entrant
        user_id: UserId,
        /// Status the write was conditioned on
        expected: EntrantStatus,
        /// Status the store holds
        actual: EntrantStatus,
    },

    /// The store could not be reached or failed mid-request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Store abstraction for events and their entrants.
///
/// # Contract
///
/// - Exactly one entrant exists per (event, user); [`put`](Self::put) rejects
///   duplicates with [`RepositoryError::AlreadyExists`]
/// - Status writes are compare-and-set on the entrant's current status
/// - [`batch_update_status`](Self::batch_update_status) applies every change or none
/// - Successful writes return the event's new [`Revision`]
/// - Reads never substitute defaults for failures
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the engine can hold an
/// `Arc<dyn EntrantRepository>` chosen at runtime.
pub trait EntrantRepository: Send + Sync {
    /// Load an event's metadata.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event
    /// - `Unavailable`: the store failed
    fn get_event(&self, event_id: EventId) -> RepositoryFuture<'_, Event>;

    /// Change an event's status.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event
    /// - `RevisionConflict`: `expected_revision` is stale
    /// - `Unavailable`: the store failed
    fn set_event_status(
        &self,
        event_id: EventId,
        status: EventStatus,
        expected_revision: Option<Revision>,
    ) -> RepositoryFuture<'_, Revision>;

    /// The event's current revision.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event
    /// - `Unavailable`: the store failed
    fn revision(&self, event_id: EventId) -> RepositoryFuture<'_, Revision>;

    /// Load one entrant.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the user has no entrant record for this event
    /// - `Unavailable`: the store failed
    fn get(&self, event_id: EventId, user_id: UserId) -> RepositoryFuture<'_, Entrant>;

    /// All entrants of an event in `status`, oldest registration first.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: the store failed
    fn list_by_status(
        &self,
        event_id: EventId,
        status: EntrantStatus,
    ) -> RepositoryFuture<'_, Vec<Entrant>>;

    /// Create an entrant record.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event
    /// - `AlreadyExists`: the user already has a record for this event
    /// - `RevisionConflict`: `expected_revision` is stale
    /// - `Unavailable`: the store failed
    fn put(&self, entrant: Entrant, expected_revision: Option<Revision>)
    -> RepositoryFuture<'_, Revision>;

    /// Move one entrant from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such entrant
    /// - `StatusMismatch`: the entrant is no longer in `from`
    /// - `RevisionConflict`: `expected_revision` is stale
    /// - `Unavailable`: the store failed
    fn update_status(
        &self,
        event_id: EventId,
        user_id: UserId,
        from: EntrantStatus,
        to: EntrantStatus,
        expected_revision: Option<Revision>,
    ) -> RepositoryFuture<'_, Revision>;

    /// Move every listed entrant from `from` to `to`, all or nothing.
    ///
    /// # Errors
    ///
    /// Any of the [`update_status`](Self::update_status) errors for any listed
    /// entrant; on error nothing was written.
    fn batch_update_status(
        &self,
        event_id: EventId,
        user_ids: Vec<UserId>,
        from: EntrantStatus,
        to: EntrantStatus,
        expected_revision: Option<Revision>,
    ) -> RepositoryFuture<'_, Revision>;

    /// Remove an entrant record that is currently in `expected_status`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such entrant
    /// - `StatusMismatch`: the entrant is no longer in `expected_status`
    /// - `Unavailable`: the store failed
    fn delete(
        &self,
        event_id: EventId,
        user_id: UserId,
        expected_status: EntrantStatus,
    ) -> RepositoryFuture<'_, Revision>;

    /// Server-side count of an event's entrants in `status`.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: the store failed
    fn aggregate_count(
        &self,
        event_id: EventId,
        status: EntrantStatus,
    ) -> RepositoryFuture<'_, u32>;
}
