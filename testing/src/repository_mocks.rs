//! In-memory entrant store for fast, deterministic tests.
//!
//! [`InMemoryEntrantRepository`] honours the full store contract (status
//! compare-and-set, all-or-nothing batches, per-event revisions) and adds
//! hooks for the situations a real store produces rarely:
//!
//! - [`fail_next_write`](InMemoryEntrantRepository::fail_next_write): the next
//!   write fails with a chosen error and changes nothing
//! - [`set_unavailable`](InMemoryEntrantRepository::set_unavailable): every
//!   call fails until cleared
//! - [`before_next_batch`](InMemoryEntrantRepository::before_next_batch): run a
//!   closure just before the next batch write, to stage a concurrent writer
//! - [`with_latency`](InMemoryEntrantRepository::with_latency): delay every
//!   call so concurrent operations overlap

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use lottery_core::repository::RepositoryFuture;
use lottery_core::{
    Entrant, EntrantRepository, EntrantStatus, Event, EventId, EventStatus, RepositoryError,
    Revision, UserId,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

type BatchHook = Box<dyn FnOnce(&InMemoryEntrantRepository) + Send>;

#[derive(Debug)]
struct EventRecord {
    event: Event,
    revision: Revision,
    entrants: HashMap<UserId, Entrant>,
}

impl EventRecord {
    fn check_revision(&self, expected: Option<Revision>) -> Result<(), RepositoryError> {
        match expected {
            Some(expected) if expected != self.revision => Err(RepositoryError::RevisionConflict {
                expected,
                actual: self.revision,
            }),
            _ => Ok(()),
        }
    }

    fn check_status(&self, user_id: &UserId, expected: EntrantStatus) -> Result<(), RepositoryError> {
        let entrant = self.entrants.get(user_id).ok_or(RepositoryError::NotFound)?;
        if entrant.status == expected {
            Ok(())
        } else {
            Err(RepositoryError::StatusMismatch {
                user_id: user_id.clone(),
                expected,
                actual: entrant.status,
            })
        }
    }

    fn bump(&mut self) -> Revision {
        self.revision = self.revision.next();
        self.revision
    }
}

/// In-memory [`EntrantRepository`].
///
/// Cloning shares the underlying data.
///
/// # Example
///
/// ```
/// use lottery_core::{Event, EntrantRepository, EntrantStatus, UserId};
/// use lottery_testing::InMemoryEntrantRepository;
///
/// # async fn example() -> Result<(), lottery_core::RepositoryError> {
/// let store = InMemoryEntrantRepository::new();
/// let event_id = store.insert_event(Event::new("Pottery", UserId::new("org")));
/// store.insert_waiting(event_id, &["ada", "grace"]);
///
/// let waiting = store.list_by_status(event_id, EntrantStatus::Waiting).await?;
/// assert_eq!(waiting.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryEntrantRepository {
    events: Arc<RwLock<HashMap<EventId, EventRecord>>>,
    pending_failures: Arc<Mutex<VecDeque<RepositoryError>>>,
    unavailable: Arc<RwLock<bool>>,
    batch_hook: Arc<Mutex<Option<BatchHook>>>,
    latency: Option<Duration>,
}

impl InMemoryEntrantRepository {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every trait call by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    // ========================================================================
    // Setup and inspection (synchronous, bypass hooks)
    // ========================================================================

    /// Store an event at [`Revision::INITIAL`]; returns its id.
    pub fn insert_event(&self, event: Event) -> EventId {
        let event_id = event.id;
        self.events.write().unwrap().insert(
            event_id,
            EventRecord {
                event,
                revision: Revision::INITIAL,
                entrants: HashMap::new(),
            },
        );
        event_id
    }

    /// Store or replace an entrant, advancing the event's revision.
    pub fn insert_entrant(&self, entrant: Entrant) {
        let mut events = self.events.write().unwrap();
        let record = events.get_mut(&entrant.event_id).unwrap();
        record.entrants.insert(entrant.user_id.clone(), entrant);
        record.bump();
    }

    /// Add waiting entrants registered one second apart, in order.
    pub fn insert_waiting(&self, event_id: EventId, users: &[&str]) {
        let base = crate::test_clock_time();
        for (offset, user) in (0_i64..).zip(users) {
            self.insert_entrant(Entrant::waiting(
                event_id,
                UserId::new(*user),
                base + chrono::Duration::seconds(offset),
            ));
        }
    }

    /// Overwrite an entrant's status, advancing the event's revision.
    ///
    /// Stands in for a concurrent writer.
    pub fn force_status(&self, event_id: EventId, user_id: &UserId, status: EntrantStatus) {
        let mut events = self.events.write().unwrap();
        let record = events.get_mut(&event_id).unwrap();
        record.entrants.get_mut(user_id).unwrap().status = status;
        record.bump();
    }

    /// The stored entrant, if any
    #[must_use]
    pub fn entrant(&self, event_id: EventId, user_id: &UserId) -> Option<Entrant> {
        self.events
            .read()
            .unwrap()
            .get(&event_id)
            .and_then(|record| record.entrants.get(user_id).cloned())
    }

    /// The stored entrant's status, if any
    #[must_use]
    pub fn status_of(&self, event_id: EventId, user: &str) -> Option<EntrantStatus> {
        self.entrant(event_id, &UserId::new(user)).map(|e| e.status)
    }

    /// Every entrant of an event
    #[must_use]
    pub fn entrants(&self, event_id: EventId) -> Vec<Entrant> {
        self.events
            .read()
            .unwrap()
            .get(&event_id)
            .map(|record| record.entrants.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of an event's entrants in `status`
    #[must_use]
    pub fn count(&self, event_id: EventId, status: EntrantStatus) -> usize {
        self.entrants(event_id)
            .iter()
            .filter(|e| e.status == status)
            .count()
    }

    /// The stored event
    #[must_use]
    pub fn event(&self, event_id: EventId) -> Option<Event> {
        self.events
            .read()
            .unwrap()
            .get(&event_id)
            .map(|record| record.event.clone())
    }

    /// The event's current revision
    #[must_use]
    pub fn current_revision(&self, event_id: EventId) -> Option<Revision> {
        self.events
            .read()
            .unwrap()
            .get(&event_id)
            .map(|record| record.revision)
    }

    // ========================================================================
    // Failure injection
    // ========================================================================

    /// Make the next write fail with `error` without changing anything.
    pub fn fail_next_write(&self, error: RepositoryError) {
        self.pending_failures.lock().unwrap().push_back(error);
    }

    /// Make every call fail with [`RepositoryError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().unwrap() = unavailable;
    }

    /// Run `hook` right before the next batch write checks its revision.
    pub fn before_next_batch<F>(&self, hook: F)
    where
        F: FnOnce(&Self) + Send + 'static,
    {
        *self.batch_hook.lock().unwrap() = Some(Box::new(hook));
    }

    async fn enter(&self) -> Result<(), RepositoryError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if *self.unavailable.read().unwrap() {
            return Err(RepositoryError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }

    async fn enter_write(&self) -> Result<(), RepositoryError> {
        self.enter().await?;
        match self.pending_failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn with_record<T>(
        &self,
        event_id: EventId,
        f: impl FnOnce(&mut EventRecord) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut events = self.events.write().unwrap();
        let record = events.get_mut(&event_id).ok_or(RepositoryError::NotFound)?;
        f(record)
    }
}

impl EntrantRepository for InMemoryEntrantRepository {
    fn get_event(&self, event_id: EventId) -> RepositoryFuture<'_, Event> {
        Box::pin(async move {
            self.enter().await?;
            self.event(event_id).ok_or(RepositoryError::NotFound)
        })
    }

    fn set_event_status(
        &self,
        event_id: EventId,
        status: EventStatus,
        expected_revision: Option<Revision>,
    ) -> RepositoryFuture<'_, Revision> {
        Box::pin(async move {
            self.enter_write().await?;
            self.with_record(event_id, |record| {
                record.check_revision(expected_revision)?;
                record.event.status = status;
                Ok(record.bump())
            })
        })
    }

    fn revision(&self, event_id: EventId) -> RepositoryFuture<'_, Revision> {
        Box::pin(async move {
            self.enter().await?;
            self.current_revision(event_id).ok_or(RepositoryError::NotFound)
        })
    }

    fn get(&self, event_id: EventId, user_id: UserId) -> RepositoryFuture<'_, Entrant> {
        Box::pin(async move {
            self.enter().await?;
            self.entrant(event_id, &user_id).ok_or(RepositoryError::NotFound)
        })
    }

    fn list_by_status(
        &self,
        event_id: EventId,
        status: EntrantStatus,
    ) -> RepositoryFuture<'_, Vec<Entrant>> {
        Box::pin(async move {
            self.enter().await?;
            let mut entrants: Vec<Entrant> = self
                .entrants(event_id)
                .into_iter()
                .filter(|e| e.status == status)
                .collect();
            entrants.sort_by(|a, b| {
                a.registered_at
                    .cmp(&b.registered_at)
                    .then_with(|| a.user_id.cmp(&b.user_id))
            });
            Ok(entrants)
        })
    }

    fn put(
        &self,
        entrant: Entrant,
        expected_revision: Option<Revision>,
    ) -> RepositoryFuture<'_, Revision> {
        Box::pin(async move {
            self.enter_write().await?;
            self.with_record(entrant.event_id, |record| {
                if record.entrants.contains_key(&entrant.user_id) {
                    return Err(RepositoryError::AlreadyExists);
                }
                record.check_revision(expected_revision)?;
                record.entrants.insert(entrant.user_id.clone(), entrant);
                Ok(record.bump())
            })
        })
    }

    fn update_status(
        &self,
        event_id: EventId,
        user_id: UserId,
        from: EntrantStatus,
        to: EntrantStatus,
        expected_revision: Option<Revision>,
    ) -> RepositoryFuture<'_, Revision> {
        Box::pin(async move {
            self.enter_write().await?;
            self.with_record(event_id, |record| {
                record.check_revision(expected_revision)?;
                record.check_status(&user_id, from)?;
                if let Some(entrant) = record.entrants.get_mut(&user_id) {
                    entrant.status = to;
                }
                Ok(record.bump())
            })
        })
    }

    fn batch_update_status(
        &self,
        event_id: EventId,
        user_ids: Vec<UserId>,
        from: EntrantStatus,
        to: EntrantStatus,
        expected_revision: Option<Revision>,
    ) -> RepositoryFuture<'_, Revision> {
        Box::pin(async move {
            self.enter_write().await?;
            let hook = self.batch_hook.lock().unwrap().take();
            if let Some(hook) = hook {
                hook(self);
            }
            self.with_record(event_id, |record| {
                record.check_revision(expected_revision)?;
                for user_id in &user_ids {
                    record.check_status(user_id, from)?;
                }
                for user_id in &user_ids {
                    if let Some(entrant) = record.entrants.get_mut(user_id) {
                        entrant.status = to;
                    }
                }
                Ok(record.bump())
            })
        })
    }

    fn delete(
        &self,
        event_id: EventId,
        user_id: UserId,
        expected_status: EntrantStatus,
    ) -> RepositoryFuture<'_, Revision> {
        Box::pin(async move {
            self.enter_write().await?;
            self.with_record(event_id, |record| {
                record.check_status(&user_id, expected_status)?;
                record.entrants.remove(&user_id);
                Ok(record.bump())
            })
        })
    }

    fn aggregate_count(
        &self,
        event_id: EventId,
        status: EntrantStatus,
    ) -> RepositoryFuture<'_, u32> {
        Box::pin(async move {
            self.enter().await?;
            let count = self.count(event_id, status);
            Ok(u32::try_from(count).unwrap_or(u32::MAX))
        })
    }
}
