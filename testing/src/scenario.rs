//! Given-When-Then harness for engine scenarios.

#![allow(clippy::module_name_repetitions)] // LotteryScenario is the natural name
#![allow(clippy::missing_panics_doc)] // Assertion helpers panic by design

use crate::mocks::{test_clock, test_clock_time};
use crate::{InMemoryEntrantRepository, RecordingNotificationSink};
use lottery_core::{Entrant, EntrantStatus, Event, EventId, NotificationKind, UserId};
use lottery_runtime::{LotteryConfig, LotteryService};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Seed used unless a scenario picks its own
pub const DEFAULT_SEED: u64 = 42;

/// One event, an in-memory store, a recording sink and a service wired to
/// them with inline notifications, a seeded draw and the fixed test clock.
///
/// # Example
///
/// ```ignore
/// use lottery_core::{EntrantStatus, NotificationKind};
/// use lottery_testing::{LotteryScenario, fixtures};
///
/// let scenario = LotteryScenario::new(fixtures::event(Some(2)))
///     .given_waiting(&["a", "b", "c"]);
///
/// let drawn = scenario
///     .when(|service, event_id| async move { service.run_draw(event_id, 5).await })
///     .await
///     .unwrap();
///
/// assert_eq!(drawn.actual_count, 2);
/// scenario
///     .then_counts(1, 2, 0)
///     .then_notifications(NotificationKind::Invite, 2);
/// ```
pub struct LotteryScenario {
    store: InMemoryEntrantRepository,
    sink: RecordingNotificationSink,
    service: LotteryService,
    event_id: EventId,
    registrations: AtomicI64,
}

impl LotteryScenario {
    /// Scenario over `event` with [`DEFAULT_SEED`]
    #[must_use]
    pub fn new(event: Event) -> Self {
        Self::with_config(event, LotteryConfig::for_tests(DEFAULT_SEED))
    }

    /// Scenario over `event` with its own seed
    #[must_use]
    pub fn with_seed(event: Event, seed: u64) -> Self {
        Self::with_config(event, LotteryConfig::for_tests(seed))
    }

    /// Scenario over `event` with an explicit configuration
    #[must_use]
    pub fn with_config(event: Event, config: LotteryConfig) -> Self {
        Self::with_store(InMemoryEntrantRepository::new(), event, &config)
    }

    /// Scenario over a prepared store, e.g. one with latency
    #[must_use]
    pub fn with_store(store: InMemoryEntrantRepository, event: Event, config: &LotteryConfig) -> Self {
        let sink = RecordingNotificationSink::new();
        let event_id = store.insert_event(event);
        let service = LotteryService::with_clock(
            Arc::new(store.clone()),
            Arc::new(sink.clone()),
            Arc::new(test_clock()),
            config,
        );
        Self {
            store,
            sink,
            service,
            event_id,
            registrations: AtomicI64::new(0),
        }
    }

    // ========================================================================
    // Given
    // ========================================================================

    /// Users already on the waiting list, registered in order
    #[must_use]
    pub fn given_waiting(self, users: &[&str]) -> Self {
        for user in users {
            self.insert(user, EntrantStatus::Waiting);
        }
        self
    }

    /// A user already in `status`
    #[must_use]
    pub fn given_entrant(self, user: &str, status: EntrantStatus) -> Self {
        self.insert(user, status);
        self
    }

    fn insert(&self, user: &str, status: EntrantStatus) {
        let offset = self.registrations.fetch_add(1, Ordering::SeqCst);
        let entrant = Entrant::waiting(
            self.event_id,
            UserId::new(user),
            test_clock_time() - chrono::Duration::minutes(60) + chrono::Duration::seconds(offset),
        )
        .with_status(status);
        self.store.insert_entrant(entrant);
    }

    // ========================================================================
    // When
    // ========================================================================

    /// Run an operation against the service
    pub async fn when<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce(LotteryService, EventId) -> Fut,
        Fut: Future<Output = T>,
    {
        operation(self.service.clone(), self.event_id).await
    }

    // ========================================================================
    // Then
    // ========================================================================

    /// Assert a user's stored status (`None` = no record)
    pub fn then_status(&self, user: &str, expected: Option<EntrantStatus>) -> &Self {
        assert_eq!(
            self.store.status_of(self.event_id, user),
            expected,
            "status of {user}"
        );
        self
    }

    /// Assert the waiting, invited and accepted counts
    pub fn then_counts(&self, waiting: usize, invited: usize, accepted: usize) -> &Self {
        let actual = (
            self.store.count(self.event_id, EntrantStatus::Waiting),
            self.store.count(self.event_id, EntrantStatus::Invited),
            self.store.count(self.event_id, EntrantStatus::Accepted),
        );
        assert_eq!(actual, (waiting, invited, accepted), "(waiting, invited, accepted)");
        self
    }

    /// Assert how many messages of `kind` were delivered
    pub fn then_notifications(&self, kind: NotificationKind, expected: usize) -> &Self {
        assert_eq!(self.sink.of_kind(kind).len(), expected, "{kind} notifications");
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The service under test
    #[must_use]
    pub fn service(&self) -> &LotteryService {
        &self.service
    }

    /// The backing store
    #[must_use]
    pub const fn store(&self) -> &InMemoryEntrantRepository {
        &self.store
    }

    /// The recording sink
    #[must_use]
    pub const fn sink(&self) -> &RecordingNotificationSink {
        &self.sink
    }

    /// The scenario's event
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Users currently in `status`, sorted by id
    #[must_use]
    pub fn users_in(&self, status: EntrantStatus) -> Vec<String> {
        let mut users: Vec<String> = self
            .store
            .entrants(self.event_id)
            .into_iter()
            .filter(|e| e.status == status)
            .map(|e| e.user_id.to_string())
            .collect();
        users.sort();
        users
    }
}
