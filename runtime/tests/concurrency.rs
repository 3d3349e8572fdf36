//! Concurrent writers against one event.
//!
//! The in-memory store adds latency so operations overlap, and its
//! `before_next_batch` hook stages a competing write at a known point.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use lottery_core::{EntrantStatus, LotteryError, UserId};
use lottery_runtime::retry::{RetryPolicy, retry_retryable};
use lottery_runtime::{JoinRequest, LotteryConfig};
use lottery_testing::{InMemoryEntrantRepository, LotteryScenario, fixtures};
use std::time::Duration;

fn slow_store() -> InMemoryEntrantRepository {
    InMemoryEntrantRepository::new().with_latency(Duration::from_millis(5))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_draws_never_overcommit() {
    lottery_testing::init_test_tracing();
    let users = fixtures::users("u", 12);
    let users: Vec<&str> = users.iter().map(String::as_str).collect();
    let scenario = LotteryScenario::with_store(
        slow_store(),
        fixtures::event(Some(3)),
        &LotteryConfig::for_tests(11),
    )
    .given_waiting(&users);

    let mut draws = tokio::task::JoinSet::new();
    for _ in 0..4 {
        let service = scenario.service().clone();
        let event_id = scenario.event_id();
        draws.spawn(async move { service.run_draw(event_id, 2).await });
    }

    let mut drawn = 0;
    while let Some(joined) = draws.join_next().await {
        match joined.unwrap() {
            Ok(result) => drawn += result.actual_count,
            Err(LotteryError::Conflict { .. }) => {},
            Err(other) => panic!("unexpected draw error: {other}"),
        }
    }

    let invited = scenario.store().count(scenario.event_id(), EntrantStatus::Invited);
    assert!(invited <= 3, "{invited} invited for 3 places");
    assert_eq!(drawn, invited);
}

#[tokio::test]
async fn test_draw_racing_accept_reports_conflict() {
    lottery_testing::init_test_tracing();
    let scenario = LotteryScenario::new(fixtures::event(Some(3)))
        .given_entrant("x", EntrantStatus::Invited)
        .given_waiting(&["a", "b", "c"]);
    let event_id = scenario.event_id();
    scenario.store().before_next_batch(move |store| {
        store.force_status(event_id, &UserId::new("x"), EntrantStatus::Accepted);
    });

    let result = scenario
        .when(|service, event_id| async move { service.run_draw(event_id, 2).await })
        .await;

    assert!(matches!(result, Err(LotteryError::Conflict { user_id: None, .. })));
    scenario
        .then_counts(3, 0, 1)
        .then_status("x", Some(EntrantStatus::Accepted));
    assert!(scenario.sink().messages().is_empty());
}

#[tokio::test]
async fn test_conflicting_draw_succeeds_on_retry() {
    let scenario = LotteryScenario::new(fixtures::event(Some(3)))
        .given_entrant("x", EntrantStatus::Invited)
        .given_waiting(&["a", "b", "c"]);
    let event_id = scenario.event_id();
    scenario.store().before_next_batch(move |store| {
        store.force_status(event_id, &UserId::new("x"), EntrantStatus::Accepted);
    });

    let policy = RetryPolicy::default().with_initial_delay(Duration::from_millis(1));
    let service = scenario.service().clone();
    let drawn = retry_retryable(policy, || service.run_draw(event_id, 2))
        .await
        .unwrap();

    assert_eq!(drawn.actual_count, 2);
    scenario.then_counts(1, 2, 1);
}

#[tokio::test]
async fn test_revert_racing_accept_changes_nothing() {
    let scenario = LotteryScenario::new(fixtures::event(Some(3)))
        .given_entrant("x", EntrantStatus::Invited)
        .given_entrant("y", EntrantStatus::Invited);
    let event_id = scenario.event_id();
    scenario.store().before_next_batch(move |store| {
        store.force_status(event_id, &UserId::new("y"), EntrantStatus::Accepted);
    });

    let result = scenario
        .when(|service, event_id| async move { service.revert_draw(event_id).await })
        .await;

    assert!(matches!(result, Err(LotteryError::Conflict { .. })));
    scenario
        .then_status("x", Some(EntrantStatus::Invited))
        .then_status("y", Some(EntrantStatus::Accepted));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_respect_waitlist_limit() {
    let event = fixtures::event(None).with_waiting_list_limit(5);
    let scenario =
        LotteryScenario::with_store(slow_store(), event, &LotteryConfig::for_tests(3));

    let mut joins = tokio::task::JoinSet::new();
    for user in fixtures::users("joiner", 20) {
        let service = scenario.service().clone();
        let event_id = scenario.event_id();
        joins.spawn(async move {
            service
                .join_waitlist(event_id, UserId::new(user), JoinRequest::default())
                .await
        });
    }

    let mut joined = 0;
    while let Some(result) = joins.join_next().await {
        match result.unwrap() {
            Ok(_) => joined += 1,
            Err(LotteryError::WaitlistFull { .. } | LotteryError::Conflict { .. }) => {},
            Err(other) => panic!("unexpected join error: {other}"),
        }
    }

    let waiting = scenario.store().count(scenario.event_id(), EntrantStatus::Waiting);
    assert!(waiting <= 5, "{waiting} waiting for a limit of 5");
    assert_eq!(joined, waiting);
}

#[tokio::test]
async fn test_abandoned_draw_still_commits() {
    let store = InMemoryEntrantRepository::new().with_latency(Duration::from_millis(20));
    let scenario = LotteryScenario::with_store(
        store,
        fixtures::event(Some(2)),
        &LotteryConfig::for_tests(5),
    )
    .given_waiting(&["a", "b", "c"]);

    let service = scenario.service().clone();
    let event_id = scenario.event_id();
    let abandoned =
        tokio::time::timeout(Duration::from_millis(5), service.run_draw(event_id, 2)).await;
    assert!(abandoned.is_err(), "draw should still be running");

    tokio::time::sleep(Duration::from_millis(500)).await;

    scenario.then_counts(1, 2, 0);
    assert_eq!(scenario.sink().messages().len(), 2);
}
