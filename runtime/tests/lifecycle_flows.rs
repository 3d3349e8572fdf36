//! Joining, leaving, responding and organizer actions.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::Duration;
use lottery_core::{
    Actor, EntrantStatus, EventStatus, GeoPoint, LotteryError, NotificationKind, Transition, UserId,
};
use lottery_runtime::{DispatchMode, InviteResponse, JoinRequest, LifecycleManager, NotificationDispatcher};
use lottery_testing::{LotteryScenario, fixtures, test_clock, test_clock_time};
use std::sync::Arc;

fn user(id: &str) -> UserId {
    UserId::new(id)
}

// ============================================================================
// Join
// ============================================================================

#[tokio::test]
async fn test_join_records_waiting_entrant() {
    let scenario = LotteryScenario::new(fixtures::event(Some(2)));

    let entrant = scenario
        .when(|service, event_id| async move {
            service
                .join_waitlist(event_id, user("ada"), JoinRequest::named("Ada"))
                .await
        })
        .await
        .unwrap();

    assert_eq!(entrant.status, EntrantStatus::Waiting);
    assert_eq!(entrant.display_name, "Ada");
    assert_eq!(entrant.registered_at, test_clock_time());
    scenario.then_status("ada", Some(EntrantStatus::Waiting));
}

#[tokio::test]
async fn test_join_without_name_is_anonymous() {
    let scenario = LotteryScenario::new(fixtures::event(None));

    let entrant = scenario
        .when(|service, event_id| async move {
            service
                .join_waitlist(event_id, user("ada"), JoinRequest::named("   "))
                .await
        })
        .await
        .unwrap();

    assert_eq!(entrant.display_name, "Anonymous");
}

#[tokio::test]
async fn test_joining_twice_is_refused() {
    let scenario = LotteryScenario::new(fixtures::event(None)).given_entrant("ada", EntrantStatus::Declined);

    let result = scenario
        .when(|service, event_id| async move {
            service
                .join_waitlist(event_id, user("ada"), JoinRequest::default())
                .await
        })
        .await;

    assert!(matches!(result, Err(LotteryError::AlreadyJoined { .. })));
    scenario.then_status("ada", Some(EntrantStatus::Declined));
}

#[tokio::test]
async fn test_organizer_cannot_join() {
    let scenario = LotteryScenario::new(fixtures::event(None));

    let result = scenario
        .when(|service, event_id| async move {
            service
                .join_waitlist(event_id, fixtures::organizer(), JoinRequest::default())
                .await
        })
        .await;

    match result {
        Err(LotteryError::InvalidRequest { user_id, .. }) => {
            assert_eq!(user_id, Some(fixtures::organizer()));
        },
        other => panic!("expected InvalidRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn test_geolocation_requirement() {
    let scenario = LotteryScenario::new(fixtures::event(None).requiring_geolocation());

    let missing = scenario
        .when(|service, event_id| async move {
            service
                .join_waitlist(event_id, user("a"), JoinRequest::default())
                .await
        })
        .await;
    assert!(matches!(missing, Err(LotteryError::InvalidRequest { .. })));

    let out_of_range = scenario
        .when(|service, event_id| async move {
            service
                .join_waitlist(event_id, user("a"), JoinRequest::default().at(GeoPoint::new(91.0, 0.0)))
                .await
        })
        .await;
    assert!(matches!(out_of_range, Err(LotteryError::InvalidRequest { .. })));

    let here = GeoPoint::new(53.52, -113.52);
    let joined = scenario
        .when(|service, event_id| async move {
            service
                .join_waitlist(event_id, user("a"), JoinRequest::default().at(here))
                .await
        })
        .await
        .unwrap();
    assert_eq!(joined.location, Some(here));
}

#[tokio::test]
async fn test_join_outside_registration_window() {
    let now = test_clock_time();
    let event = fixtures::event(None).with_registration_window(now - Duration::days(7), now - Duration::days(1));
    let scenario = LotteryScenario::new(event);

    let result = scenario
        .when(|service, event_id| async move {
            service
                .join_waitlist(event_id, user("late"), JoinRequest::default())
                .await
        })
        .await;

    assert!(matches!(result, Err(LotteryError::RegistrationClosed { .. })));
    scenario.then_status("late", None);
}

#[tokio::test]
async fn test_join_closed_event() {
    let scenario = LotteryScenario::new(fixtures::event(None).with_status(EventStatus::Cancelled));

    let result = scenario
        .when(|service, event_id| async move {
            service
                .join_waitlist(event_id, user("a"), JoinRequest::default())
                .await
        })
        .await;

    assert!(matches!(
        result,
        Err(LotteryError::EventNotOpen {
            user_id: Some(_),
            status: EventStatus::Cancelled,
            ..
        })
    ));
    scenario.then_status("a", None);
}

#[tokio::test]
async fn test_join_full_waitlist() {
    let event = fixtures::event(None).with_waiting_list_limit(2);
    let scenario = LotteryScenario::new(event)
        .given_waiting(&["a", "b"])
        .given_entrant("invited", EntrantStatus::Invited);

    let result = scenario
        .when(|service, event_id| async move {
            service
                .join_waitlist(event_id, user("c"), JoinRequest::default())
                .await
        })
        .await;

    assert!(matches!(result, Err(LotteryError::WaitlistFull { limit: 2, .. })));
    scenario.then_status("c", None);
}

#[tokio::test]
async fn test_join_with_store_down() {
    let scenario = LotteryScenario::new(fixtures::event(None));
    scenario.store().set_unavailable(true);

    let error = scenario
        .when(|service, event_id| async move {
            service
                .join_waitlist(event_id, user("a"), JoinRequest::default())
                .await
        })
        .await
        .unwrap_err();

    assert!(matches!(error, LotteryError::DataUnavailable { .. }));
    assert!(error.is_retryable());
}

// ============================================================================
// Leave
// ============================================================================

#[tokio::test]
async fn test_leaving_twice_is_not_found() {
    let scenario = LotteryScenario::new(fixtures::event(None)).given_waiting(&["a"]);

    scenario
        .when(|service, event_id| async move { service.leave_waitlist(event_id, user("a")).await })
        .await
        .unwrap();
    scenario.then_status("a", None);

    let again = scenario
        .when(|service, event_id| async move { service.leave_waitlist(event_id, user("a")).await })
        .await;
    assert!(matches!(again, Err(LotteryError::NotFound { user_id: Some(_), .. })));
}

#[tokio::test]
async fn test_invited_entrant_cannot_leave() {
    let scenario = LotteryScenario::new(fixtures::event(None)).given_entrant("a", EntrantStatus::Invited);

    let result = scenario
        .when(|service, event_id| async move { service.leave_waitlist(event_id, user("a")).await })
        .await;

    assert!(matches!(
        result,
        Err(LotteryError::InvalidTransition {
            from: EntrantStatus::Invited,
            transition: Transition::Leave,
            ..
        })
    ));
    scenario.then_status("a", Some(EntrantStatus::Invited));
}

// ============================================================================
// Respond
// ============================================================================

#[tokio::test]
async fn test_accept_invitation() {
    let scenario = LotteryScenario::new(fixtures::event(Some(1))).given_entrant("a", EntrantStatus::Invited);

    let accepted = scenario
        .when(|service, event_id| async move {
            service
                .respond_to_invite(event_id, user("a"), InviteResponse::Accept)
                .await
        })
        .await
        .unwrap();

    assert_eq!(accepted.status, EntrantStatus::Accepted);
    scenario.then_counts(0, 0, 1);

    let again = scenario
        .when(|service, event_id| async move {
            service
                .respond_to_invite(event_id, user("a"), InviteResponse::Accept)
                .await
        })
        .await;
    assert!(matches!(again, Err(LotteryError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_waiting_entrant_cannot_accept() {
    let scenario = LotteryScenario::new(fixtures::event(None)).given_waiting(&["a"]);

    let result = scenario
        .when(|service, event_id| async move {
            service
                .respond_to_invite(event_id, user("a"), InviteResponse::Accept)
                .await
        })
        .await;

    assert!(matches!(result, Err(LotteryError::InvalidTransition { .. })));
    scenario.then_status("a", Some(EntrantStatus::Waiting));
}

#[tokio::test]
async fn test_accept_after_finalize_is_refused() {
    let event = fixtures::event(None).with_status(EventStatus::Finalized);
    let scenario = LotteryScenario::new(event).given_entrant("a", EntrantStatus::Invited);

    let result = scenario
        .when(|service, event_id| async move {
            service
                .respond_to_invite(event_id, user("a"), InviteResponse::Accept)
                .await
        })
        .await;

    match result {
        Err(LotteryError::EventNotOpen {
            user_id,
            transition: Some(Transition::Accept),
            ..
        }) => assert_eq!(user_id, Some(user("a"))),
        other => panic!("expected EventNotOpen, got {other:?}"),
    }
    scenario.then_status("a", Some(EntrantStatus::Invited));
}

#[tokio::test]
async fn test_accepting_twice_after_finalize_is_invalid_transition() {
    let event = fixtures::event(None).with_status(EventStatus::Finalized);
    let scenario = LotteryScenario::new(event).given_entrant("a", EntrantStatus::Accepted);

    let result = scenario
        .when(|service, event_id| async move {
            service
                .respond_to_invite(event_id, user("a"), InviteResponse::Accept)
                .await
        })
        .await;

    assert!(matches!(
        result,
        Err(LotteryError::InvalidTransition {
            from: EntrantStatus::Accepted,
            transition: Transition::Accept,
            ..
        })
    ));
    scenario.then_status("a", Some(EntrantStatus::Accepted));
}

#[tokio::test]
async fn test_decline_frees_place_without_redraw() {
    let scenario = LotteryScenario::new(fixtures::event(Some(1)))
        .given_entrant("a", EntrantStatus::Invited)
        .given_waiting(&["b"]);

    scenario
        .when(|service, event_id| async move {
            service
                .respond_to_invite(event_id, user("a"), InviteResponse::Decline)
                .await
        })
        .await
        .unwrap();

    scenario
        .then_status("a", Some(EntrantStatus::Declined))
        .then_status("b", Some(EntrantStatus::Waiting))
        .then_notifications(NotificationKind::Invite, 0);

    let summary = scenario
        .when(|service, event_id| async move { service.summary(event_id).await })
        .await
        .unwrap();
    assert!(summary.can_run_draw());
}

// ============================================================================
// Organizer actions
// ============================================================================

#[tokio::test]
async fn test_cancel_invite_returns_entrant_to_waiting() {
    let scenario = LotteryScenario::new(fixtures::event(Some(2))).given_entrant("a", EntrantStatus::Invited);

    let entrant = scenario
        .when(|service, event_id| async move { service.cancel_invite(event_id, user("a")).await })
        .await
        .unwrap();

    assert_eq!(entrant.status, EntrantStatus::Waiting);
    scenario
        .then_status("a", Some(EntrantStatus::Waiting))
        .then_notifications(NotificationKind::Withdrawal, 1);
    assert_eq!(scenario.sink().messages().len(), 1);
}

#[tokio::test]
async fn test_cancel_invite_on_waiting_entrant() {
    let scenario = LotteryScenario::new(fixtures::event(None)).given_waiting(&["a"]);

    let result = scenario
        .when(|service, event_id| async move { service.cancel_invite(event_id, user("a")).await })
        .await;

    assert!(matches!(result, Err(LotteryError::InvalidTransition { .. })));
    scenario.then_notifications(NotificationKind::Withdrawal, 0);
}

#[tokio::test]
async fn test_cancel_accepted_entrant() {
    let scenario = LotteryScenario::new(fixtures::event(Some(1))).given_entrant("a", EntrantStatus::Accepted);

    scenario
        .when(|service, event_id| async move { service.cancel_entrant(event_id, user("a")).await })
        .await
        .unwrap();

    scenario
        .then_status("a", Some(EntrantStatus::Cancelled))
        .then_counts(0, 0, 0)
        .then_notifications(NotificationKind::Withdrawal, 1);
    assert!(scenario.sink().messages()[0].body.contains("cancelled"));
}

#[tokio::test]
async fn test_revert_draw_returns_invitees() {
    let scenario = LotteryScenario::new(fixtures::event(Some(2))).given_waiting(&["a", "b", "c"]);

    scenario
        .when(|service, event_id| async move { service.run_draw(event_id, 2).await })
        .await
        .unwrap();
    let reverted = scenario
        .when(|service, event_id| async move { service.revert_draw(event_id).await })
        .await
        .unwrap();

    assert_eq!(reverted, 2);
    scenario
        .then_counts(3, 0, 0)
        .then_notifications(NotificationKind::Invite, 2)
        .then_notifications(NotificationKind::Withdrawal, 2);

    let nothing = scenario
        .when(|service, event_id| async move { service.revert_draw(event_id).await })
        .await
        .unwrap();
    assert_eq!(nothing, 0);
}

#[tokio::test]
async fn test_revert_draw_on_closed_event_is_refused() {
    let event = fixtures::event(Some(2)).with_status(EventStatus::Finalized);
    let scenario = LotteryScenario::new(event)
        .given_entrant("a", EntrantStatus::Invited)
        .given_waiting(&["b"]);
    let before = scenario.store().current_revision(scenario.event_id());

    let result = scenario
        .when(|service, event_id| async move { service.revert_draw(event_id).await })
        .await;

    assert!(matches!(
        result,
        Err(LotteryError::EventNotOpen {
            status: EventStatus::Finalized,
            transition: Some(Transition::Withdraw),
            ..
        })
    ));
    scenario
        .then_status("a", Some(EntrantStatus::Invited))
        .then_counts(1, 1, 0);
    assert!(scenario.sink().messages().is_empty());
    assert_eq!(scenario.store().current_revision(scenario.event_id()), before);
}

#[tokio::test]
async fn test_apply_refuses_commit_beyond_capacity() {
    let scenario = LotteryScenario::new(fixtures::event(Some(1)))
        .given_entrant("a", EntrantStatus::Accepted)
        .given_waiting(&["b"]);
    let dispatcher = NotificationDispatcher::new(Arc::new(scenario.sink().clone()), Arc::new(test_clock()))
        .with_mode(DispatchMode::Inline);
    let lifecycle = LifecycleManager::new(
        Arc::new(scenario.store().clone()),
        dispatcher,
        Arc::new(test_clock()),
    );
    let event_id = scenario.event_id();
    let before = scenario.store().current_revision(event_id);

    let result = lifecycle
        .apply(event_id, user("b"), Transition::Invite, Actor::Draw)
        .await;

    match result {
        Err(LotteryError::CapacityExceeded {
            user_id,
            capacity,
            committed,
            requested,
            ..
        }) => {
            assert_eq!(user_id, Some(user("b")));
            assert_eq!((capacity, committed, requested), (1, 1, 1));
        },
        other => panic!("expected CapacityExceeded, got {other:?}"),
    }
    scenario
        .then_status("b", Some(EntrantStatus::Waiting))
        .then_counts(1, 0, 1);
    assert_eq!(scenario.store().current_revision(event_id), before);
}

#[tokio::test]
async fn test_finalize_event() {
    let scenario = LotteryScenario::new(fixtures::event(Some(2))).given_waiting(&["a"]);

    let stranger = scenario
        .when(|service, event_id| async move { service.finalize_event(event_id, user("a")).await })
        .await;
    assert!(matches!(stranger, Err(LotteryError::InvalidRequest { .. })));

    let event = scenario
        .when(|service, event_id| async move {
            service.finalize_event(event_id, fixtures::organizer()).await
        })
        .await
        .unwrap();
    assert_eq!(event.status, EventStatus::Finalized);
    assert_eq!(
        scenario.store().event(scenario.event_id()).unwrap().status,
        EventStatus::Finalized
    );

    let twice = scenario
        .when(|service, event_id| async move {
            service.finalize_event(event_id, fixtures::organizer()).await
        })
        .await;
    assert!(matches!(twice, Err(LotteryError::EventNotOpen { .. })));

    let draw = scenario
        .when(|service, event_id| async move { service.run_draw(event_id, 1).await })
        .await;
    assert!(matches!(draw, Err(LotteryError::EventNotOpen { .. })));
}

#[tokio::test]
async fn test_notify_entrants_by_status() {
    let scenario = LotteryScenario::new(fixtures::event(None))
        .given_waiting(&["a", "b"])
        .given_entrant("c", EntrantStatus::Invited);

    let sent = scenario
        .when(|service, event_id| async move {
            service
                .notify_entrants(event_id, EntrantStatus::Waiting, fixtures::organizer(), "Pool opens at 9")
                .await
        })
        .await
        .unwrap();

    assert_eq!(sent, 2);
    scenario.then_notifications(NotificationKind::Custom, 2);
    assert!(scenario.sink().messages_for("c").is_empty());
    assert!(scenario.sink().messages_for("a")[0].body.ends_with("Pool opens at 9"));
}

#[tokio::test]
async fn test_notify_entrants_rejects_bad_requests() {
    let scenario = LotteryScenario::new(fixtures::event(None)).given_waiting(&["a"]);

    let empty = scenario
        .when(|service, event_id| async move {
            service
                .notify_entrants(event_id, EntrantStatus::Waiting, fixtures::organizer(), "  ")
                .await
        })
        .await;
    assert!(matches!(empty, Err(LotteryError::InvalidRequest { .. })));

    let stranger = scenario
        .when(|service, event_id| async move {
            service
                .notify_entrants(event_id, EntrantStatus::Waiting, user("a"), "hello")
                .await
        })
        .await;
    assert!(matches!(stranger, Err(LotteryError::InvalidRequest { .. })));
    assert!(scenario.sink().messages().is_empty());
}

#[tokio::test]
async fn test_summary_reports_places() {
    let scenario = LotteryScenario::new(fixtures::event(Some(4)))
        .given_waiting(&["a", "b", "c"])
        .given_entrant("d", EntrantStatus::Invited)
        .given_entrant("e", EntrantStatus::Accepted)
        .given_entrant("f", EntrantStatus::Declined);

    let summary = scenario
        .when(|service, event_id| async move { service.summary(event_id).await })
        .await
        .unwrap();

    assert_eq!(summary.waiting_list_size(), 3);
    assert_eq!(summary.selected_count(), 2);
    assert_eq!(summary.remaining, lottery_core::RemainingCapacity::Limited(2));
    assert!(summary.can_run_draw());
}
