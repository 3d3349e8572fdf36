//! Waitlist lottery demo.
//!
//! Creates an event with a handful of places, fills its waiting list, runs a
//! draw, lets some invitees respond, redraws for the freed places and prints
//! the Prometheus metrics the run produced.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=lottery=debug LOTTERY_DRAW_SEED=7 cargo run -p lottery-demo
//! ```
//!
//! Configuration comes from the `LOTTERY_*` and `METRICS_*` environment
//! variables; see [`LotteryConfig::from_env`].

#![allow(missing_docs)]

use anyhow::Context;
use lottery_core::{EntrantStatus, Event, UserId};
use lottery_runtime::dispatcher::TracingNotificationSink;
use lottery_runtime::metrics::MetricsServer;
use lottery_runtime::retry::{RetryPolicy, retry_retryable};
use lottery_runtime::{InviteResponse, JoinRequest, LotteryConfig, LotteryService};
use lottery_testing::InMemoryEntrantRepository;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PLACES: u32 = 4;
const APPLICANTS: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lottery=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = LotteryConfig::from_env();
    tracing::info!(?config, "Starting lottery demo");

    let metrics_addr = config
        .metrics
        .addr()
        .context("METRICS_HOST/METRICS_PORT do not form a socket address")?;
    let mut metrics = MetricsServer::new(metrics_addr);
    metrics.start()?;

    let store = InMemoryEntrantRepository::new();
    let organizer = UserId::new("organizer");
    let event = Event::new("Beginner Swim Lessons", organizer.clone()).with_capacity(PLACES);
    event.validate()?;
    let event_id = store.insert_event(event);

    let service = LotteryService::new(Arc::new(store.clone()), Arc::new(TracingNotificationSink), &config);

    // Fill the waiting list
    for i in 0..APPLICANTS {
        let user = UserId::new(format!("swimmer-{i}"));
        service
            .join_waitlist(event_id, user, JoinRequest::named(format!("Swimmer {i}")))
            .await?;
    }

    let policy = RetryPolicy::default();
    let drawn = retry_retryable(policy.clone(), || service.run_draw(event_id, i64::from(PLACES))).await?;
    tracing::info!(winners = ?drawn.winners, "First draw");

    // The first winner accepts, the second declines; the rest stay invited
    let mut winners = drawn.winners.into_iter();
    if let Some(first) = winners.next() {
        service
            .respond_to_invite(event_id, first, InviteResponse::Accept)
            .await?;
    }
    if let Some(second) = winners.next() {
        service
            .respond_to_invite(event_id, second, InviteResponse::Decline)
            .await?;
    }

    let redraw = retry_retryable(policy, || service.run_draw(event_id, 1)).await?;
    tracing::info!(winners = ?redraw.winners, "Redraw for the declined place");

    service
        .notify_entrants(
            event_id,
            EntrantStatus::Waiting,
            organizer.clone(),
            "The first session is full. We will let you know if a place opens up.",
        )
        .await?;

    let summary = service.summary(event_id).await?;
    tracing::info!(
        waiting = summary.waiting_list_size(),
        selected = summary.selected_count(),
        remaining = %summary.remaining,
        "Before finalizing"
    );

    service.finalize_event(event_id, organizer).await?;

    if let Some(rendered) = metrics.render() {
        println!("{rendered}");
    }

    Ok(())
}
