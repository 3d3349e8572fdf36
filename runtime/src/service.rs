//! Caller-facing entry point.
//!
//! [`LotteryService`] wires the repository, notification sink, clock and
//! configuration into the lifecycle manager, the draw orchestrator and the
//! capacity accountant, and exposes every operation a caller can invoke.
//! Each call is independent and may run concurrently with any other.

use crate::capacity::{CapacityAccountant, CapacitySummary};
use crate::config::LotteryConfig;
use crate::dispatcher::NotificationDispatcher;
use crate::lifecycle::{InviteResponse, JoinRequest, LifecycleManager};
use crate::orchestrator::DrawOrchestrator;
use crate::selector::RngSource;
use lottery_core::environment::{Clock, SystemClock};
use lottery_core::{
    DrawRequest, DrawResult, Entrant, EntrantRepository, EntrantStatus, Event, EventId,
    LotteryError, NotificationSink, UserId,
};
use std::sync::Arc;

/// The waitlist lottery engine.
///
/// # Example
///
/// ```rust,no_run
/// use lottery_core::{EventId, UserId};
/// use lottery_runtime::{LotteryConfig, LotteryService};
/// use lottery_runtime::dispatcher::TracingNotificationSink;
/// use lottery_runtime::lifecycle::{InviteResponse, JoinRequest};
/// # use std::sync::Arc;
///
/// # async fn example(
/// #     repository: Arc<dyn lottery_core::EntrantRepository>,
/// #     event_id: EventId,
/// # ) -> Result<(), lottery_core::LotteryError> {
/// let service = LotteryService::new(
///     repository,
///     Arc::new(TracingNotificationSink),
///     &LotteryConfig::from_env(),
/// );
///
/// service.join_waitlist(event_id, UserId::new("ada"), JoinRequest::named("Ada")).await?;
/// let drawn = service.run_draw(event_id, 1).await?;
/// for winner in drawn.winners {
///     service.respond_to_invite(event_id, winner, InviteResponse::Accept).await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LotteryService {
    lifecycle: LifecycleManager,
    orchestrator: DrawOrchestrator,
    accountant: CapacityAccountant,
    clock: Arc<dyn Clock>,
}

impl LotteryService {
    /// Build a service on the system clock.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EntrantRepository>,
        sink: Arc<dyn NotificationSink>,
        config: &LotteryConfig,
    ) -> Self {
        Self::with_clock(repository, sink, Arc::new(SystemClock), config)
    }

    /// Build a service on an injected clock.
    #[must_use]
    pub fn with_clock(
        repository: Arc<dyn EntrantRepository>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: &LotteryConfig,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(sink, Arc::clone(&clock))
            .with_mode(config.notifications.mode)
            .with_timeout(config.notifications.timeout());
        let rng = config
            .draw
            .seed
            .map_or_else(RngSource::from_entropy, RngSource::seeded);

        Self {
            lifecycle: LifecycleManager::new(
                Arc::clone(&repository),
                dispatcher.clone(),
                Arc::clone(&clock),
            ),
            orchestrator: DrawOrchestrator::new(
                Arc::clone(&repository),
                dispatcher,
                Arc::clone(&clock),
                rng,
                config.draw.max_draw_size,
            ),
            accountant: CapacityAccountant::new(repository),
            clock,
        }
    }

    // ========================================================================
    // Entrant operations
    // ========================================================================

    /// Join an event's waiting list.
    ///
    /// # Errors
    ///
    /// See [`LifecycleManager::join`].
    pub async fn join_waitlist(
        &self,
        event_id: EventId,
        user_id: UserId,
        request: JoinRequest,
    ) -> Result<Entrant, LotteryError> {
        self.lifecycle.join(event_id, user_id, request).await
    }

    /// Leave an event's waiting list.
    ///
    /// # Errors
    ///
    /// See [`LifecycleManager::leave`]. Leaving twice yields `NotFound`.
    pub async fn leave_waitlist(&self, event_id: EventId, user_id: UserId) -> Result<(), LotteryError> {
        self.lifecycle.leave(event_id, user_id).await
    }

    /// Accept or decline an invitation.
    ///
    /// # Errors
    ///
    /// See [`LifecycleManager::respond`].
    pub async fn respond_to_invite(
        &self,
        event_id: EventId,
        user_id: UserId,
        response: InviteResponse,
    ) -> Result<Entrant, LotteryError> {
        self.lifecycle.respond(event_id, user_id, response).await
    }

    // ========================================================================
    // Organizer operations
    // ========================================================================

    /// Draw up to `requested` entrants.
    ///
    /// # Errors
    ///
    /// See [`DrawOrchestrator::run_draw`].
    pub async fn run_draw(&self, event_id: EventId, requested: i64) -> Result<DrawResult, LotteryError> {
        let request = DrawRequest::new(event_id, requested, self.clock.now());
        self.orchestrator.run_draw(request).await
    }

    /// Withdraw an entrant's invitation, returning them to the waiting list.
    ///
    /// # Errors
    ///
    /// See [`LifecycleManager::withdraw`].
    pub async fn cancel_invite(&self, event_id: EventId, user_id: UserId) -> Result<Entrant, LotteryError> {
        self.lifecycle.withdraw(event_id, user_id).await
    }

    /// Cancel an invited or accepted entrant's place.
    ///
    /// # Errors
    ///
    /// See [`LifecycleManager::cancel`].
    pub async fn cancel_entrant(&self, event_id: EventId, user_id: UserId) -> Result<Entrant, LotteryError> {
        self.lifecycle.cancel(event_id, user_id).await
    }

    /// Return every invited entrant to the waiting list.
    ///
    /// # Errors
    ///
    /// See [`DrawOrchestrator::revert_draw`].
    pub async fn revert_draw(&self, event_id: EventId) -> Result<usize, LotteryError> {
        self.orchestrator.revert_draw(event_id).await
    }

    /// Close the event.
    ///
    /// # Errors
    ///
    /// See [`DrawOrchestrator::finalize_event`].
    pub async fn finalize_event(&self, event_id: EventId, organizer_id: UserId) -> Result<Event, LotteryError> {
        self.orchestrator.finalize_event(event_id, organizer_id).await
    }

    /// Message every entrant in `status`.
    ///
    /// # Errors
    ///
    /// See [`DrawOrchestrator::notify_entrants`].
    pub async fn notify_entrants(
        &self,
        event_id: EventId,
        status: EntrantStatus,
        sender_id: UserId,
        text: &str,
    ) -> Result<usize, LotteryError> {
        self.orchestrator
            .notify_entrants(event_id, status, sender_id, text)
            .await
    }

    /// Waiting list size, selected count and places left.
    ///
    /// # Errors
    ///
    /// See [`CapacityAccountant::summary`].
    pub async fn summary(&self, event_id: EventId) -> Result<CapacitySummary, LotteryError> {
        self.accountant.summary(event_id).await
    }
}
