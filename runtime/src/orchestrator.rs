//! Draw coordination.
//!
//! A draw reads the event's revision, then the event, the waiting list and
//! the capacity counts; selects winners; and writes every `waiting → invited`
//! change as one batch conditioned on that revision. If anything else wrote
//! to the event in between, the batch is rejected whole and the draw reports
//! [`LotteryError::Conflict`]. Two draws, or a draw and an accept, can never
//! both spend the same remaining capacity.
//!
//! Draws and reverts run on their own task. Dropping the caller's future does
//! not stop them between the commit and the notification hand-off.

use crate::capacity::CapacityAccountant;
use crate::dispatcher::{NotificationDispatcher, WithdrawalReason};
use crate::metrics::{DrawMetrics, DrawOutcome, TransitionMetrics};
use crate::selector::{DrawSelector, RngSource, Selection};
use lottery_core::environment::Clock;
use lottery_core::{
    DrawRequest, DrawResult, EntrantRepository, EntrantStatus, Event, EventId, EventStatus,
    LotteryError, RemainingCapacity, RepositoryError, Transition, UserId,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Coordinates draws and other event-wide operations.
#[derive(Clone)]
pub struct DrawOrchestrator {
    repository: Arc<dyn EntrantRepository>,
    accountant: CapacityAccountant,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    rng: Arc<RngSource>,
    max_draw_size: u32,
}

impl DrawOrchestrator {
    /// Create an orchestrator.
    ///
    /// `max_draw_size` bounds a single request; larger requests are rejected
    /// as invalid rather than clamped.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EntrantRepository>,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        rng: RngSource,
        max_draw_size: u32,
    ) -> Self {
        Self {
            accountant: CapacityAccountant::new(Arc::clone(&repository)),
            repository,
            dispatcher,
            clock,
            rng: Arc::new(rng),
            max_draw_size,
        }
    }

    /// Draw up to `request.requested` waiting entrants into `invited`.
    ///
    /// The number of winners is `min(requested, waiting, remaining capacity)`.
    /// A draw that finds no place left returns a result with no winners.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: zero, negative or oversized request (nothing is read)
    /// - `NotFound`: no such event
    /// - `EventNotOpen`: the event is finalized or cancelled
    /// - `EmptyWaitlist`: nobody to draw from (zero-effect)
    /// - `Conflict`: the event changed during the draw; nothing was written
    /// - `DataUnavailable`: the store failed; nothing was written
    /// - `Interrupted`: the draw task ended abnormally
    #[tracing::instrument(
        skip_all,
        fields(event_id = %request.event_id, requested = request.requested),
        name = "run_draw"
    )]
    pub async fn run_draw(&self, request: DrawRequest) -> Result<DrawResult, LotteryError> {
        let event_id = request.event_id;
        let requested = request.validated_count(self.max_draw_size).inspect_err(|error| {
            tracing::debug!(%error, "Draw request rejected");
        })?;

        let this = self.clone();
        run_detached(event_id, async move {
            let started = Instant::now();
            let result = this.draw(event_id, requested).await;
            let (outcome, winners) = match &result {
                Ok(drawn) if drawn.is_empty() => (DrawOutcome::Empty, 0),
                Ok(drawn) => (DrawOutcome::Committed, drawn.actual_count),
                Err(LotteryError::EmptyWaitlist { .. }) => (DrawOutcome::Empty, 0),
                Err(LotteryError::Conflict { .. }) => (DrawOutcome::Conflict, 0),
                Err(_) => (DrawOutcome::Failed, 0),
            };
            DrawMetrics::record_draw(outcome, winners, started.elapsed());
            result
        })
        .await
    }

    async fn draw(&self, event_id: EventId, requested: usize) -> Result<DrawResult, LotteryError> {
        let store_error =
            |e: RepositoryError| LotteryError::from_repository(event_id, None, Some(Transition::Invite))(e);

        let revision = self.repository.revision(event_id).await.map_err(store_error)?;
        let event = self.repository.get_event(event_id).await.map_err(store_error)?;
        if !event.is_open() {
            return Err(LotteryError::EventNotOpen {
                event_id,
                user_id: None,
                status: event.status,
                transition: Some(Transition::Invite),
            });
        }

        let waiting = self
            .repository
            .list_by_status(event_id, EntrantStatus::Waiting)
            .await
            .map_err(store_error)?;
        if waiting.is_empty() {
            tracing::info!("No entrants are waiting; nothing to draw");
            return Err(LotteryError::EmptyWaitlist { event_id });
        }

        let counts = self.accountant.counts(event_id).await?;
        let remaining = RemainingCapacity::from_capacity(event.capacity, &counts);
        let waiting_count = waiting.len();
        let candidates: Vec<UserId> = waiting.into_iter().map(|entrant| entrant.user_id).collect();

        let mut rng = self.rng.next_rng();
        let selection = DrawSelector::select(&mut rng, candidates, requested, remaining).map_err(
            |error| LotteryError::InvalidRequest {
                event_id,
                user_id: None,
                reason: error.to_string(),
            },
        )?;

        let winners = match selection {
            Selection::Winners(winners) => winners,
            Selection::EmptySelection => {
                tracing::info!(%remaining, waiting = waiting_count, "No places remain; nobody drawn");
                return Ok(DrawResult::new(
                    event_id,
                    Vec::new(),
                    requested,
                    waiting_count,
                    remaining,
                    self.clock.now(),
                ));
            },
        };

        let additional = u32::try_from(winners.len()).unwrap_or(u32::MAX);
        CapacityAccountant::ensure_room(event_id, event.capacity, &counts, additional, None)?;

        if let Err(e) = self
            .repository
            .batch_update_status(
                event_id,
                winners.clone(),
                EntrantStatus::Waiting,
                EntrantStatus::Invited,
                Some(revision),
            )
            .await
        {
            let error = store_error(e);
            if matches!(error, LotteryError::Conflict { .. }) {
                TransitionMetrics::record_conflict("run_draw");
                tracing::warn!(%revision, "Event changed during draw; nothing written");
            }
            return Err(error);
        }

        TransitionMetrics::record_transition(Transition::Invite, winners.len());
        tracing::info!(
            requested,
            actual = winners.len(),
            waiting = waiting_count,
            %remaining,
            "Draw committed"
        );

        let invites = winners
            .iter()
            .map(|winner| self.dispatcher.compose_invite(&event, winner.clone()))
            .collect();
        self.dispatcher.dispatch_all(invites).await;

        Ok(DrawResult::new(
            event_id,
            winners,
            requested,
            waiting_count,
            remaining,
            self.clock.now(),
        ))
    }

    /// Return every invited entrant to the waiting list in one batch.
    ///
    /// Each reverted entrant receives a withdrawal notification. Returns how
    /// many were reverted; zero when nobody was invited.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event
    /// - `EventNotOpen`: the event is finalized or cancelled
    /// - `Conflict`: the event changed during the revert; nothing was written
    /// - `DataUnavailable`: the store failed
    /// - `Interrupted`: the revert task ended abnormally
    #[tracing::instrument(skip_all, fields(event_id = %event_id), name = "revert_draw")]
    pub async fn revert_draw(&self, event_id: EventId) -> Result<usize, LotteryError> {
        let this = self.clone();
        run_detached(event_id, async move { this.revert(event_id).await }).await
    }

    async fn revert(&self, event_id: EventId) -> Result<usize, LotteryError> {
        let store_error =
            |e: RepositoryError| LotteryError::from_repository(event_id, None, Some(Transition::Withdraw))(e);

        let revision = self.repository.revision(event_id).await.map_err(store_error)?;
        let event = self.repository.get_event(event_id).await.map_err(store_error)?;
        if !event.is_open() {
            return Err(LotteryError::EventNotOpen {
                event_id,
                user_id: None,
                status: event.status,
                transition: Some(Transition::Withdraw),
            });
        }
        let invited: Vec<UserId> = self
            .repository
            .list_by_status(event_id, EntrantStatus::Invited)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(|entrant| entrant.user_id)
            .collect();

        if invited.is_empty() {
            tracing::info!("No invited entrants; nothing to revert");
            return Ok(0);
        }

        if let Err(e) = self
            .repository
            .batch_update_status(
                event_id,
                invited.clone(),
                EntrantStatus::Invited,
                EntrantStatus::Waiting,
                Some(revision),
            )
            .await
        {
            let error = store_error(e);
            if matches!(error, LotteryError::Conflict { .. }) {
                TransitionMetrics::record_conflict("revert_draw");
                tracing::warn!(%revision, "Event changed during revert; nothing written");
            }
            return Err(error);
        }

        TransitionMetrics::record_transition(Transition::Withdraw, invited.len());
        tracing::info!(reverted = invited.len(), "Draw reverted");

        let count = invited.len();
        let withdrawals = invited
            .into_iter()
            .map(|user| {
                self.dispatcher
                    .compose_withdrawal(&event, user, WithdrawalReason::Withdrawn)
            })
            .collect();
        self.dispatcher.dispatch_all(withdrawals).await;

        Ok(count)
    }

    /// Close an open event. Only its organizer may do this.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event
    /// - `InvalidRequest`: `organizer_id` does not own the event
    /// - `EventNotOpen`: already finalized or cancelled
    /// - `Conflict`: the event changed meanwhile
    /// - `DataUnavailable`: the store failed
    #[tracing::instrument(skip_all, fields(event_id = %event_id, organizer_id = %organizer_id), name = "finalize_event")]
    pub async fn finalize_event(
        &self,
        event_id: EventId,
        organizer_id: UserId,
    ) -> Result<Event, LotteryError> {
        let store_error = |e: RepositoryError| LotteryError::from_repository(event_id, None, None)(e);

        let revision = self.repository.revision(event_id).await.map_err(store_error)?;
        let event = self.repository.get_event(event_id).await.map_err(store_error)?;

        if event.organizer_id != organizer_id {
            tracing::debug!(owner = %event.organizer_id, "Finalize refused for non-organizer");
            return Err(LotteryError::InvalidRequest {
                event_id,
                user_id: Some(organizer_id.clone()),
                reason: format!("user {organizer_id} is not the organizer of this event"),
            });
        }
        if !event.is_open() {
            return Err(LotteryError::EventNotOpen {
                event_id,
                user_id: None,
                status: event.status,
                transition: None,
            });
        }

        if let Err(e) = self
            .repository
            .set_event_status(event_id, EventStatus::Finalized, Some(revision))
            .await
        {
            let error = store_error(e);
            if matches!(error, LotteryError::Conflict { .. }) {
                TransitionMetrics::record_conflict("finalize_event");
            }
            return Err(error);
        }

        tracing::info!("Event finalized");
        Ok(event.with_status(EventStatus::Finalized))
    }

    /// Send an organizer message to every entrant currently in `status`.
    ///
    /// Returns how many messages were handed off.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: empty text, or `sender_id` does not own the event
    /// - `NotFound`: no such event
    /// - `DataUnavailable`: the store failed
    #[tracing::instrument(skip_all, fields(event_id = %event_id, status = %status), name = "notify_entrants")]
    pub async fn notify_entrants(
        &self,
        event_id: EventId,
        status: EntrantStatus,
        sender_id: UserId,
        text: &str,
    ) -> Result<usize, LotteryError> {
        if text.trim().is_empty() {
            return Err(LotteryError::InvalidRequest {
                event_id,
                user_id: Some(sender_id.clone()),
                reason: "message text is empty".to_string(),
            });
        }

        let store_error = |e: RepositoryError| LotteryError::from_repository(event_id, None, None)(e);
        let event = self.repository.get_event(event_id).await.map_err(store_error)?;
        if event.organizer_id != sender_id {
            return Err(LotteryError::InvalidRequest {
                event_id,
                user_id: Some(sender_id.clone()),
                reason: format!("user {sender_id} is not the organizer of this event"),
            });
        }

        let recipients = self
            .repository
            .list_by_status(event_id, status)
            .await
            .map_err(store_error)?;
        let count = recipients.len();
        let messages = recipients
            .into_iter()
            .map(|entrant| {
                self.dispatcher
                    .compose_custom(&event, entrant.user_id, sender_id.clone(), text)
            })
            .collect();
        self.dispatcher.dispatch_all(messages).await;

        tracing::info!(recipients = count, "Organizer message dispatched");
        Ok(count)
    }
}

/// Run `task` on its own tokio task so the caller going away cannot stop it.
async fn run_detached<T, F>(event_id: EventId, task: F) -> Result<T, LotteryError>
where
    F: Future<Output = Result<T, LotteryError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(task.in_current_span())
        .await
        .map_err(|e| LotteryError::Interrupted {
            event_id,
            reason: e.to_string(),
        })?
}
