//! Single-entrant lifecycle.
//!
//! ```text
//!   waiting ──invite (draw)──▶ invited ──accept──▶ accepted
//!                                 │
//!                                 └──decline──▶ declined
//!
//!   invited | accepted                      ──cancel──▶   cancelled
//!   invited | accepted | declined | cancelled ──withdraw──▶ waiting
//!   waiting ──leave──▶ (record deleted)
//! ```
//!
//! Every write is checked in the same order: the event exists, the transition
//! is allowed from the entrant's current status for the requesting actor, and
//! (for transitions that commit a place) capacity still has room. The write
//! itself is conditioned on the status read, so a concurrent change shows up
//! as [`LotteryError::Conflict`] instead of being overwritten.

use crate::capacity::CapacityAccountant;
use crate::dispatcher::{NotificationDispatcher, WithdrawalReason};
use crate::metrics::TransitionMetrics;
use lottery_core::environment::Clock;
use lottery_core::{
    Actor, Entrant, EntrantRepository, EntrantStatus, EventId, GeoPoint, LotteryError,
    RepositoryError, Transition, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What an allowed transition does to the entrant record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The record moves to this status
    MoveTo(EntrantStatus),
    /// The record is deleted
    Remove,
}

/// Looks up `(transition, from, actor)` in the transition table.
///
/// Total over its inputs: every combination either resolves or is refused
/// with `None`.
///
/// ```
/// use lottery_core::{Actor, EntrantStatus, Transition};
/// use lottery_runtime::lifecycle::{Resolution, resolve};
///
/// assert_eq!(
///     resolve(Transition::Accept, EntrantStatus::Invited, Actor::Entrant),
///     Some(Resolution::MoveTo(EntrantStatus::Accepted))
/// );
/// assert_eq!(resolve(Transition::Invite, EntrantStatus::Waiting, Actor::Entrant), None);
/// ```
#[must_use]
pub fn resolve(transition: Transition, from: EntrantStatus, actor: Actor) -> Option<Resolution> {
    if actor != transition.actor() || !transition.sources().contains(&from) {
        return None;
    }
    Some(transition.target().map_or(Resolution::Remove, Resolution::MoveTo))
}

/// An invitee's answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteResponse {
    /// Take the place
    Accept,
    /// Give the place up
    Decline,
}

impl InviteResponse {
    /// The transition this answer requests
    #[must_use]
    pub const fn transition(self) -> Transition {
        match self {
            Self::Accept => Transition::Accept,
            Self::Decline => Transition::Decline,
        }
    }
}

/// Details supplied when joining a waiting list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Name shown to the organizer; `"Anonymous"` when absent
    pub display_name: Option<String>,
    /// Location, required by events with geolocation on
    pub location: Option<GeoPoint>,
}

impl JoinRequest {
    /// A request with a display name
    #[must_use]
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            location: None,
        }
    }

    /// Attach a location
    #[must_use]
    pub fn at(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}

/// Validates and applies single-entrant transitions.
#[derive(Clone)]
pub struct LifecycleManager {
    repository: Arc<dyn EntrantRepository>,
    accountant: CapacityAccountant,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
}

impl LifecycleManager {
    /// Create a manager over `repository`, notifying through `dispatcher`.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EntrantRepository>,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accountant: CapacityAccountant::new(Arc::clone(&repository)),
            repository,
            dispatcher,
            clock,
        }
    }

    /// Add a user to an event's waiting list.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event
    /// - `EventNotOpen`: the event is finalized or cancelled
    /// - `RegistrationClosed`: outside the registration window
    /// - `InvalidRequest`: the organizer joining, or a missing or invalid location
    /// - `AlreadyJoined`: the user already has a record for this event
    /// - `WaitlistFull`: the waiting list is at its limit
    /// - `Conflict`: another join took the last slot first
    /// - `DataUnavailable`: the store failed
    pub async fn join(
        &self,
        event_id: EventId,
        user_id: UserId,
        request: JoinRequest,
    ) -> Result<Entrant, LotteryError> {
        let event = self
            .repository
            .get_event(event_id)
            .await
            .map_err(LotteryError::from_repository(event_id, None, None))?;

        if !event.is_open() {
            return Err(LotteryError::EventNotOpen {
                event_id,
                user_id: Some(user_id.clone()),
                status: event.status,
                transition: None,
            });
        }

        let now = self.clock.now();
        if !event.is_registration_open(now) {
            tracing::debug!(%event_id, %user_id, %now, "Join outside registration window");
            return Err(LotteryError::RegistrationClosed { event_id, user_id });
        }

        if user_id == event.organizer_id {
            return Err(LotteryError::InvalidRequest {
                event_id,
                user_id: Some(user_id.clone()),
                reason: "organizers cannot join their own event".to_string(),
            });
        }

        match request.location {
            Some(location) if !location.is_valid() => {
                return Err(LotteryError::InvalidRequest {
                    event_id,
                    user_id: Some(user_id.clone()),
                    reason: format!(
                        "location ({}, {}) is out of range",
                        location.latitude, location.longitude
                    ),
                });
            },
            None if event.geolocation_required => {
                return Err(LotteryError::InvalidRequest {
                    event_id,
                    user_id: Some(user_id.clone()),
                    reason: "this event requires a location to join".to_string(),
                });
            },
            _ => {},
        }

        match self.repository.get(event_id, user_id.clone()).await {
            Ok(_) => return Err(LotteryError::AlreadyJoined { event_id, user_id }),
            Err(RepositoryError::NotFound) => {},
            Err(e) => return Err(LotteryError::from_repository(event_id, Some(&user_id), None)(e)),
        }

        // The limit check and the insert must see the same waiting list.
        let expected_revision = match event.waiting_list_limit {
            Some(limit) => {
                let revision = self
                    .repository
                    .revision(event_id)
                    .await
                    .map_err(LotteryError::from_repository(event_id, Some(&user_id), None))?;
                let waiting = self
                    .repository
                    .aggregate_count(event_id, EntrantStatus::Waiting)
                    .await
                    .map_err(LotteryError::from_repository(event_id, Some(&user_id), None))?;
                if waiting >= limit {
                    return Err(LotteryError::WaitlistFull {
                        event_id,
                        user_id,
                        limit,
                    });
                }
                Some(revision)
            },
            None => None,
        };

        let mut entrant = Entrant::waiting(event_id, user_id.clone(), now);
        if let Some(name) = request.display_name.filter(|name| !name.trim().is_empty()) {
            entrant = entrant.with_display_name(name);
        }
        if let Some(location) = request.location {
            entrant = entrant.with_location(location);
        }

        if let Err(e) = self.repository.put(entrant.clone(), expected_revision).await {
            let error = LotteryError::from_repository(event_id, Some(&user_id), None)(e);
            if matches!(error, LotteryError::Conflict { .. }) {
                TransitionMetrics::record_conflict("join");
                tracing::warn!(%event_id, %user_id, "Join lost a race for the waiting list");
            }
            return Err(error);
        }

        tracing::info!(%event_id, %user_id, "Entrant joined waiting list");
        Ok(entrant)
    }

    /// Remove a waiting user from the list. Deletes the record.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event or entrant (including a second leave)
    /// - `InvalidTransition`: the entrant is no longer waiting
    /// - `Conflict`, `DataUnavailable`: see [`apply`](Self::apply)
    pub async fn leave(&self, event_id: EventId, user_id: UserId) -> Result<(), LotteryError> {
        self.apply(event_id, user_id, Transition::Leave, Actor::Entrant)
            .await
            .map(|_| ())
    }

    /// Accept or decline an invitation.
    ///
    /// Accepting needs the event to be open. Declining frees the place but
    /// does not start another draw.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event or entrant
    /// - `EventNotOpen`: accepting on a finalized or cancelled event
    /// - `InvalidTransition`: the entrant is not invited
    /// - `Conflict`, `DataUnavailable`: see [`apply`](Self::apply)
    pub async fn respond(
        &self,
        event_id: EventId,
        user_id: UserId,
        response: InviteResponse,
    ) -> Result<Entrant, LotteryError> {
        self.apply(event_id, user_id.clone(), response.transition(), Actor::Entrant)
            .await?
            .ok_or_else(|| LotteryError::NotFound {
                event_id,
                user_id: Some(user_id),
            })
    }

    /// Organizer withdraws an entrant's invitation, returning them to the waiting list.
    ///
    /// The entrant receives a withdrawal notification.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event or entrant
    /// - `InvalidTransition`: the entrant is already waiting
    /// - `Conflict`, `DataUnavailable`: see [`apply`](Self::apply)
    pub async fn withdraw(&self, event_id: EventId, user_id: UserId) -> Result<Entrant, LotteryError> {
        self.apply(event_id, user_id.clone(), Transition::Withdraw, Actor::Organizer)
            .await?
            .ok_or_else(|| LotteryError::NotFound {
                event_id,
                user_id: Some(user_id),
            })
    }

    /// Organizer cancels an invited or accepted entrant's place.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event or entrant
    /// - `InvalidTransition`: the entrant holds no place
    /// - `Conflict`, `DataUnavailable`: see [`apply`](Self::apply)
    pub async fn cancel(&self, event_id: EventId, user_id: UserId) -> Result<Entrant, LotteryError> {
        self.apply(event_id, user_id.clone(), Transition::Cancel, Actor::Organizer)
            .await?
            .ok_or_else(|| LotteryError::NotFound {
                event_id,
                user_id: Some(user_id),
            })
    }

    /// Validate and commit one transition for one entrant.
    ///
    /// Returns the updated entrant, or `None` when the record was deleted.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event or entrant
    /// - `EventNotOpen`: accepting on a closed event
    /// - `InvalidTransition`: not allowed from the current status or for `actor`
    /// - `CapacityExceeded`: the transition would commit a place that is not there
    /// - `Conflict`: the entrant or event changed between read and write
    /// - `DataUnavailable`: the store failed
    #[tracing::instrument(
        skip_all,
        fields(event_id = %event_id, user_id = %user_id, transition = %transition),
        name = "lifecycle_apply"
    )]
    pub async fn apply(
        &self,
        event_id: EventId,
        user_id: UserId,
        transition: Transition,
        actor: Actor,
    ) -> Result<Option<Entrant>, LotteryError> {
        let event = self
            .repository
            .get_event(event_id)
            .await
            .map_err(LotteryError::from_repository(event_id, None, Some(transition)))?;

        let entrant = self
            .repository
            .get(event_id, user_id.clone())
            .await
            .map_err(LotteryError::from_repository(event_id, Some(&user_id), Some(transition)))?;
        let from = entrant.status;

        let Some(resolution) = resolve(transition, from, actor) else {
            tracing::debug!(%from, %transition, %actor, "Transition refused by table");
            return Err(LotteryError::InvalidTransition {
                event_id,
                user_id,
                from,
                transition,
                actor,
            });
        };

        if transition == Transition::Accept && !event.is_open() {
            return Err(LotteryError::EventNotOpen {
                event_id,
                user_id: Some(user_id),
                status: event.status,
                transition: Some(transition),
            });
        }

        let written = match resolution {
            Resolution::Remove => self
                .repository
                .delete(event_id, user_id.clone(), from)
                .await
                .map(|_| None),
            Resolution::MoveTo(target) => {
                let expected_revision = if target.is_committed() && !from.is_committed() {
                    let summary = self.accountant.summary(event_id).await?;
                    CapacityAccountant::ensure_room(
                        event_id,
                        summary.capacity,
                        &summary.counts,
                        1,
                        Some(&user_id),
                    )?;
                    Some(summary.revision)
                } else {
                    None
                };
                self.repository
                    .update_status(event_id, user_id.clone(), from, target, expected_revision)
                    .await
                    .map(|_| Some(entrant.clone().with_status(target)))
            },
        };

        let updated = match written {
            Ok(updated) => updated,
            Err(e) => {
                let error =
                    LotteryError::from_repository(event_id, Some(&user_id), Some(transition))(e);
                if matches!(error, LotteryError::Conflict { .. }) {
                    TransitionMetrics::record_conflict(transition.as_str());
                    tracing::warn!(%from, %transition, "Entrant changed concurrently, nothing written");
                }
                return Err(error);
            },
        };

        TransitionMetrics::record_transition(transition, 1);
        tracing::info!(%from, %transition, %actor, "Transition committed");

        let reason = match transition {
            Transition::Withdraw => Some(WithdrawalReason::Withdrawn),
            Transition::Cancel => Some(WithdrawalReason::Cancelled),
            _ => None,
        };
        if let Some(reason) = reason {
            let message = self.dispatcher.compose_withdrawal(&event, user_id, reason);
            self.dispatcher.dispatch(message).await;
        }

        Ok(updated)
    }
}
