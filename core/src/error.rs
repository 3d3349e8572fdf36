//! Error taxonomy for engine operations.
//!
//! Every public operation either yields a concrete result or one of these
//! errors, carrying the event, the user (where one is involved) and the
//! attempted transition so the caller can explain what was refused.
//!
//! Classification:
//!
//! - **Surfaced, not retried**: `InvalidRequest`, `NotFound`, `InvalidTransition`,
//!   `EventNotOpen`, `RegistrationClosed`, `AlreadyJoined`, `WaitlistFull`
//! - **Retry with a smaller request**: `CapacityExceeded`
//! - **Zero-effect**: `EmptyWaitlist` (nothing to draw; not a failure of the engine)
//! - **Retryable**: `Conflict`, `DataUnavailable` (the retry policy is the caller's)
//! - **Logged only**: `NotificationDeliveryFailed`

use crate::notification::NotificationError;
use crate::repository::RepositoryError;
use crate::types::{Actor, EntrantStatus, EventId, EventStatus, Transition, UserId};
use thiserror::Error;

/// Errors returned by lifecycle, draw and notification operations.
#[derive(Error, Debug)]
pub enum LotteryError {
    /// Malformed input; surfaced immediately.
    #[error("Invalid request for event {event_id}{}: {reason}", describe_user(.user_id.as_ref()))]
    InvalidRequest {
        /// Event the request targeted
        event_id: EventId,
        /// User who made the request, if known
        user_id: Option<UserId>,
        /// What was wrong with it
        reason: String,
    },

    /// The event, or the user's entrant record, does not exist.
    #[error("Not found: event {event_id}{}", describe_user(.user_id.as_ref()))]
    NotFound {
        /// Event looked up
        event_id: EventId,
        /// Entrant looked up (`None` when the event itself is missing)
        user_id: Option<UserId>,
    },

    /// The transition is not allowed from the entrant's status, or not by this actor.
    #[error(
        "Cannot {transition} entrant {user_id} of event {event_id}: status is {from}, requested by {actor}"
    )]
    InvalidTransition {
        /// Event the entrant belongs to
        event_id: EventId,
        /// The entrant
        user_id: UserId,
        /// Status at validation time
        from: EntrantStatus,
        /// The refused transition
        transition: Transition,
        /// Who asked for it
        actor: Actor,
    },

    /// Committing would push `accepted + invited` over the event's capacity.
    #[error(
        "Capacity exceeded for event {event_id}: {committed} of {capacity} places committed, {requested} more requested"
    )]
    CapacityExceeded {
        /// Event whose budget is exhausted
        event_id: EventId,
        /// Entrant involved, for single-entrant transitions
        user_id: Option<UserId>,
        /// Event capacity
        capacity: u32,
        /// `accepted + invited` at check time
        committed: u32,
        /// Places the operation wanted
        requested: u32,
    },

    /// Nobody is on the waiting list; the draw did nothing.
    #[error("No entrants are waiting for event {event_id}")]
    EmptyWaitlist {
        /// Event drawn for
        event_id: EventId,
    },

    /// The event is finalized or cancelled.
    #[error("Event {event_id} is {status}{}{}",
        describe_user(.user_id.as_ref()), describe_transition(.transition.as_ref()))]
    EventNotOpen {
        /// The event
        event_id: EventId,
        /// Entrant involved, if any
        user_id: Option<UserId>,
        /// Its status
        status: EventStatus,
        /// Transition that was attempted, if any
        transition: Option<Transition>,
    },

    /// Joining outside the registration window.
    #[error("Registration for event {event_id} is closed to {user_id}")]
    RegistrationClosed {
        /// The event
        event_id: EventId,
        /// User trying to join
        user_id: UserId,
    },

    /// The user already has an entrant record for this event.
    #[error("User {user_id} has already joined event {event_id}")]
    AlreadyJoined {
        /// The event
        event_id: EventId,
        /// The user
        user_id: UserId,
    },

    /// The waiting list is at its limit.
    #[error("Waiting list for event {event_id} is full ({limit} entrants); {user_id} cannot join")]
    WaitlistFull {
        /// The event
        event_id: EventId,
        /// User trying to join
        user_id: UserId,
        /// The event's waiting list limit
        limit: u32,
    },

    /// Another writer changed the event between this operation's read and write.
    ///
    /// Nothing was written; retry from a fresh read.
    #[error("Event {event_id} changed concurrently{}{}; nothing was written",
        describe_user(.user_id.as_ref()), describe_transition(.transition.as_ref()))]
    Conflict {
        /// The event
        event_id: EventId,
        /// Entrant involved, if any
        user_id: Option<UserId>,
        /// Transition that lost the race, if any
        transition: Option<Transition>,
    },

    /// The store could not be read or written.
    #[error("Data unavailable for event {event_id}{}{}: {source}",
        describe_user(.user_id.as_ref()), describe_transition(.transition.as_ref()))]
    DataUnavailable {
        /// The event
        event_id: EventId,
        /// Entrant involved, if any
        user_id: Option<UserId>,
        /// Transition being attempted, if any
        transition: Option<Transition>,
        /// Underlying store error
        source: RepositoryError,
    },

    /// A composed message could not be handed to the transport.
    ///
    /// Logged only; never rolls back the transition that produced it.
    #[error("Notification to {recipient} for event {event_id} failed: {source}")]
    NotificationDeliveryFailed {
        /// The event
        event_id: EventId,
        /// Intended recipient
        recipient: UserId,
        /// Underlying transport error
        source: NotificationError,
    },

    /// The task running a draw ended abnormally.
    #[error("Draw for event {event_id} did not complete: {reason}")]
    Interrupted {
        /// Event drawn for
        event_id: EventId,
        /// Why the task ended
        reason: String,
    },
}

fn describe_user(user_id: Option<&UserId>) -> String {
    user_id.map_or_else(String::new, |user_id| format!(", entrant {user_id}"))
}

fn describe_transition(transition: Option<&Transition>) -> String {
    transition.map_or_else(String::new, |transition| format!(" (during {transition})"))
}

impl LotteryError {
    /// Builds a mapper from [`RepositoryError`] carrying the operation's context.
    ///
    /// # Example
    ///
    /// ```
    /// use lottery_core::{EventId, LotteryError, RepositoryError, Transition, UserId};
    ///
    /// let event_id = EventId::new();
    /// let user = UserId::new("u-1");
    /// let err = Err::<(), _>(RepositoryError::NotFound)
    ///     .map_err(LotteryError::from_repository(event_id, Some(&user), Some(Transition::Accept)))
    ///     .unwrap_err();
    /// assert!(matches!(err, LotteryError::NotFound { user_id: Some(_), .. }));
    /// ```
    pub fn from_repository(
        event_id: EventId,
        user_id: Option<&UserId>,
        transition: Option<Transition>,
    ) -> impl FnOnce(RepositoryError) -> Self {
        let user_id = user_id.cloned();
        move |error| match error {
            RepositoryError::NotFound => Self::NotFound { event_id, user_id },
            RepositoryError::AlreadyExists => match user_id {
                Some(user_id) => Self::AlreadyJoined { event_id, user_id },
                None => Self::Conflict {
                    event_id,
                    user_id: None,
                    transition,
                },
            },
            RepositoryError::RevisionConflict { .. } | RepositoryError::StatusMismatch { .. } => {
                Self::Conflict {
                    event_id,
                    user_id,
                    transition,
                }
            },
            source @ RepositoryError::Unavailable(_) => Self::DataUnavailable {
                event_id,
                user_id,
                transition,
                source,
            },
        }
    }

    /// The event the error concerns
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::InvalidRequest { event_id, .. }
            | Self::NotFound { event_id, .. }
            | Self::InvalidTransition { event_id, .. }
            | Self::CapacityExceeded { event_id, .. }
            | Self::EmptyWaitlist { event_id }
            | Self::EventNotOpen { event_id, .. }
            | Self::RegistrationClosed { event_id, .. }
            | Self::AlreadyJoined { event_id, .. }
            | Self::WaitlistFull { event_id, .. }
            | Self::Conflict { event_id, .. }
            | Self::DataUnavailable { event_id, .. }
            | Self::NotificationDeliveryFailed { event_id, .. }
            | Self::Interrupted { event_id, .. } => *event_id,
        }
    }

    /// Whether repeating the same call may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::DataUnavailable { .. })
    }

    /// Whether the operation had nothing to do rather than failing
    #[must_use]
    pub const fn is_zero_effect(&self) -> bool {
        matches!(self, Self::EmptyWaitlist { .. })
    }
}
