//! Domain types for the waitlist lottery engine.
//!
//! This module contains the value objects and records the engine reasons about:
//! event and user identifiers, events with their capacity budget, entrants with
//! their lifecycle status, the transitions between statuses, and the transient
//! draw request/result pair.

use crate::error::LotteryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user, issued by the external identity provider.
///
/// Opaque to the engine; only equality and ordering matter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap a provider-issued user id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Event
// ============================================================================

/// Lifecycle status of an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Accepting joins, draws and responses
    Open,
    /// Organizer closed the event; the entrant list is final
    Finalized,
    /// Event called off
    Cancelled,
}

impl EventStatus {
    /// Lowercase name as stored
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Finalized => "finalized",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A limited-capacity event with a waiting list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier
    pub id: EventId,
    /// Display name, used when composing notifications
    pub name: String,
    /// The organizer who owns the event
    pub organizer_id: UserId,
    /// Maximum number of entrants the event will accept (`None` = no limit)
    pub capacity: Option<u32>,
    /// Maximum number of entrants on the waiting list (`None` = no limit)
    pub waiting_list_limit: Option<u32>,
    /// Current lifecycle status
    pub status: EventStatus,
    /// Whether joining requires a location
    pub geolocation_required: bool,
    /// Start of the registration window
    pub registration_opens_at: Option<DateTime<Utc>>,
    /// End of the registration window
    pub registration_closes_at: Option<DateTime<Utc>>,
    /// When the event itself starts
    pub starts_at: Option<DateTime<Utc>>,
    /// When the event itself ends
    pub ends_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Creates an open event with no limits and no time windows
    #[must_use]
    pub fn new(name: impl Into<String>, organizer_id: UserId) -> Self {
        Self {
            id: EventId::new(),
            name: name.into(),
            organizer_id,
            capacity: None,
            waiting_list_limit: None,
            status: EventStatus::Open,
            geolocation_required: false,
            registration_opens_at: None,
            registration_closes_at: None,
            starts_at: None,
            ends_at: None,
        }
    }

    /// Sets the capacity
    #[must_use]
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the waiting list limit
    #[must_use]
    pub fn with_waiting_list_limit(mut self, limit: u32) -> Self {
        self.waiting_list_limit = Some(limit);
        self
    }

    /// Sets the registration window
    #[must_use]
    pub fn with_registration_window(
        mut self,
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    ) -> Self {
        self.registration_opens_at = Some(opens_at);
        self.registration_closes_at = Some(closes_at);
        self
    }

    /// Sets when the event takes place
    #[must_use]
    pub fn with_schedule(mut self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Self {
        self.starts_at = Some(starts_at);
        self.ends_at = Some(ends_at);
        self
    }

    /// Requires entrants to share a location when joining
    #[must_use]
    pub fn requiring_geolocation(mut self) -> Self {
        self.geolocation_required = true;
        self
    }

    /// Overrides the status
    #[must_use]
    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the event is open
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == EventStatus::Open
    }

    /// Whether `now` falls inside the registration window.
    ///
    /// The window includes its opening instant and excludes its closing one.
    /// An unset bound is treated as unbounded on that side.
    #[must_use]
    pub fn is_registration_open(&self, now: DateTime<Utc>) -> bool {
        let opened = self.registration_opens_at.is_none_or(|opens| now >= opens);
        let not_closed = self.registration_closes_at.is_none_or(|closes| now < closes);
        opened && not_closed
    }

    /// Checks the event's own invariants.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::InvalidRequest`] when the capacity is zero, the
    /// waiting list limit is below the capacity, or a time window ends before it
    /// starts.
    pub fn validate(&self) -> Result<(), LotteryError> {
        let invalid = |reason: String| LotteryError::InvalidRequest {
            event_id: self.id,
            user_id: None,
            reason,
        };

        if self.capacity == Some(0) {
            return Err(invalid("capacity must be greater than zero".to_string()));
        }

        if let (Some(capacity), Some(limit)) = (self.capacity, self.waiting_list_limit) {
            if limit < capacity {
                return Err(invalid(format!(
                    "waiting list limit {limit} is below capacity {capacity}"
                )));
            }
        }

        if let (Some(opens), Some(closes)) = (self.registration_opens_at, self.registration_closes_at) {
            if closes < opens {
                return Err(invalid("registration closes before it opens".to_string()));
            }
        }

        if let (Some(starts), Some(ends)) = (self.starts_at, self.ends_at) {
            if ends < starts {
                return Err(invalid("event ends before it starts".to_string()));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Entrant
// ============================================================================

/// Status of an entrant within one event's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrantStatus {
    /// On the waiting list, eligible for a draw
    Waiting,
    /// Drawn; holds a place pending their response
    Invited,
    /// Confirmed attendance
    Accepted,
    /// Turned the invitation down
    Declined,
    /// Place cancelled by the organizer
    Cancelled,
}

impl EntrantStatus {
    /// Every status, in lifecycle order
    pub const ALL: [Self; 5] = [
        Self::Waiting,
        Self::Invited,
        Self::Accepted,
        Self::Declined,
        Self::Cancelled,
    ];

    /// Whether an entrant in this status consumes capacity.
    ///
    /// Invited entrants reserve their place pending confirmation.
    #[must_use]
    pub const fn is_committed(self) -> bool {
        matches!(self, Self::Invited | Self::Accepted)
    }

    /// Lowercase name as stored
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Invited => "invited",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EntrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A location shared by an entrant when joining
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates are within their valid ranges
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A user's participation record for one event.
///
/// Keyed by `(event_id, user_id)`; there is at most one per pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entrant {
    /// Event the entrant belongs to
    pub event_id: EventId,
    /// The participating user
    pub user_id: UserId,
    /// Name shown to the organizer
    pub display_name: String,
    /// Current lifecycle status
    pub status: EntrantStatus,
    /// When the user joined the waiting list
    pub registered_at: DateTime<Utc>,
    /// Location shared when joining
    pub location: Option<GeoPoint>,
}

impl Entrant {
    /// Name used when the user has no profile name
    pub const ANONYMOUS: &'static str = "Anonymous";

    /// Creates a waiting entrant
    #[must_use]
    pub fn waiting(event_id: EventId, user_id: UserId, registered_at: DateTime<Utc>) -> Self {
        Self {
            event_id,
            user_id,
            display_name: Self::ANONYMOUS.to_string(),
            status: EntrantStatus::Waiting,
            registered_at,
            location: None,
        }
    }

    /// Sets the display name
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the location
    #[must_use]
    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    /// Overrides the status
    #[must_use]
    pub fn with_status(mut self, status: EntrantStatus) -> Self {
        self.status = status;
        self
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Who may request a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    /// The entrant themself
    Entrant,
    /// The event's organizer
    Organizer,
    /// The draw orchestrator
    Draw,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Entrant => "entrant",
            Self::Organizer => "organizer",
            Self::Draw => "draw",
        })
    }
}

/// A named change to an entrant's status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// waiting → invited (draw only)
    Invite,
    /// invited → accepted
    Accept,
    /// invited → declined
    Decline,
    /// {invited, accepted} → cancelled
    Cancel,
    /// {invited, accepted, declined, cancelled} → waiting
    Withdraw,
    /// waiting → record deleted
    Leave,
}

impl Transition {
    /// Every transition
    pub const ALL: [Self; 6] = [
        Self::Invite,
        Self::Accept,
        Self::Decline,
        Self::Cancel,
        Self::Withdraw,
        Self::Leave,
    ];

    /// Status after the transition; `None` when the record is deleted
    #[must_use]
    pub const fn target(self) -> Option<EntrantStatus> {
        match self {
            Self::Invite => Some(EntrantStatus::Invited),
            Self::Accept => Some(EntrantStatus::Accepted),
            Self::Decline => Some(EntrantStatus::Declined),
            Self::Cancel => Some(EntrantStatus::Cancelled),
            Self::Withdraw => Some(EntrantStatus::Waiting),
            Self::Leave => None,
        }
    }

    /// Statuses the transition may start from
    #[must_use]
    pub const fn sources(self) -> &'static [EntrantStatus] {
        match self {
            Self::Invite | Self::Leave => &[EntrantStatus::Waiting],
            Self::Accept | Self::Decline => &[EntrantStatus::Invited],
            Self::Cancel => &[EntrantStatus::Invited, EntrantStatus::Accepted],
            Self::Withdraw => &[
                EntrantStatus::Invited,
                EntrantStatus::Accepted,
                EntrantStatus::Declined,
                EntrantStatus::Cancelled,
            ],
        }
    }

    /// The only actor allowed to request the transition
    #[must_use]
    pub const fn actor(self) -> Actor {
        match self {
            Self::Invite => Actor::Draw,
            Self::Accept | Self::Decline | Self::Leave => Actor::Entrant,
            Self::Cancel | Self::Withdraw => Actor::Organizer,
        }
    }

    /// Snake-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invite => "invite",
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::Cancel => "cancel",
            Self::Withdraw => "withdraw",
            Self::Leave => "leave",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Capacity
// ============================================================================

/// Per-status entrant counts for one event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrantCounts {
    /// Entrants with status `accepted`
    pub accepted: u32,
    /// Entrants with status `invited`
    pub invited: u32,
    /// Entrants with status `waiting`
    pub waiting: u32,
}

impl EntrantCounts {
    /// Entrants consuming capacity (`accepted + invited`)
    #[must_use]
    pub const fn committed(&self) -> u32 {
        self.accepted.saturating_add(self.invited)
    }
}

/// Places still available to a draw
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainingCapacity {
    /// The event has no capacity limit
    Unbounded,
    /// This many places are left
    Limited(u32),
}

impl RemainingCapacity {
    /// `max(capacity - committed, 0)`, or unbounded without a capacity
    #[must_use]
    pub const fn from_capacity(capacity: Option<u32>, counts: &EntrantCounts) -> Self {
        match capacity {
            Some(capacity) => Self::Limited(capacity.saturating_sub(counts.committed())),
            None => Self::Unbounded,
        }
    }

    /// Upper bound on how many entrants may still be invited
    #[must_use]
    pub fn as_limit(self) -> usize {
        match self {
            Self::Unbounded => usize::MAX,
            Self::Limited(left) => usize::try_from(left).unwrap_or(usize::MAX),
        }
    }

    /// Whether no place is left
    #[must_use]
    pub const fn is_exhausted(self) -> bool {
        matches!(self, Self::Limited(0))
    }
}

impl fmt::Display for RemainingCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("no limit"),
            Self::Limited(left) => write!(f, "{left}"),
        }
    }
}

// ============================================================================
// Draws
// ============================================================================

/// An organizer's request to draw entrants (transient)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRequest {
    /// Event to draw for
    pub event_id: EventId,
    /// Number of entrants asked for, as entered by the organizer
    pub requested: i64,
    /// When the request was made
    pub requested_at: DateTime<Utc>,
}

impl DrawRequest {
    /// Creates a request
    #[must_use]
    pub const fn new(event_id: EventId, requested: i64, requested_at: DateTime<Utc>) -> Self {
        Self {
            event_id,
            requested,
            requested_at,
        }
    }

    /// Checks the requested count and converts it to a size.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::InvalidRequest`] when the count is zero, negative,
    /// or above `max_draw_size`.
    pub fn validated_count(&self, max_draw_size: u32) -> Result<usize, LotteryError> {
        if self.requested <= 0 {
            return Err(LotteryError::InvalidRequest {
                event_id: self.event_id,
                user_id: None,
                reason: format!(
                    "number of entrants to draw must be positive (got {})",
                    self.requested
                ),
            });
        }

        if self.requested > i64::from(max_draw_size) {
            return Err(LotteryError::InvalidRequest {
                event_id: self.event_id,
                user_id: None,
                reason: format!(
                    "cannot draw more than {max_draw_size} entrants at once (got {})",
                    self.requested
                ),
            });
        }

        usize::try_from(self.requested).map_err(|_| LotteryError::InvalidRequest {
            event_id: self.event_id,
            user_id: None,
            reason: format!("draw size {} does not fit this platform", self.requested),
        })
    }
}

/// Outcome of a committed draw
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    /// Event drawn for
    pub event_id: EventId,
    /// Users moved from waiting to invited
    pub winners: Vec<UserId>,
    /// How many were asked for
    pub requested: usize,
    /// `min(requested, waiting_count, remaining_capacity)`
    pub actual_count: usize,
    /// Waiting list size in the draw's snapshot
    pub waiting_count: usize,
    /// Capacity left before the draw
    pub remaining_capacity: RemainingCapacity,
    /// When the draw committed
    pub drawn_at: DateTime<Utc>,
}

impl DrawResult {
    /// Builds a result; `actual_count` is the number of winners
    #[must_use]
    pub fn new(
        event_id: EventId,
        winners: Vec<UserId>,
        requested: usize,
        waiting_count: usize,
        remaining_capacity: RemainingCapacity,
        drawn_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id,
            actual_count: winners.len(),
            winners,
            requested,
            waiting_count,
            remaining_capacity,
            drawn_at,
        }
    }

    /// Whether nobody was selected (`EmptySelection`)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actual_count == 0
    }

    /// Whether fewer entrants were drawn than requested
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.actual_count < self.requested
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    #[test]
    fn test_committed_statuses() {
        let committed: Vec<_> = EntrantStatus::ALL
            .into_iter()
            .filter(|status| status.is_committed())
            .collect();
        assert_eq!(committed, vec![EntrantStatus::Invited, EntrantStatus::Accepted]);
    }

    #[test]
    fn test_remaining_capacity_saturates() {
        let counts = EntrantCounts {
            accepted: 3,
            invited: 2,
            waiting: 10,
        };
        assert_eq!(counts.committed(), 5);
        assert_eq!(
            RemainingCapacity::from_capacity(Some(4), &counts),
            RemainingCapacity::Limited(0)
        );
        assert_eq!(
            RemainingCapacity::from_capacity(Some(8), &counts),
            RemainingCapacity::Limited(3)
        );
        assert_eq!(
            RemainingCapacity::from_capacity(None, &counts),
            RemainingCapacity::Unbounded
        );
        assert_eq!(RemainingCapacity::Unbounded.as_limit(), usize::MAX);
        assert!(RemainingCapacity::Limited(0).is_exhausted());
    }

    #[test]
    fn test_event_validation() {
        let organizer = UserId::new("organizer");
        assert!(Event::new("Swim lessons", organizer.clone()).validate().is_ok());
        assert!(
            Event::new("Swim lessons", organizer.clone())
                .with_capacity(10)
                .with_waiting_list_limit(10)
                .validate()
                .is_ok()
        );

        let err = Event::new("Swim lessons", organizer.clone())
            .with_capacity(10)
            .with_waiting_list_limit(5)
            .validate()
            .unwrap_err();
        assert!(matches!(err, LotteryError::InvalidRequest { .. }));

        let zero = Event::new("Swim lessons", organizer).with_capacity(0).validate();
        assert!(zero.is_err());
    }

    #[test]
    fn test_registration_window() {
        let now = Utc::now();
        let opens = now - Duration::days(1);
        let closes = now + Duration::days(1);
        let event = Event::new("Pottery", UserId::new("o")).with_registration_window(opens, closes);
        assert!(event.is_registration_open(now));
        assert!(event.is_registration_open(opens));
        assert!(!event.is_registration_open(closes));
        assert!(event.is_registration_open(closes - Duration::milliseconds(1)));
        assert!(!event.is_registration_open(now + Duration::days(2)));
        assert!(!event.is_registration_open(now - Duration::days(2)));

        let unbounded = Event::new("Pottery", UserId::new("o"));
        assert!(unbounded.is_registration_open(now));
    }

    #[test]
    fn test_transition_targets_and_actors() {
        assert_eq!(Transition::Invite.actor(), Actor::Draw);
        assert_eq!(Transition::Leave.target(), None);
        assert_eq!(Transition::Withdraw.target(), Some(EntrantStatus::Waiting));
        assert!(!Transition::Withdraw.sources().contains(&EntrantStatus::Waiting));
        for transition in Transition::ALL {
            assert!(!transition.sources().is_empty(), "{transition} has no source");
        }
    }

    #[test]
    fn test_draw_request_validation() {
        let event_id = EventId::new();
        let now = Utc::now();
        assert!(DrawRequest::new(event_id, 0, now).validated_count(100).is_err());
        assert!(DrawRequest::new(event_id, -3, now).validated_count(100).is_err());
        assert!(DrawRequest::new(event_id, 101, now).validated_count(100).is_err());
        assert_eq!(DrawRequest::new(event_id, 7, now).validated_count(100).unwrap(), 7);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&EntrantStatus::Declined).unwrap();
        assert_eq!(json, "\"declined\"");
        let status: EventStatus = serde_json::from_str("\"finalized\"").unwrap();
        assert_eq!(status, EventStatus::Finalized);
    }

    #[test]
    fn test_draw_result_partial() {
        let result = DrawResult::new(
            EventId::new(),
            vec![UserId::new("a"), UserId::new("b")],
            5,
            3,
            RemainingCapacity::Limited(2),
            Utc::now(),
        );
        assert_eq!(result.actual_count, 2);
        assert!(result.is_partial());
        assert!(!result.is_empty());
    }

    proptest! {
        #[test]
        fn prop_remaining_never_exceeds_capacity(
            capacity in 1_u32..500,
            accepted in 0_u32..400,
            invited in 0_u32..400,
            waiting in 0_u32..400,
        ) {
            let counts = EntrantCounts { accepted, invited, waiting };
            let remaining = RemainingCapacity::from_capacity(Some(capacity), &counts);
            prop_assert_eq!(
                remaining,
                RemainingCapacity::Limited(capacity.saturating_sub(accepted + invited))
            );
            prop_assert!(remaining.as_limit() <= usize::try_from(capacity).unwrap());
            prop_assert_eq!(remaining.is_exhausted(), accepted + invited >= capacity);
        }

        #[test]
        fn prop_validated_count_accepts_only_in_range(
            requested in -50_i64..300,
            max_draw_size in 1_u32..200,
        ) {
            let request = DrawRequest::new(EventId::new(), requested, Utc::now());
            let in_range = (1..=i64::from(max_draw_size)).contains(&requested);
            match request.validated_count(max_draw_size) {
                Ok(count) => {
                    prop_assert!(in_range);
                    prop_assert_eq!(i64::try_from(count).unwrap(), requested);
                },
                Err(error) => {
                    prop_assert!(!in_range);
                    let is_invalid = matches!(error, LotteryError::InvalidRequest { user_id: None, .. });
                    prop_assert!(is_invalid);
                },
            }
        }
    }
}
