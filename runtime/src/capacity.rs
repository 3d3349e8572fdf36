//! Capacity accounting.
//!
//! Invited entrants hold a place until they answer, so the committed count
//! is `accepted + invited`. Counts always come from the store's aggregate
//! query; a failed read is an error, never a zero.

use futures::try_join;
use lottery_core::{
    EntrantCounts, EntrantRepository, EntrantStatus, EventId, LotteryError, RemainingCapacity,
    Revision, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Organizer-facing view of an event's places.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySummary {
    /// The event
    pub event_id: EventId,
    /// Event capacity, `None` for unlimited
    pub capacity: Option<u32>,
    /// Entrants per capacity-relevant status
    pub counts: EntrantCounts,
    /// Places not yet committed
    pub remaining: RemainingCapacity,
    /// Event revision the counts were read at
    pub revision: Revision,
}

impl CapacitySummary {
    /// Entrants currently waiting to be drawn
    #[must_use]
    pub const fn waiting_list_size(&self) -> u32 {
        self.counts.waiting
    }

    /// Entrants holding a place (`accepted + invited`)
    #[must_use]
    pub const fn selected_count(&self) -> u32 {
        self.counts.committed()
    }

    /// Whether a draw could invite anyone right now.
    ///
    /// ```
    /// use lottery_core::{EntrantCounts, EventId, RemainingCapacity, Revision};
    /// use lottery_runtime::capacity::CapacitySummary;
    ///
    /// let summary = CapacitySummary {
    ///     event_id: EventId::new(),
    ///     capacity: Some(2),
    ///     counts: EntrantCounts { accepted: 1, invited: 1, waiting: 4 },
    ///     remaining: RemainingCapacity::Limited(0),
    ///     revision: Revision::INITIAL,
    /// };
    /// assert!(!summary.can_run_draw());
    /// ```
    #[must_use]
    pub const fn can_run_draw(&self) -> bool {
        self.counts.waiting > 0 && !self.remaining.is_exhausted()
    }
}

/// Computes entrant counts and remaining capacity from aggregate reads.
#[derive(Clone)]
pub struct CapacityAccountant {
    repository: Arc<dyn EntrantRepository>,
}

impl CapacityAccountant {
    /// Create an accountant reading from `repository`.
    #[must_use]
    pub fn new(repository: Arc<dyn EntrantRepository>) -> Self {
        Self { repository }
    }

    /// Accepted, invited and waiting counts for an event.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::DataUnavailable`] if any of the aggregate reads
    /// fails.
    pub async fn counts(&self, event_id: EventId) -> Result<EntrantCounts, LotteryError> {
        let (accepted, invited, waiting) = try_join!(
            self.repository
                .aggregate_count(event_id, EntrantStatus::Accepted),
            self.repository.aggregate_count(event_id, EntrantStatus::Invited),
            self.repository.aggregate_count(event_id, EntrantStatus::Waiting),
        )
        .map_err(LotteryError::from_repository(event_id, None, None))?;

        Ok(EntrantCounts {
            accepted,
            invited,
            waiting,
        })
    }

    /// Full capacity picture for an event.
    ///
    /// The revision is read before anything else, so a caller that writes with
    /// it as `expected_revision` is rejected if the counts went stale.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::NotFound`] if the event does not exist
    /// - [`LotteryError::DataUnavailable`] if the store fails
    pub async fn summary(&self, event_id: EventId) -> Result<CapacitySummary, LotteryError> {
        let revision = self
            .repository
            .revision(event_id)
            .await
            .map_err(LotteryError::from_repository(event_id, None, None))?;
        let event = self
            .repository
            .get_event(event_id)
            .await
            .map_err(LotteryError::from_repository(event_id, None, None))?;
        let counts = self.counts(event_id).await?;

        Ok(CapacitySummary {
            event_id,
            capacity: event.capacity,
            counts,
            remaining: RemainingCapacity::from_capacity(event.capacity, &counts),
            revision,
        })
    }

    /// Reject a change that would add `additional` committed entrants beyond capacity.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::CapacityExceeded`] when
    /// `committed + additional > capacity`.
    pub fn ensure_room(
        event_id: EventId,
        capacity: Option<u32>,
        counts: &EntrantCounts,
        additional: u32,
        user_id: Option<&UserId>,
    ) -> Result<(), LotteryError> {
        let Some(capacity) = capacity else {
            return Ok(());
        };
        let committed = counts.committed();
        if committed.saturating_add(additional) > capacity {
            tracing::debug!(
                %event_id,
                capacity,
                committed,
                additional,
                "Capacity check refused commitment"
            );
            return Err(LotteryError::CapacityExceeded {
                event_id,
                user_id: user_id.cloned(),
                capacity,
                committed,
                requested: additional,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn counts(accepted: u32, invited: u32, waiting: u32) -> EntrantCounts {
        EntrantCounts {
            accepted,
            invited,
            waiting,
        }
    }

    #[test]
    fn test_ensure_room_unbounded() {
        let event_id = EventId::new();
        assert!(CapacityAccountant::ensure_room(event_id, None, &counts(500, 500, 0), 10, None).is_ok());
    }

    #[test]
    fn test_ensure_room_counts_invited_as_committed() {
        let event_id = EventId::new();
        assert!(CapacityAccountant::ensure_room(event_id, Some(3), &counts(1, 1, 5), 1, None).is_ok());

        let err = CapacityAccountant::ensure_room(event_id, Some(3), &counts(1, 2, 5), 1, None)
            .unwrap_err();
        assert!(matches!(
            err,
            LotteryError::CapacityExceeded {
                capacity: 3,
                committed: 3,
                requested: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_can_run_draw() {
        let mut summary = CapacitySummary {
            event_id: EventId::new(),
            capacity: None,
            counts: counts(0, 0, 0),
            remaining: RemainingCapacity::Unbounded,
            revision: Revision::INITIAL,
        };
        assert!(!summary.can_run_draw(), "nobody waiting");

        summary.counts.waiting = 3;
        assert!(summary.can_run_draw());
        assert_eq!(summary.waiting_list_size(), 3);

        summary.capacity = Some(1);
        summary.counts.accepted = 1;
        summary.remaining = RemainingCapacity::from_capacity(summary.capacity, &summary.counts);
        assert!(!summary.can_run_draw(), "no places left");
        assert_eq!(summary.selected_count(), 1);
    }
}
