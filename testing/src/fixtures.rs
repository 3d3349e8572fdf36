//! Ready-made events and users.

use lottery_core::{Event, UserId};

/// Organizer id used by every fixture event
pub const ORGANIZER: &str = "organizer";

/// The fixture organizer
#[must_use]
pub fn organizer() -> UserId {
    UserId::new(ORGANIZER)
}

/// An open event owned by [`organizer()`], with an optional capacity
#[must_use]
pub fn event(capacity: Option<u32>) -> Event {
    let event = Event::new("Swim Lessons", organizer());
    match capacity {
        Some(capacity) => event.with_capacity(capacity),
        None => event,
    }
}

/// `count` user names: `"{prefix}-0"`, `"{prefix}-1"`, ...
#[must_use]
pub fn users(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}-{i}")).collect()
}
