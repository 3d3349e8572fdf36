//! # Lottery Runtime
//!
//! The waitlist lottery engine: capacity accounting, random selection, the
//! entrant lifecycle and draw coordination on top of the boundaries defined
//! in `lottery-core`.
//!
//! ## Components
//!
//! Leaves first:
//!
//! - **[`CapacityAccountant`]**: accepted/invited/waiting counts and remaining capacity
//! - **[`DrawSelector`]**: uniform, capacity- and size-bounded selection
//! - **[`LifecycleManager`]**: single-entrant transitions (join, leave, accept,
//!   decline, withdraw, cancel)
//! - **[`DrawOrchestrator`]**: draws, reverts, finalization, broadcasts
//! - **[`NotificationDispatcher`]**: message composition and hand-off
//! - **[`LotteryService`]**: the facade callers use
//!
//! ## Example
//!
//! ```ignore
//! let service = LotteryService::new(repository, sink, &LotteryConfig::from_env());
//!
//! service.join_waitlist(event_id, user_id, JoinRequest::default()).await?;
//! let drawn = service.run_draw(event_id, 10).await?;
//! println!("{} of {} invited", drawn.actual_count, drawn.requested);
//! ```

/// Capacity accounting over aggregate counts
pub mod capacity;

/// Engine configuration
pub mod config;

/// Notification composition and hand-off
pub mod dispatcher;

/// Single-entrant lifecycle state machine
pub mod lifecycle;

/// Prometheus metrics for observability
pub mod metrics;

/// Draw coordination
pub mod orchestrator;

/// Caller-side retry for retryable errors
pub mod retry;

/// Uniform random selection
pub mod selector;

/// Caller-facing facade
pub mod service;

pub use capacity::{CapacityAccountant, CapacitySummary};
pub use config::LotteryConfig;
pub use dispatcher::{DispatchMode, NotificationDispatcher, TracingNotificationSink};
pub use lifecycle::{InviteResponse, JoinRequest, LifecycleManager};
pub use orchestrator::DrawOrchestrator;
pub use selector::{DrawSelector, RngSource, Selection};
pub use service::LotteryService;
