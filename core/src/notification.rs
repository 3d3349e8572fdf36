//! Notification messages and the transport boundary.
//!
//! Transitions that affect an entrant produce a [`NotificationMessage`]. The
//! engine composes it and hands it to a [`NotificationSink`]; delivery (push,
//! email, an inbox collection) belongs to the sink. Once handed off the message
//! is no longer the engine's concern.

use crate::types::{EventId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// What a message tells its recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Selected by a draw
    Invite,
    /// Invitation or place withdrawn by the organizer
    Withdrawal,
    /// Free-form organizer broadcast
    Custom,
}

impl NotificationKind {
    /// Lowercase name, as stored and used in metric labels
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invite => "invite",
            Self::Withdrawal => "withdrawal",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A composed message for one recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Who receives it
    pub recipient_id: UserId,
    /// Message type
    pub kind: NotificationKind,
    /// Event it concerns
    pub event_id: EventId,
    /// Event name at composition time
    pub event_name: String,
    /// Short heading
    pub title: String,
    /// Composed text
    pub body: String,
    /// Organizer (or other user) on whose behalf it is sent
    pub sender_id: UserId,
    /// Composition time
    pub created_at: DateTime<Utc>,
}

/// Errors a transport can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The transport refused the message (bad recipient, opted out).
    #[error("Notification rejected: {0}")]
    Rejected(String),

    /// The transport could not be reached.
    #[error("Notification transport unavailable: {0}")]
    Unavailable(String),

    /// The send did not finish in time.
    #[error("Notification send timed out after {0:?}")]
    Timeout(Duration),
}

/// External transport consuming composed messages.
///
/// Implementations should be idempotent where they can; the engine may hand
/// over the same logical message again if a caller retries an operation.
pub trait NotificationSink: Send + Sync {
    /// Hand one message to the transport.
    ///
    /// # Errors
    ///
    /// Returns a [`NotificationError`] if the transport refuses or fails. The
    /// engine logs it and carries on.
    fn send(
        &self,
        message: NotificationMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>>;
}
