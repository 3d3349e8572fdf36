//! Notification composition and hand-off.
//!
//! The dispatcher turns a committed transition into one message per affected
//! entrant and hands each message to the [`NotificationSink`]. Hand-off never
//! blocks or fails the transition: a failed send is logged and counted, then
//! dropped.

use crate::metrics::NotificationMetrics;
use lottery_core::environment::Clock;
use lottery_core::{
    Event, LotteryError, NotificationError, NotificationKind, NotificationMessage,
    NotificationSink, UserId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// How sends are scheduled after a commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Each send runs on its own task; the caller does not wait.
    #[default]
    Detached,
    /// Sends are awaited one after another before the operation returns.
    Inline,
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detached" => Ok(Self::Detached),
            "inline" => Ok(Self::Inline),
            other => Err(format!("unknown notification mode '{other}'")),
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Detached => "detached",
            Self::Inline => "inline",
        })
    }
}

/// Why a withdrawal message is being sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawalReason {
    /// The organizer withdrew an invitation (or reverted a draw)
    Withdrawn,
    /// The organizer cancelled the entrant's place
    Cancelled,
}

/// Composes notification messages and hands them to a sink.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    mode: DispatchMode,
    timeout: Duration,
}

impl NotificationDispatcher {
    /// Create a dispatcher in [`DispatchMode::Detached`] with a 5 second send timeout.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sink,
            clock,
            mode: DispatchMode::Detached,
            timeout: Duration::from_secs(5),
        }
    }

    /// Set the dispatch mode
    #[must_use]
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Bound each send by `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured mode
    #[must_use]
    pub const fn mode(&self) -> DispatchMode {
        self.mode
    }

    // ========================================================================
    // Composition
    // ========================================================================

    /// Message telling a draw winner they were selected.
    #[must_use]
    pub fn compose_invite(&self, event: &Event, recipient: UserId) -> NotificationMessage {
        self.compose(
            event,
            recipient,
            NotificationKind::Invite,
            "Congratulations!",
            format!(
                "You've been selected for {}! Tap to accept or decline.",
                event.name
            ),
            event.organizer_id.clone(),
        )
    }

    /// Message telling an entrant their invitation or place was taken back.
    #[must_use]
    pub fn compose_withdrawal(
        &self,
        event: &Event,
        recipient: UserId,
        reason: WithdrawalReason,
    ) -> NotificationMessage {
        let body = match reason {
            WithdrawalReason::Withdrawn => {
                format!("Your invitation to the event {} has been withdrawn.", event.name)
            },
            WithdrawalReason::Cancelled => {
                format!("Your place at the event {} has been cancelled.", event.name)
            },
        };
        self.compose(
            event,
            recipient,
            NotificationKind::Withdrawal,
            "Invitation Update",
            body,
            event.organizer_id.clone(),
        )
    }

    /// Free-form message from the organizer.
    #[must_use]
    pub fn compose_custom(
        &self,
        event: &Event,
        recipient: UserId,
        sender: UserId,
        text: &str,
    ) -> NotificationMessage {
        self.compose(
            event,
            recipient,
            NotificationKind::Custom,
            "Message From Organizer",
            format!("Message from the organizer of {}: {text}", event.name),
            sender,
        )
    }

    fn compose(
        &self,
        event: &Event,
        recipient_id: UserId,
        kind: NotificationKind,
        title: &str,
        body: String,
        sender_id: UserId,
    ) -> NotificationMessage {
        NotificationMessage {
            recipient_id,
            kind,
            event_id: event.id,
            event_name: event.name.clone(),
            title: title.to_string(),
            body,
            sender_id,
            created_at: self.clock.now(),
        }
    }

    // ========================================================================
    // Hand-off
    // ========================================================================

    /// Hand one message to the sink. Never fails the caller.
    pub async fn dispatch(&self, message: NotificationMessage) {
        self.dispatch_all(vec![message]).await;
    }

    /// Hand several messages to the sink. Never fails the caller.
    ///
    /// In detached mode every send is spawned and this returns immediately;
    /// in inline mode the sends are awaited in order.
    pub async fn dispatch_all(&self, messages: Vec<NotificationMessage>) {
        match self.mode {
            DispatchMode::Detached => {
                for message in messages {
                    let sink = Arc::clone(&self.sink);
                    let timeout = self.timeout;
                    tokio::spawn(async move {
                        let _ = deliver(sink.as_ref(), message, timeout).await;
                    });
                }
            },
            DispatchMode::Inline => {
                for message in messages {
                    let _ = deliver(self.sink.as_ref(), message, self.timeout).await;
                }
            },
        }
    }
}

/// Send one message, logging and counting the outcome.
async fn deliver(
    sink: &dyn NotificationSink,
    message: NotificationMessage,
    timeout: Duration,
) -> Result<(), LotteryError> {
    let event_id = message.event_id;
    let recipient = message.recipient_id.clone();
    let kind = message.kind;

    let outcome = match tokio::time::timeout(timeout, sink.send(message)).await {
        Ok(result) => result,
        Err(_) => Err(NotificationError::Timeout(timeout)),
    };

    match outcome {
        Ok(()) => {
            NotificationMetrics::record_sent(kind);
            tracing::debug!(%event_id, user_id = %recipient, %kind, "Notification handed off");
            Ok(())
        },
        Err(source) => {
            NotificationMetrics::record_failed(kind);
            let error = LotteryError::NotificationDeliveryFailed {
                event_id,
                recipient,
                source,
            };
            tracing::warn!(%event_id, %kind, error = %error, "Notification not delivered");
            Err(error)
        },
    }
}

/// Sink that writes each message to the log instead of a push transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn send(
        &self,
        message: NotificationMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
        Box::pin(async move {
            tracing::info!(
                event_id = %message.event_id,
                user_id = %message.recipient_id,
                kind = %message.kind,
                title = %message.title,
                "{}",
                message.body
            );
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use lottery_testing::{RecordingNotificationSink, test_clock};

    fn event() -> Event {
        Event::new("Swim Lessons", UserId::new("organizer"))
    }

    fn dispatcher(sink: Arc<dyn NotificationSink>, mode: DispatchMode) -> NotificationDispatcher {
        NotificationDispatcher::new(sink, Arc::new(test_clock())).with_mode(mode)
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("inline".parse::<DispatchMode>().unwrap(), DispatchMode::Inline);
        assert_eq!(" Detached ".parse::<DispatchMode>().unwrap(), DispatchMode::Detached);
        assert!("later".parse::<DispatchMode>().is_err());
    }

    #[test]
    fn test_composed_texts() {
        let dispatcher = dispatcher(Arc::new(TracingNotificationSink), DispatchMode::Inline);
        let event = event();

        let invite = dispatcher.compose_invite(&event, UserId::new("u-1"));
        assert_eq!(invite.kind, NotificationKind::Invite);
        assert_eq!(invite.title, "Congratulations!");
        assert_eq!(
            invite.body,
            "You've been selected for Swim Lessons! Tap to accept or decline."
        );
        assert_eq!(invite.sender_id, event.organizer_id);

        let withdrawn =
            dispatcher.compose_withdrawal(&event, UserId::new("u-1"), WithdrawalReason::Withdrawn);
        assert_eq!(
            withdrawn.body,
            "Your invitation to the event Swim Lessons has been withdrawn."
        );

        let cancelled =
            dispatcher.compose_withdrawal(&event, UserId::new("u-1"), WithdrawalReason::Cancelled);
        assert_eq!(cancelled.kind, NotificationKind::Withdrawal);
        assert_eq!(cancelled.body, "Your place at the event Swim Lessons has been cancelled.");

        let custom = dispatcher.compose_custom(
            &event,
            UserId::new("u-2"),
            UserId::new("organizer"),
            "Bring goggles",
        );
        assert_eq!(
            custom.body,
            "Message from the organizer of Swim Lessons: Bring goggles"
        );
    }

    #[tokio::test]
    async fn test_inline_dispatch_delivers_in_order() {
        let sink = Arc::new(RecordingNotificationSink::new());
        let dispatcher = dispatcher(sink.clone(), DispatchMode::Inline);
        let event = event();

        dispatcher
            .dispatch_all(vec![
                dispatcher.compose_invite(&event, UserId::new("a")),
                dispatcher.compose_invite(&event, UserId::new("b")),
            ])
            .await;

        let recipients: Vec<_> = sink
            .messages()
            .into_iter()
            .map(|m| m.recipient_id.to_string())
            .collect();
        assert_eq!(recipients, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failing_sink_is_swallowed() {
        let sink = Arc::new(RecordingNotificationSink::new());
        sink.fail_sends(true);
        let dispatcher = dispatcher(sink.clone(), DispatchMode::Inline);

        dispatcher
            .dispatch(dispatcher.compose_invite(&event(), UserId::new("a")))
            .await;

        assert!(sink.messages().is_empty());
        assert_eq!(sink.failed_attempts(), 1);
    }

    #[tokio::test]
    async fn test_detached_dispatch_eventually_delivers() {
        let sink = Arc::new(RecordingNotificationSink::new());
        let dispatcher = dispatcher(sink.clone(), DispatchMode::Detached);

        dispatcher
            .dispatch(dispatcher.compose_invite(&event(), UserId::new("a")))
            .await;

        assert!(sink.wait_for(1, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_slow_sink_times_out() {
        let sink = Arc::new(RecordingNotificationSink::new());
        sink.set_delay(Duration::from_millis(200));
        let dispatcher = dispatcher(sink.clone(), DispatchMode::Inline);

        let message = dispatcher.compose_invite(&event(), UserId::new("a"));
        let result = deliver(sink.as_ref(), message, Duration::from_millis(20)).await;

        assert!(matches!(
            result,
            Err(LotteryError::NotificationDeliveryFailed {
                source: NotificationError::Timeout(_),
                ..
            })
        ));
        assert!(sink.messages().is_empty());
    }
}
