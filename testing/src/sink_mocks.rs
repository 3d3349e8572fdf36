//! Recording notification sink.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use lottery_core::{
    NotificationError, NotificationKind, NotificationMessage, NotificationSink, UserId,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Sink that keeps every delivered message for later assertions.
///
/// Cloning shares the recorded messages.
#[derive(Clone, Default)]
pub struct RecordingNotificationSink {
    messages: Arc<RwLock<Vec<NotificationMessage>>>,
    failing: Arc<AtomicBool>,
    failed_attempts: Arc<AtomicUsize>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl RecordingNotificationSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivered messages, in delivery order
    #[must_use]
    pub fn messages(&self) -> Vec<NotificationMessage> {
        self.messages.read().unwrap().clone()
    }

    /// Delivered messages addressed to `user`
    #[must_use]
    pub fn messages_for(&self, user: &str) -> Vec<NotificationMessage> {
        let user = UserId::new(user);
        self.messages()
            .into_iter()
            .filter(|m| m.recipient_id == user)
            .collect()
    }

    /// Delivered messages of one kind
    #[must_use]
    pub fn of_kind(&self, kind: NotificationKind) -> Vec<NotificationMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.kind == kind)
            .collect()
    }

    /// Reject every send while set
    pub fn fail_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of rejected sends
    #[must_use]
    pub fn failed_attempts(&self) -> usize {
        self.failed_attempts.load(Ordering::SeqCst)
    }

    /// Sleep this long before recording each message
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write().unwrap() = Some(delay);
    }

    /// Forget recorded messages and failures
    pub fn clear(&self) {
        self.messages.write().unwrap().clear();
        self.failed_attempts.store(0, Ordering::SeqCst);
    }

    /// Wait until at least `count` messages were delivered.
    ///
    /// Returns `false` if `timeout` elapses first. Detached dispatch
    /// delivers in the background, so tests poll instead of asserting once.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.messages.read().unwrap().len() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn send(
        &self,
        message: NotificationMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
        Box::pin(async move {
            let delay = *self.delay.read().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                self.failed_attempts.fetch_add(1, Ordering::SeqCst);
                return Err(NotificationError::Unavailable(
                    "push transport offline".to_string(),
                ));
            }
            self.messages.write().unwrap().push(message);
            Ok(())
        })
    }
}
