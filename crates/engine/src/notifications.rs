//! Single-slot user-facing notifications.
//!
//! A push replaces whatever is showing and restarts the dismiss window; there
//! is no backlog. Expiry is checked against the tokio clock, so paused-time
//! tests can step over the window deterministically.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{sync::Mutex, time::Instant};

pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Slot {
    notification: Notification,
    deadline: Instant,
}

#[derive(Debug, Default)]
struct State {
    slot: Option<Slot>,
}

impl State {
    fn prune(&mut self, now: Instant) {
        if self.slot.as_ref().is_some_and(|slot| now >= slot.deadline) {
            self.slot = None;
        }
    }

    fn replace(&mut self, notification: Notification, deadline: Instant) {
        if let Some(previous) = self.slot.take() {
            tracing::debug!("notification superseded: {}", previous.notification.message);
        }
        self.slot = Some(Slot {
            notification,
            deadline,
        });
    }
}

#[derive(Clone, Debug)]
pub struct Notifier {
    inner: Arc<Mutex<State>>,
    dismiss_after: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_DISMISS_AFTER)
    }
}

impl Notifier {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(State::default())),
            dismiss_after,
        }
    }

    /// Replaces the active notification and restarts the dismiss window.
    pub async fn push(&self, message: impl Into<String>, kind: NotificationKind) -> Notification {
        let notification = Notification {
            message: message.into(),
            kind,
            created_at: Utc::now(),
        };
        let mut guard = self.inner.lock().await;
        guard.replace(notification.clone(), Instant::now() + self.dismiss_after);
        notification
    }

    /// [`push`](Self::push) for callers that cannot await, such as drop
    /// handlers. If the slot is locked the push runs on a spawned task.
    pub fn push_detached(&self, message: impl Into<String>, kind: NotificationKind) {
        let message = message.into();
        if let Ok(mut guard) = self.inner.try_lock() {
            let notification = Notification {
                message,
                kind,
                created_at: Utc::now(),
            };
            guard.replace(notification, Instant::now() + self.dismiss_after);
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let notifier = self.clone();
                handle.spawn(async move {
                    notifier.push(message, kind).await;
                });
            }
            Err(_) => tracing::warn!("notification lost, no runtime: {message}"),
        }
    }

    pub async fn success(&self, message: impl Into<String>) -> Notification {
        self.push(message, NotificationKind::Success).await
    }

    pub async fn error(&self, message: impl Into<String>) -> Notification {
        self.push(message, NotificationKind::Error).await
    }

    pub async fn dismiss(&self) {
        self.inner.lock().await.slot = None;
    }

    /// The live notification, if its window has not elapsed.
    pub async fn active(&self) -> Option<Notification> {
        let mut guard = self.inner.lock().await;
        guard.prune(Instant::now());
        guard.slot.as_ref().map(|slot| slot.notification.clone())
    }

    /// When the live notification will be dismissed.
    pub async fn deadline(&self) -> Option<Instant> {
        let mut guard = self.inner.lock().await;
        guard.prune(Instant::now());
        guard.slot.as_ref().map(|slot| slot.deadline)
    }

    /// Sleeps until the current window closes, then clears it unless a newer
    /// push moved the deadline. Returns `true` if something was dismissed.
    pub async fn wait_dismiss(&self) -> bool {
        let Some(deadline) = self.deadline().await else {
            return false;
        };
        tokio::time::sleep_until(deadline).await;

        let mut guard = self.inner.lock().await;
        match &guard.slot {
            Some(slot) if slot.deadline <= Instant::now() => {
                guard.slot = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn push_then_full_window_clears() {
        let notifier = Notifier::default();
        notifier.success("Tugas diselesaikan!").await;
        assert!(notifier.active().await.is_some());

        tokio::time::advance(DEFAULT_DISMISS_AFTER).await;
        assert_eq!(notifier.active().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn second_push_replaces_and_restarts_window() {
        let notifier = Notifier::default();
        notifier.success("first").await;
        tokio::time::advance(Duration::from_secs(2)).await;

        notifier.error("second").await;
        tokio::time::advance(Duration::from_secs(2)).await;

        let active = notifier.active().await.unwrap();
        assert_eq!(active.message, "second");
        assert_eq!(active.kind, NotificationKind::Error);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(notifier.active().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_clears_immediately() {
        let notifier = Notifier::default();
        notifier.success("hello").await;
        notifier.dismiss().await;
        assert_eq!(notifier.active().await, None);
        assert!(!notifier.wait_dismiss().await);
    }

    #[tokio::test(start_paused = true)]
    async fn detached_push_lands_even_when_slot_is_busy() {
        let notifier = Notifier::default();
        notifier.push_detached("now", NotificationKind::Error);
        assert_eq!(notifier.active().await.unwrap().message, "now");

        let held = notifier.inner.lock().await;
        notifier.push_detached("later", NotificationKind::Error);
        drop(held);
        tokio::task::yield_now().await;
        assert_eq!(notifier.active().await.unwrap().message, "later");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_dismiss_fires_after_window() {
        let notifier = Notifier::new(Duration::from_secs(3));
        notifier.success("hello").await;
        let started = Instant::now();
        assert!(notifier.wait_dismiss().await);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(notifier.active().await, None);
    }
}
