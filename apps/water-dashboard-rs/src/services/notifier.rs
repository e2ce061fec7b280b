use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LeakDetected,
    LeakFixed,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeakDetected => "leak_detected",
            Self::LeakFixed => "leak_fixed",
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct Notification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn leak_detected(user_id: Uuid, flow_rate: f64, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            kind: NotificationKind::LeakDetected,
            message: format!("Leak detected! Abnormal flow detected: {flow_rate:.1} L/min"),
            at,
        }
    }

    pub fn leak_fixed(user_id: Uuid, water_saved_litres: i64, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            kind: NotificationKind::LeakFixed,
            message: format!("Leak fixed! You saved {water_saved_litres}L of water"),
            at,
        }
    }
}

/// Fan-out of user-visible alerts. Slow subscribers lose the oldest entries.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many subscribers received it.
    pub fn publish(&self, notification: Notification) -> usize {
        tracing::debug!(
            user_id = %notification.user_id,
            kind = ?notification.kind,
            "publishing notification"
        );
        self.tx.send(notification).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_notifications() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        let user_id = Uuid::new_v4();

        let delivered = notifier.publish(Notification::leak_detected(user_id, 31.26, Utc::now()));
        assert_eq!(delivered, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, NotificationKind::LeakDetected);
        assert_eq!(received.user_id, user_id);
        assert!(received.message.contains("31.3 L/min"));
    }

    #[test]
    fn publishing_without_subscribers_is_not_an_error() {
        let notifier = Notifier::default();
        let delivered = notifier.publish(Notification::leak_fixed(Uuid::new_v4(), 900, Utc::now()));
        assert_eq!(delivered, 0);
    }
}
