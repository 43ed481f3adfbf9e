use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Notification, Notifier};
use crate::models::BotState;

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BotEvent {
    Notification(Notification),

    StatusChange {
        state: BotState,
        session_id: Option<Uuid>,
        timestamp: DateTime<Utc>,
    },

    /// Heartbeat/ping message
    Ping {
        timestamp: DateTime<Utc>,
    },
}

/// Notifier that fans events out over a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<BotEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BotEvent> {
        self.tx.subscribe()
    }

    fn send(&self, event: BotEvent) {
        // Ignore errors (no subscribers)
        if self.tx.send(event).is_err() {
            debug!("No subscribers for bot event");
        }
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        info!("[{:?}] {}: {}", notification.level, notification.title, notification.message);
        self.send(BotEvent::Notification(notification));
    }

    fn status_changed(&self, state: BotState, session_id: Option<Uuid>) {
        self.send(BotEvent::StatusChange {
            state,
            session_id,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationLevel;

    #[tokio::test]
    async fn test_notifications_reach_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();

        notifier.notify(Notification::success("Trade", "Bought 1 SOL of TOKEN"));
        notifier.status_changed(BotState::Running, None);

        match rx.recv().await.unwrap() {
            BotEvent::Notification(n) => {
                assert_eq!(n.level, NotificationLevel::Success);
                assert_eq!(n.title, "Trade");
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            BotEvent::StatusChange { state: BotState::Running, .. }
        ));
    }

    #[test]
    fn test_send_without_subscribers_is_silent() {
        let notifier = BroadcastNotifier::new(1);
        notifier.notify(Notification::info("Bot", "nobody listening"));
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(BotEvent::StatusChange {
            state: BotState::Idle,
            session_id: None,
            timestamp: Utc::now(),
        })
        .unwrap();
        assert_eq!(json["type"], "StatusChange");
        assert_eq!(json["data"]["state"], "idle");
    }
}
