//! Fire-and-forget reservation notifications.
//!
//! Delivery (mail, push, ...) is someone else's job: this only broadcasts
//! events to whoever subscribed. Publishing never blocks and never fails the
//! operation that triggered it.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::models::Reservation;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReservationEvent {
    Created {
        reservation_id: i32,
        item_id: i32,
        requester_id: i32,
    },
    Approved {
        reservation_id: i32,
        item_id: i32,
        requester_id: i32,
    },
    Rejected {
        reservation_id: i32,
        item_id: i32,
        requester_id: i32,
    },
}

impl ReservationEvent {
    pub fn created(r: &Reservation) -> Self {
        Self::Created {
            reservation_id: r.id,
            item_id: r.item_id,
            requester_id: r.requester_id,
        }
    }

    pub fn approved(r: &Reservation) -> Self {
        Self::Approved {
            reservation_id: r.id,
            item_id: r.item_id,
            requester_id: r.requester_id,
        }
    }

    pub fn rejected(r: &Reservation) -> Self {
        Self::Rejected {
            reservation_id: r.id,
            item_id: r.item_id,
            requester_id: r.requester_id,
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<ReservationEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReservationEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ReservationEvent) {
        // Err only means nobody is listening
        if self.sender.send(event).is_err() {
            tracing::debug!("No notification subscribers");
        }
    }

    /// Spawn a subscriber that logs every event
    pub fn spawn_log_listener(&self) -> JoinHandle<()> {
        let mut receiver = self.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(payload) => tracing::info!(target: "notifications", "{}", payload),
                        Err(e) => tracing::warn!("Failed to encode notification: {}", e),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Notification listener lagged, {} events dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let notifier = Notifier::new();
        notifier.publish(ReservationEvent::Created {
            reservation_id: 1,
            item_id: 2,
            requester_id: 3,
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let event = ReservationEvent::Rejected {
            reservation_id: 1,
            item_id: 2,
            requester_id: 3,
        };
        notifier.publish(event.clone());
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(ReservationEvent::Approved {
            reservation_id: 4,
            item_id: 5,
            requester_id: 6,
        })
        .unwrap();
        assert_eq!(json["event"], "approved");
        assert_eq!(json["reservation_id"], 4);
    }
}
