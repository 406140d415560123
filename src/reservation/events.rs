//! Post-commit seat-change events for real-time subscribers.

use serde::Serialize;
use tokio::sync::broadcast;

use super::ledger::SeatSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatAction {
    Booking,
    Cancellation,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatUpdate {
    pub train_id: String,
    pub available_seats: i64,
    pub total_seats: i64,
    pub occupancy_percentage: f64,
    pub action: SeatAction,
}

impl SeatUpdate {
    pub fn new(snapshot: &SeatSnapshot, action: SeatAction) -> Self {
        Self {
            train_id: snapshot.train_id.clone(),
            available_seats: snapshot.available_seats,
            total_seats: snapshot.total_seats,
            occupancy_percentage: snapshot.occupancy_percentage(),
            action,
        }
    }
}

/// Broadcast bus for seat updates. Publishing never blocks and never fails
/// the operation that produced the event; with no subscribers the update is
/// simply dropped.
#[derive(Debug, Clone)]
pub struct SeatEventBus {
    sender: broadcast::Sender<SeatUpdate>,
}

impl SeatEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, update: SeatUpdate) {
        let _ = self.sender.send(update);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SeatUpdate> {
        self.sender.subscribe()
    }
}

impl Default for SeatEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SeatSnapshot {
        SeatSnapshot {
            train_id: "t1".to_string(),
            available_seats: 40,
            total_seats: 100,
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_updates() {
        let bus = SeatEventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(SeatUpdate::new(&snapshot(), SeatAction::Booking));

        let update = rx.recv().await.unwrap();
        assert_eq!(update.train_id, "t1");
        assert_eq!(update.available_seats, 40);
        assert_eq!(update.occupancy_percentage, 60.0);
        assert_eq!(update.action, SeatAction::Booking);
    }

    #[test]
    fn test_publish_without_subscribers_is_a_no_op() {
        let bus = SeatEventBus::new(8);
        bus.publish(SeatUpdate::new(&snapshot(), SeatAction::Cancellation));
    }
}
