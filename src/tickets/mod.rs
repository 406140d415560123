//! Ticket documents: rendered after commit, never inside the reservation
//! transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::models::{Booking, Passenger, Train, TrainSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketDocument {
    pub booking_id: String,
    pub reference: String,
    pub train: TrainSummary,
    pub passengers: Vec<Passenger>,
    pub seat_count: i64,
    pub fare_class: Option<String>,
    /// JSON payload embedded in the ticket's QR code.
    pub qr: String,
    pub issued_at: String,
}

impl TicketDocument {
    /// Pure function of a booking and its train.
    pub fn render(booking: &Booking, train: &Train) -> Self {
        Self {
            booking_id: booking.id.clone(),
            reference: booking.booking_reference.clone(),
            train: TrainSummary::from(train),
            passengers: booking.passenger_list(),
            seat_count: booking.seat_count,
            fare_class: booking.fare_class.clone(),
            qr: json!({ "reference": booking.booking_reference }).to_string(),
            issued_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn filename(&self) -> String {
        format!("ticket-{}.json", self.reference)
    }
}

/// Extract the booking reference from a scanned QR payload.
pub fn reference_from_qr(qr_data: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(qr_data).ok()?;
    value
        .get("reference")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TicketVerification {
    pub valid: bool,
    pub expired: bool,
}

/// A ticket is valid while the booking is confirmed and the train has not
/// yet departed. An unparseable departure counts as expired.
pub fn verify(status: &str, departure: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TicketVerification {
    let expired = match departure {
        Some(dep) => dep < now,
        None => true,
    };
    TicketVerification {
        valid: status == "confirmed" && !expired,
        expired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_qr_payload_roundtrip() {
        let payload = json!({ "reference": "TRBABC123XY" }).to_string();
        assert_eq!(
            reference_from_qr(&payload),
            Some("TRBABC123XY".to_string())
        );
    }

    #[test]
    fn test_qr_payload_rejects_garbage() {
        assert_eq!(reference_from_qr("not json"), None);
        assert_eq!(reference_from_qr(r#"{"other":"x"}"#), None);
    }

    #[test]
    fn test_confirmed_future_ticket_is_valid() {
        let now = Utc::now();
        let v = verify("confirmed", Some(now + Duration::hours(5)), now);
        assert!(v.valid);
        assert!(!v.expired);
    }

    #[test]
    fn test_departed_ticket_is_expired() {
        let now = Utc::now();
        let v = verify("confirmed", Some(now - Duration::hours(1)), now);
        assert!(!v.valid);
        assert!(v.expired);
    }

    #[test]
    fn test_cancelled_ticket_is_invalid() {
        let now = Utc::now();
        let v = verify("cancelled", Some(now + Duration::hours(5)), now);
        assert!(!v.valid);
        assert!(!v.expired);
    }
}
