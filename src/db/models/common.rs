//! Shared enums and helpers for row types.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Fare class labels accepted by the system.
pub const CLASS_TYPES: &[&str] = &[
    "AC",
    "Non-AC",
    "Sleeper",
    "Seater",
    "First Class",
    "Second Class",
];

/// Amenity tags accepted on a train.
pub const AMENITIES: &[&str] = &[
    "WiFi",
    "Food",
    "Charging",
    "Entertainment",
    "Blanket",
    "Pillow",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrainStatus {
    Active,
    Inactive,
    Cancelled,
}

impl std::fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TrainStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown train status: {}", s)),
        }
    }
}

/// Booking lifecycle states.
///
/// `PendingPayment` never reaches the bookings table: a payment-gated
/// booking is held as a payment_orders row until reconciliation, and is
/// persisted directly as `Confirmed` (or discarded). The variant exists
/// so the transition table covers the whole lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Legal transitions. Everything not listed is illegal, including
    /// self-transitions (a second cancel must be rejected, not absorbed).
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (Self::PendingPayment, Self::Confirmed)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::Confirmed, Self::Completed)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PendingPayment => write!(f, "pending-payment"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending-payment" => Ok(Self::PendingPayment),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Unknown booking status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(format!("Unknown payment status: {}", s)),
        }
    }
}

/// Helper to parse a JSON array stored in a TEXT column
pub fn parse_json_list<T: DeserializeOwned>(json: Option<&str>) -> Vec<T> {
    json.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

/// Helper to serialize a list for a TEXT column
pub fn serialize_json_list<T: Serialize>(items: &[T]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        serde_json::to_string(items).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_status_roundtrip() {
        for s in ["pending-payment", "confirmed", "cancelled", "completed"] {
            let status: BookingStatus = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("refunded".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_legal_transitions() {
        use BookingStatus::*;
        assert!(PendingPayment.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
    }

    #[test]
    fn test_illegal_transitions() {
        use BookingStatus::*;
        assert!(!Cancelled.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Confirmed));
        assert!(!PendingPayment.can_transition_to(Cancelled));
    }

    #[test]
    fn test_terminal_states() {
        use BookingStatus::*;
        assert!(Cancelled.is_terminal());
        assert!(Completed.is_terminal());
        assert!(!Confirmed.is_terminal());
        assert!(!PendingPayment.is_terminal());
    }
}
