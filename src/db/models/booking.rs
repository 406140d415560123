//! Booking models, payment orders, and the booking reference generator.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::{parse_json_list, BookingStatus};
use super::train::TrainSummary;
use crate::utils::to_base36;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub name: String,
    pub age: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub train_id: String,
    pub fare_class: Option<String>,
    /// JSON array of passenger objects
    pub passengers: String,
    pub seat_count: i64,
    pub status: String,
    pub booking_reference: String,
    pub payment_order_id: Option<String>,
    pub payment_id: Option<String>,
    pub payment_signature: Option<String>,
    pub payment_amount: Option<i64>,
    pub payment_currency: Option<String>,
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
    pub paid_at: Option<String>,
    pub refund_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub cancelled_at: Option<String>,
}

impl Booking {
    pub fn passenger_list(&self) -> Vec<Passenger> {
        parse_json_list(Some(&self.passengers))
    }

    pub fn booking_status(&self) -> BookingStatus {
        self.status
            .parse()
            .unwrap_or(BookingStatus::Confirmed)
    }

    pub fn payment_info(&self) -> Option<PaymentInfo> {
        let order_id = self.payment_order_id.clone()?;
        Some(PaymentInfo {
            order_id,
            payment_id: self.payment_id.clone(),
            amount: self.payment_amount.unwrap_or(0),
            currency: self
                .payment_currency
                .clone()
                .unwrap_or_else(|| "INR".to_string()),
            status: self
                .payment_status
                .clone()
                .unwrap_or_else(|| "pending".to_string()),
            method: self.payment_method.clone(),
            paid_at: self.paid_at.clone(),
            refund_id: self.refund_id.clone(),
        })
    }
}

/// Generate a booking reference: a fixed prefix, the current unix time in
/// base 36, then five random characters. Uniqueness is enforced by the
/// database; the random tail keeps same-millisecond collisions unlikely.
pub fn generate_booking_reference() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    use rand::Rng;

    let millis = Utc::now().timestamp_millis().max(0) as u128;
    let mut rng = rand::rng();
    let suffix: String = (0..5)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();

    format!("TRB{}{}", to_base36(millis), suffix)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub order_id: String,
    pub payment_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub method: Option<String>,
    pub paid_at: Option<String>,
    pub refund_id: Option<String>,
}

/// A paid booking waits in this table until the gateway callback lands;
/// reconciliation turns the row into a confirmed booking.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentOrder {
    pub id: String,
    pub user_id: String,
    pub train_id: String,
    pub fare_class: Option<String>,
    pub passengers: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub status: String,
    pub created_at: String,
}

impl PaymentOrder {
    pub fn passenger_list(&self) -> Vec<Passenger> {
        parse_json_list(Some(&self.passengers))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub id: String,
    pub booking_reference: String,
    pub status: String,
    pub fare_class: Option<String>,
    pub passengers: Vec<Passenger>,
    pub seat_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub train: Option<TrainSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentInfo>,
    pub created_at: String,
    pub cancelled_at: Option<String>,
}

impl BookingResponse {
    pub fn from_booking(booking: &Booking, train: Option<TrainSummary>) -> Self {
        Self {
            id: booking.id.clone(),
            booking_reference: booking.booking_reference.clone(),
            status: booking.status.clone(),
            fare_class: booking.fare_class.clone(),
            passengers: booking.passenger_list(),
            seat_count: booking.seat_count,
            train,
            payment: booking.payment_info(),
            created_at: booking.created_at.clone(),
            cancelled_at: booking.cancelled_at.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub train_id: String,
    pub passengers: Vec<Passenger>,
    #[serde(default)]
    pub class_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub status: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub total_pages: i64,
    pub current_page: i64,
    pub total_bookings: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let limit = limit.max(1);
        let total_pages = (total + limit - 1) / limit;
        Self {
            total_pages,
            current_page: page,
            total_bookings: total,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}
