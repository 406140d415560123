//! Payment gateway integration and reconciliation.

mod http;
mod reconcile;

pub use http::HttpGateway;
pub use reconcile::{CreateOrderOutcome, PaymentService, RefundOutcome};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reservation::ReservationError;

/// An order registered with the gateway before the client pays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in the gateway's minor unit (paise)
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub status: String,
}

/// A payment as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub method: Option<String>,
    /// Unix seconds
    pub created_at: i64,
}

impl GatewayPayment {
    /// Only captured or authorized payments count as paid.
    pub fn is_successful(&self) -> bool {
        self.status == "captured" || self.status == "authorized"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: i64,
    pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register an order for `amount` (major unit) with the gateway.
    async fn create_order(&self, amount: i64, currency: &str, receipt: &str)
        -> Result<GatewayOrder>;

    /// Check the gateway's signature over an order/payment pair.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment>;

    /// Refund `amount` (major unit) of a captured payment.
    async fn refund(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund>;
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Train ID, passengers, and class type are required")]
    MissingFields,

    #[error("At least one passenger is required")]
    NoPassengers,

    #[error("Payment order not found")]
    OrderNotFound,

    #[error("Invalid payment signature")]
    InvalidSignature,

    #[error("Payment not successful")]
    NotCaptured,

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("Only cancelled bookings can be refunded")]
    NotRefundable,

    #[error("Booking already refunded")]
    AlreadyRefunded,

    #[error("No payment found for this booking")]
    NoPayment,

    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error("payment gateway error: {0}")]
    Gateway(#[from] anyhow::Error),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}
