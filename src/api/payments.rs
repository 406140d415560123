//! Payment endpoints. Thin wrappers over the reconciliation service;
//! every handler refuses early when payments are disabled in config.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::metrics;
use crate::db::models::{BookingResponse, Passenger, Train, TrainSummary, User};
use crate::notifications::NotificationJob;
use crate::payments::{CreateOrderOutcome, GatewayPayment, PaymentService, RefundOutcome};
use crate::tickets::TicketDocument;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PaymentConfigResponse {
    pub key_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub train_id: String,
    pub class_type: String,
    pub passengers: Vec<Passenger>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub message: String,
    pub booking: BookingResponse,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub payment: GatewayPayment,
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: RefundOutcome,
}

fn payments(state: &AppState) -> Result<&PaymentService, ApiError> {
    state
        .payments
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Payment processing is not configured"))
}

/// GET /api/payments/config
pub async fn config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PaymentConfigResponse>, ApiError> {
    let service = payments(&state)?;
    Ok(Json(PaymentConfigResponse {
        key_id: service.key_id().to_string(),
    }))
}

/// POST /api/payments/order
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderOutcome>), ApiError> {
    let service = payments(&state)?;

    if req.train_id.is_empty() || req.class_type.is_empty() || req.passengers.is_empty() {
        return Err(ApiError::bad_request(
            "Train ID, passengers, and class type are required",
        ));
    }

    let outcome = service
        .create_order(&user.id, &req.train_id, &req.class_type, &req.passengers)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST /api/payments/verify
pub async fn verify(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let service = payments(&state)?;

    if req.order_id.is_empty() || req.payment_id.is_empty() || req.signature.is_empty() {
        return Err(ApiError::bad_request(
            "Order ID, payment ID, and signature are required",
        ));
    }

    let booking = service
        .verify_payment(&user.id, &req.order_id, &req.payment_id, &req.signature)
        .await?;

    metrics::record_payment_reconciled();

    let train: Option<Train> = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
        .bind(&booking.train_id)
        .fetch_optional(&state.db)
        .await?;
    let summary = train.as_ref().map(TrainSummary::from);

    if let Some(train) = &train {
        let ticket = TicketDocument::render(&booking, train);
        let job = NotificationJob::BookingConfirmed {
            email: user.email.clone(),
            name: user.name.clone(),
            ticket,
        };
        if state.notify_tx.send(job).await.is_err() {
            tracing::warn!(booking_id = %booking.id, "Notification channel closed, confirmation not queued");
        }
    }

    Ok(Json(VerifyPaymentResponse {
        message: "Payment verified and booking confirmed".to_string(),
        booking: BookingResponse::from_booking(&booking, summary),
    }))
}

/// GET /api/payments/status/:payment_id
pub async fn status(
    State(state): State<Arc<AppState>>,
    _user: User,
    Path(payment_id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let service = payments(&state)?;
    let payment = service.payment_status(&payment_id).await?;
    Ok(Json(PaymentStatusResponse { payment }))
}

/// POST /api/payments/refund/:booking_id
pub async fn refund(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(booking_id): Path<String>,
) -> Result<Json<RefundResponse>, ApiError> {
    let service = payments(&state)?;
    let outcome = service.refund(&user.id, &booking_id).await?;

    Ok(Json(RefundResponse {
        message: "Refund initiated successfully".to_string(),
        outcome,
    }))
}
