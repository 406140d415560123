//! Booking endpoints: creation, listing, cancellation, and tickets.
//!
//! Seat accounting is never touched here. Every path that changes a
//! booking goes through the reservation coordinator so the counters and
//! the bookings table move together; handlers only shape requests and
//! responses and queue notifications after the fact.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::{metrics, validation};
use crate::db::models::{
    Booking, BookingListQuery, BookingResponse, CreateBookingRequest, Pagination, Passenger,
    Train, TrainSummary, User,
};
use crate::notifications::NotificationJob;
use crate::reservation::BookingFlow;
use crate::tickets::{self, TicketDocument};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    pub message: String,
    pub booking: BookingResponse,
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct CancelBookingResponse {
    pub message: String,
    pub booking: BookingResponse,
}

#[derive(Debug, Deserialize)]
pub struct VerifyTicketRequest {
    pub reference: Option<String>,
    pub qr_data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifiedBooking {
    pub reference: String,
    pub status: String,
    pub passengers: Vec<Passenger>,
    pub booking_time: String,
}

#[derive(Debug, Serialize)]
pub struct VerifiedTrain {
    pub name: String,
    pub number: String,
    pub route: String,
    pub departure: String,
    pub arrival: String,
}

#[derive(Debug, Serialize)]
pub struct VerifiedHolder {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyTicketResponse {
    pub valid: bool,
    pub expired: bool,
    pub booking: VerifiedBooking,
    pub train: VerifiedTrain,
    pub passenger: VerifiedHolder,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub message: String,
    pub ticket: TicketDocument,
}

async fn train_for(db: &crate::DbPool, train_id: &str) -> Result<Option<Train>, ApiError> {
    let train = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
        .bind(train_id)
        .fetch_optional(db)
        .await?;
    Ok(train)
}

/// Looks up a booking owned by the caller, or 404s without revealing
/// whether the id exists under another account.
async fn owned_booking(
    db: &crate::DbPool,
    booking_id: &str,
    user_id: &str,
) -> Result<Booking, ApiError> {
    let booking: Option<Booking> =
        sqlx::query_as("SELECT * FROM bookings WHERE id = ? AND user_id = ?")
            .bind(booking_id)
            .bind(user_id)
            .fetch_optional(db)
            .await?;
    booking.ok_or_else(|| ApiError::not_found("Booking not found"))
}

/// POST /api/bookings
pub async fn create(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_uuid(&req.train_id, "train_id") {
        errors.add("train_id", e);
    }
    if req.passengers.is_empty() {
        errors.add("passengers", "At least one passenger is required");
    }
    if let Some(class_type) = &req.class_type {
        if let Err(e) = validation::validate_class_type(class_type) {
            errors.add("class_type", e);
        }
    }
    errors.finish()?;

    let booking = state
        .coordinator
        .create_booking(
            &user.id,
            &req.train_id,
            &req.passengers,
            req.class_type.as_deref(),
            BookingFlow::Direct,
        )
        .await?;

    metrics::record_booking_created();

    let train = train_for(&state.db, &booking.train_id).await?;
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

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            message: "Booking confirmed successfully".to_string(),
            booking: BookingResponse::from_booking(&booking, summary),
        }),
    ))
}

/// GET /api/bookings?page=&limit=&status=
pub async fn list(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<BookingListResponse>, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    if let Some(status) = &query.status {
        if !matches!(status.as_str(), "confirmed" | "cancelled" | "completed") {
            return Err(ApiError::validation_field(
                "status",
                "Status must be one of: confirmed, cancelled, completed",
            ));
        }
    }

    let (total, bookings): (i64, Vec<Booking>) = match &query.status {
        Some(status) => {
            let total = sqlx::query_scalar(
                "SELECT COUNT(*) FROM bookings WHERE user_id = ? AND status = ?",
            )
            .bind(&user.id)
            .bind(status)
            .fetch_one(&state.db)
            .await?;
            let rows = sqlx::query_as(
                r#"
                SELECT * FROM bookings
                WHERE user_id = ? AND status = ?
                ORDER BY created_at DESC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(&user.id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db)
            .await?;
            (total, rows)
        }
        None => {
            let total = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE user_id = ?")
                .bind(&user.id)
                .fetch_one(&state.db)
                .await?;
            let rows = sqlx::query_as(
                r#"
                SELECT * FROM bookings
                WHERE user_id = ?
                ORDER BY created_at DESC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(&user.id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db)
            .await?;
            (total, rows)
        }
    };

    let mut out = Vec::with_capacity(bookings.len());
    for booking in &bookings {
        let summary = train_for(&state.db, &booking.train_id)
            .await?
            .as_ref()
            .map(TrainSummary::from);
        out.push(BookingResponse::from_booking(booking, summary));
    }

    Ok(Json(BookingListResponse {
        bookings: out,
        pagination: Pagination::new(total, page, limit),
    }))
}

/// GET /api/bookings/:id
pub async fn get(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = owned_booking(&state.db, &booking_id, &user.id).await?;
    let summary = train_for(&state.db, &booking.train_id)
        .await?
        .as_ref()
        .map(TrainSummary::from);
    Ok(Json(BookingResponse::from_booking(&booking, summary)))
}

/// PUT /api/bookings/:id/cancel
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(booking_id): Path<String>,
) -> Result<Json<CancelBookingResponse>, ApiError> {
    let booking = state.coordinator.cancel_booking(&booking_id, &user.id).await?;

    metrics::record_booking_cancelled();

    let train = train_for(&state.db, &booking.train_id).await?;
    let summary = train.as_ref().map(TrainSummary::from);

    let train_name = train
        .as_ref()
        .map(|t| t.train_name.clone())
        .unwrap_or_default();
    let job = NotificationJob::BookingCancelled {
        email: user.email.clone(),
        name: user.name.clone(),
        reference: booking.booking_reference.clone(),
        train_name,
    };
    if state.notify_tx.send(job).await.is_err() {
        tracing::warn!(booking_id = %booking.id, "Notification channel closed, cancellation notice not queued");
    }

    Ok(Json(CancelBookingResponse {
        message: "Booking cancelled successfully".to_string(),
        booking: BookingResponse::from_booking(&booking, summary),
    }))
}

/// POST /api/bookings/verify-ticket
pub async fn verify_ticket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyTicketRequest>,
) -> Result<Json<VerifyTicketResponse>, ApiError> {
    let reference = match (&req.reference, &req.qr_data) {
        (Some(reference), _) if !reference.is_empty() => reference.clone(),
        (_, Some(qr_data)) => tickets::reference_from_qr(qr_data)
            .ok_or_else(|| ApiError::bad_request("Invalid QR code data"))?,
        _ => {
            return Err(ApiError::bad_request(
                "Booking reference or QR data is required",
            ))
        }
    };

    let booking: Option<Booking> =
        sqlx::query_as("SELECT * FROM bookings WHERE booking_reference = ?")
            .bind(&reference)
            .fetch_optional(&state.db)
            .await?;
    let booking = booking.ok_or_else(|| ApiError::not_found("Ticket not found"))?;

    let train = train_for(&state.db, &booking.train_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Train not found"))?;

    let holder: Option<(String, String)> =
        sqlx::query_as("SELECT name, email FROM users WHERE id = ?")
            .bind(&booking.user_id)
            .fetch_optional(&state.db)
            .await?;
    let (holder_name, holder_email) = holder.unwrap_or_default();

    let verdict = tickets::verify(&booking.status, train.departure(), Utc::now());

    Ok(Json(VerifyTicketResponse {
        valid: verdict.valid,
        expired: verdict.expired,
        booking: VerifiedBooking {
            reference: booking.booking_reference.clone(),
            status: booking.status.clone(),
            passengers: booking.passenger_list(),
            booking_time: booking.created_at.clone(),
        },
        train: VerifiedTrain {
            name: train.train_name.clone(),
            number: train.train_number.clone(),
            route: format!("{} → {}", train.origin, train.destination),
            departure: train.departure_time.clone(),
            arrival: train.arrival_time.clone(),
        },
        passenger: VerifiedHolder {
            name: holder_name,
            email: holder_email,
        },
    }))
}

/// GET /api/bookings/:id/ticket
pub async fn ticket(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(booking_id): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    let booking = owned_booking(&state.db, &booking_id, &user.id).await?;

    if booking.status != "confirmed" {
        return Err(ApiError::bad_request(
            "Tickets are only available for confirmed bookings",
        ));
    }

    let train = train_for(&state.db, &booking.train_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Train not found"))?;

    Ok(Json(TicketResponse {
        message: "Ticket generated successfully".to_string(),
        ticket: TicketDocument::render(&booking, &train),
    }))
}
