//! Admin endpoints: train catalogue management and booking completion.
//!
//! Capacity edits go through the same guarded-UPDATE discipline as the
//! ledger: the availability check lives in the UPDATE's WHERE clause, so
//! a concurrent booking can never slip between a read and a write here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::trains::classes_for;
use crate::api::validation;
use crate::db::models::{
    serialize_json_list, Booking, BookingResponse, CreateTrainRequest, Train, TrainPagination,
    TrainResponse, TrainStatus, TrainSummary, UpdateTrainRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminTrainListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub search: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct AdminTrainListResponse {
    pub trains: Vec<TrainResponse>,
    pub pagination: TrainPagination,
}

#[derive(Debug, Serialize)]
pub struct TrainMutationResponse {
    pub message: String,
    pub train: TrainResponse,
}

#[derive(Debug, Serialize)]
pub struct DeleteTrainResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CompleteBookingResponse {
    pub message: String,
    pub booking: BookingResponse,
}

/// GET /api/admin/trains?page=&limit=&search=
pub async fn list_trains(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminTrainListQuery>,
) -> Result<Json<AdminTrainListResponse>, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    let (total, trains): (i64, Vec<Train>) = match query.search.as_deref().filter(|s| !s.is_empty())
    {
        Some(search) => {
            let pattern = format!("%{}%", search);
            let total = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM trains
                WHERE train_name LIKE ? OR train_number LIKE ? OR origin LIKE ? OR destination LIKE ?
                "#,
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&state.db)
            .await?;
            let rows = sqlx::query_as(
                r#"
                SELECT * FROM trains
                WHERE train_name LIKE ? OR train_number LIKE ? OR origin LIKE ? OR destination LIKE ?
                ORDER BY departure_time ASC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db)
            .await?;
            (total, rows)
        }
        None => {
            let total = sqlx::query_scalar("SELECT COUNT(*) FROM trains")
                .fetch_one(&state.db)
                .await?;
            let rows = sqlx::query_as(
                "SELECT * FROM trains ORDER BY departure_time ASC LIMIT ? OFFSET ?",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db)
            .await?;
            (total, rows)
        }
    };

    let mut out = Vec::with_capacity(trains.len());
    for train in trains {
        let classes = classes_for(&state.db, &train.id).await?;
        out.push(TrainResponse::from_train(train, classes));
    }

    Ok(Json(AdminTrainListResponse {
        trains: out,
        pagination: TrainPagination::new(total, page, limit),
    }))
}

fn validate_create_train(req: &CreateTrainRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validation::validate_train_name(&req.train_name) {
        errors.add("train_name", e);
    }
    if let Err(e) = validation::validate_train_number(&req.train_number) {
        errors.add("train_number", e);
    }
    if let Err(e) = validation::validate_station(&req.origin, "origin") {
        errors.add("origin", e);
    }
    if let Err(e) = validation::validate_station(&req.destination, "destination") {
        errors.add("destination", e);
    }
    if req.origin == req.destination {
        errors.add("destination", "Destination must differ from origin");
    }
    if let Err(e) = validation::validate_seats(req.total_seats) {
        errors.add("total_seats", e);
    }
    if req.arrival_time <= req.departure_time {
        errors.add("arrival_time", "Arrival must be after departure");
    }
    if let Err(e) = validation::validate_amenities(&req.amenities) {
        errors.add("amenities", e);
    }

    let mut seen = HashSet::new();
    for class in &req.classes {
        if let Err(e) = validation::validate_class_type(&class.class_type) {
            errors.add("classes", e);
        } else if !seen.insert(class.class_type.as_str()) {
            errors.add(
                "classes",
                format!("Duplicate fare class: {}", class.class_type),
            );
        }
        if let Err(e) = validation::validate_seats(class.total_seats) {
            errors.add("classes", format!("{}: {}", class.class_type, e));
        }
        if class.price_multiplier <= 0.0 {
            errors.add(
                "classes",
                format!("{}: price multiplier must be positive", class.class_type),
            );
        }
    }

    errors.finish()
}

/// POST /api/admin/trains
pub async fn create_train(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTrainRequest>,
) -> Result<(StatusCode, Json<TrainMutationResponse>), ApiError> {
    validate_create_train(&req)?;

    let duplicate: Option<(String,)> = sqlx::query_as("SELECT id FROM trains WHERE train_number = ?")
        .bind(&req.train_number)
        .fetch_optional(&state.db)
        .await?;
    if duplicate.is_some() {
        return Err(ApiError::conflict("A train with this number already exists"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let amenities = serialize_json_list(&req.amenities);

    let mut tx = state.db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO trains
        (id, train_name, train_number, origin, destination, departure_time, arrival_time,
         total_seats, available_seats, status, amenities, version, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, 0, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.train_name)
    .bind(&req.train_number)
    .bind(&req.origin)
    .bind(&req.destination)
    .bind(req.departure_time.to_rfc3339())
    .bind(req.arrival_time.to_rfc3339())
    .bind(req.total_seats)
    .bind(req.total_seats)
    .bind(&amenities)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    for class in &req.classes {
        sqlx::query(
            r#"
            INSERT INTO fare_classes
            (id, train_id, class_type, total_seats, available_seats, price_multiplier)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&id)
        .bind(&class.class_type)
        .bind(class.total_seats)
        .bind(class.total_seats)
        .bind(class.price_multiplier)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(train_id = %id, train_number = %req.train_number, "Train created");

    let train: Train = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    let classes = classes_for(&state.db, &id).await?;

    Ok((
        StatusCode::CREATED,
        Json(TrainMutationResponse {
            message: "Train created successfully".to_string(),
            train: TrainResponse::from_train(train, classes),
        }),
    ))
}

/// PUT /api/admin/trains/:id
pub async fn update_train(
    State(state): State<Arc<AppState>>,
    Path(train_id): Path<String>,
    Json(req): Json<UpdateTrainRequest>,
) -> Result<Json<TrainMutationResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(name) = &req.train_name {
        if let Err(e) = validation::validate_train_name(name) {
            errors.add("train_name", e);
        }
    }
    if let Some(origin) = &req.origin {
        if let Err(e) = validation::validate_station(origin, "origin") {
            errors.add("origin", e);
        }
    }
    if let Some(destination) = &req.destination {
        if let Err(e) = validation::validate_station(destination, "destination") {
            errors.add("destination", e);
        }
    }
    if let Some(seats) = req.total_seats {
        if let Err(e) = validation::validate_seats(seats) {
            errors.add("total_seats", e);
        }
    }
    if let Some(status) = &req.status {
        if status.parse::<TrainStatus>().is_err() {
            errors.add("status", "Status must be one of: active, inactive, cancelled");
        }
    }
    if let Some(amenities) = &req.amenities {
        if let Err(e) = validation::validate_amenities(amenities) {
            errors.add("amenities", e);
        }
    }
    errors.finish()?;

    let mut tx = state.db.begin().await?;

    let existing: Option<Train> = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
        .bind(&train_id)
        .fetch_optional(&mut *tx)
        .await?;
    let existing = existing.ok_or_else(|| ApiError::not_found("Train not found"))?;

    let train_name = req.train_name.unwrap_or_else(|| existing.train_name.clone());
    let origin = req.origin.unwrap_or_else(|| existing.origin.clone());
    let destination = req
        .destination
        .unwrap_or_else(|| existing.destination.clone());
    let departure_time = req
        .departure_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| existing.departure_time.clone());
    let arrival_time = req
        .arrival_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| existing.arrival_time.clone());
    let status = req.status.unwrap_or_else(|| existing.status.clone());
    let amenities = match &req.amenities {
        Some(list) => serialize_json_list(list),
        None => existing.amenities.clone(),
    };

    if origin == destination {
        return Err(ApiError::validation_field(
            "destination",
            "Destination must differ from origin",
        ));
    }
    if arrival_time <= departure_time {
        return Err(ApiError::validation_field(
            "arrival_time",
            "Arrival must be after departure",
        ));
    }

    let new_total = req.total_seats.unwrap_or(existing.total_seats);
    // Capacity edits move total and available by the same delta; booked
    // seats stay booked. The guard rejects any cut below what is sold.
    let seat_delta = new_total - existing.total_seats;

    let result = sqlx::query(
        r#"
        UPDATE trains
        SET train_name = ?, origin = ?, destination = ?, departure_time = ?, arrival_time = ?,
            total_seats = ?, available_seats = available_seats + ?, status = ?, amenities = ?,
            version = version + 1, updated_at = ?
        WHERE id = ? AND available_seats + ? >= 0
        "#,
    )
    .bind(&train_name)
    .bind(&origin)
    .bind(&destination)
    .bind(&departure_time)
    .bind(&arrival_time)
    .bind(new_total)
    .bind(seat_delta)
    .bind(&status)
    .bind(&amenities)
    .bind(Utc::now().to_rfc3339())
    .bind(&train_id)
    .bind(seat_delta)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request(
            "Cannot reduce seats below booked seats",
        ));
    }

    let train: Train = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
        .bind(&train_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(train_id = %train_id, "Train updated");

    let classes = classes_for(&state.db, &train_id).await?;
    Ok(Json(TrainMutationResponse {
        message: "Train updated successfully".to_string(),
        train: TrainResponse::from_train(train, classes),
    }))
}

/// DELETE /api/admin/trains/:id
pub async fn delete_train(
    State(state): State<Arc<AppState>>,
    Path(train_id): Path<String>,
) -> Result<Json<DeleteTrainResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM trains WHERE id = ?")
        .bind(&train_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Train not found"));
    }

    tracing::info!(train_id = %train_id, "Train deleted");

    Ok(Json(DeleteTrainResponse {
        message: "Train deleted successfully".to_string(),
    }))
}

/// POST /api/admin/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<Json<CompleteBookingResponse>, ApiError> {
    let booking: Booking = state.coordinator.complete_booking(&booking_id).await?;

    let train: Option<Train> = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
        .bind(&booking.train_id)
        .fetch_optional(&state.db)
        .await?;
    let summary = train.as_ref().map(TrainSummary::from);

    Ok(Json(CompleteBookingResponse {
        message: "Booking marked as completed".to_string(),
        booking: BookingResponse::from_booking(&booking, summary),
    }))
}
