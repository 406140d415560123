//! Profile endpoints: account details, password changes, travel history,
//! and the saved passenger / favorite route conveniences.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::api::auth::{hash_password, verify_password};
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::db::models::{
    Booking, BookingResponse, BookingStats, ChangePasswordRequest, FavoriteRoute, ProfileResponse,
    SavePassengerRequest, SaveRouteRequest, SavedPassenger, Train, TrainSummary,
    UpdateProfileRequest, User, UserResponse,
};
use crate::DbPool;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TravelHistoryResponse {
    pub journeys: Vec<BookingResponse>,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SavedPassengersResponse {
    pub passengers: Vec<SavedPassenger>,
}

#[derive(Debug, Serialize)]
pub struct SavedPassengerResponse {
    pub message: String,
    pub passenger: SavedPassenger,
}

#[derive(Debug, Serialize)]
pub struct FavoriteRoutesResponse {
    pub routes: Vec<FavoriteRoute>,
}

#[derive(Debug, Serialize)]
pub struct FavoriteRouteResponse {
    pub message: String,
    pub route: FavoriteRoute,
}

async fn booking_stats(db: &DbPool, user_id: &str) -> Result<BookingStats, ApiError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(db)
        .await?;
    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM bookings WHERE user_id = ? AND status = 'confirmed'",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    let completed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM bookings WHERE user_id = ? AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    Ok(BookingStats {
        total_bookings: total,
        active_bookings: active,
        completed_bookings: completed,
    })
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<ProfileResponse>, ApiError> {
    let stats = booking_stats(&state.db, &user.id).await?;
    Ok(Json(ProfileResponse {
        user: user.into(),
        stats,
    }))
}

/// PUT /api/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(name) = &req.name {
        if let Err(e) = validation::validate_name(name) {
            errors.add("name", e);
        }
    }
    if let Some(email) = &req.email {
        if let Err(e) = validation::validate_email(email) {
            errors.add("email", e);
        }
    }
    if let Some(mobile) = &req.mobile {
        if let Err(e) = validation::validate_mobile(mobile) {
            errors.add("mobile", e);
        }
    }
    errors.finish()?;

    if let Some(email) = &req.email {
        let taken: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = ? AND id != ?")
                .bind(email)
                .bind(&user.id)
                .fetch_optional(&state.db)
                .await?;
        if taken.is_some() {
            return Err(ApiError::conflict("Email is already in use"));
        }
    }
    if let Some(mobile) = &req.mobile {
        let taken: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE mobile = ? AND id != ?")
                .bind(mobile)
                .bind(&user.id)
                .fetch_optional(&state.db)
                .await?;
        if taken.is_some() {
            return Err(ApiError::conflict("Mobile number is already in use"));
        }
    }

    let name = req.name.unwrap_or_else(|| user.name.clone());
    let email = req.email.unwrap_or_else(|| user.email.clone());
    let mobile = req.mobile.unwrap_or_else(|| user.mobile.clone());

    // A new email address must be re-verified before it can log in again.
    let verified = if email != user.email { 0 } else { user.verified };

    sqlx::query(
        "UPDATE users SET name = ?, email = ?, mobile = ?, verified = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&name)
    .bind(&email)
    .bind(&mobile)
    .bind(verified)
    .bind(Utc::now().to_rfc3339())
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    let updated: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&user.id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(UpdateProfileResponse {
        message: "Profile updated successfully".to_string(),
        user: updated.into(),
    }))
}

/// PUT /api/profile/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Err(e) = validation::validate_password(&req.new_password) {
        return Err(ApiError::validation_field("new_password", e));
    }

    if !verify_password(&req.current_password, &user.password_hash) {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let password_hash = hash_password(&req.new_password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(Utc::now().to_rfc3339())
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}

/// GET /api/profile/travel-history
pub async fn travel_history(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<TravelHistoryResponse>, ApiError> {
    let bookings: Vec<Booking> = sqlx::query_as(
        r#"
        SELECT * FROM bookings
        WHERE user_id = ? AND status IN ('completed', 'cancelled')
        ORDER BY created_at DESC
        "#,
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    let mut journeys = Vec::with_capacity(bookings.len());
    for booking in &bookings {
        let train: Option<Train> = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
            .bind(&booking.train_id)
            .fetch_optional(&state.db)
            .await?;
        let summary = train.as_ref().map(TrainSummary::from);
        journeys.push(BookingResponse::from_booking(booking, summary));
    }

    Ok(Json(TravelHistoryResponse {
        total_count: journeys.len(),
        journeys,
    }))
}

// -------------------------------------------------------------------------
// Saved passengers
// -------------------------------------------------------------------------

/// GET /api/profile/passengers
pub async fn list_passengers(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<SavedPassengersResponse>, ApiError> {
    let passengers: Vec<SavedPassenger> =
        sqlx::query_as("SELECT * FROM saved_passengers WHERE user_id = ? ORDER BY name")
            .bind(&user.id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(SavedPassengersResponse { passengers }))
}

fn validate_passenger_request(req: &SavePassengerRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_name(&req.name) {
        errors.add("name", e);
    }
    if !(1..=120).contains(&req.age) {
        errors.add("age", "Age must be between 1 and 120");
    }
    errors.finish()
}

/// POST /api/profile/passengers
pub async fn save_passenger(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<SavePassengerRequest>,
) -> Result<(StatusCode, Json<SavedPassengerResponse>), ApiError> {
    validate_passenger_request(&req)?;

    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO saved_passengers (id, user_id, name, age, relation, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&user.id)
    .bind(&req.name)
    .bind(req.age)
    .bind(&req.relation)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    let passenger: SavedPassenger = sqlx::query_as("SELECT * FROM saved_passengers WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SavedPassengerResponse {
            message: "Passenger saved successfully".to_string(),
            passenger,
        }),
    ))
}

/// PUT /api/profile/passengers/:id
pub async fn update_passenger(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(passenger_id): Path<String>,
    Json(req): Json<SavePassengerRequest>,
) -> Result<Json<SavedPassengerResponse>, ApiError> {
    validate_passenger_request(&req)?;

    let result = sqlx::query(
        "UPDATE saved_passengers SET name = ?, age = ?, relation = ? WHERE id = ? AND user_id = ?",
    )
    .bind(&req.name)
    .bind(req.age)
    .bind(&req.relation)
    .bind(&passenger_id)
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Saved passenger not found"));
    }

    let passenger: SavedPassenger = sqlx::query_as("SELECT * FROM saved_passengers WHERE id = ?")
        .bind(&passenger_id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(SavedPassengerResponse {
        message: "Passenger updated successfully".to_string(),
        passenger,
    }))
}

/// DELETE /api/profile/passengers/:id
pub async fn delete_passenger(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(passenger_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM saved_passengers WHERE id = ? AND user_id = ?")
        .bind(&passenger_id)
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Saved passenger not found"));
    }

    Ok(Json(MessageResponse {
        message: "Passenger removed successfully".to_string(),
    }))
}

// -------------------------------------------------------------------------
// Favorite routes
// -------------------------------------------------------------------------

/// GET /api/profile/routes
pub async fn list_routes(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<FavoriteRoutesResponse>, ApiError> {
    let routes: Vec<FavoriteRoute> =
        sqlx::query_as("SELECT * FROM favorite_routes WHERE user_id = ? ORDER BY added_at DESC")
            .bind(&user.id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(FavoriteRoutesResponse { routes }))
}

/// POST /api/profile/routes
pub async fn save_route(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<SaveRouteRequest>,
) -> Result<(StatusCode, Json<FavoriteRouteResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_station(&req.origin, "origin") {
        errors.add("origin", e);
    }
    if let Err(e) = validation::validate_station(&req.destination, "destination") {
        errors.add("destination", e);
    }
    errors.finish()?;

    let duplicate: Option<(String,)> = sqlx::query_as(
        "SELECT id FROM favorite_routes WHERE user_id = ? AND origin = ? AND destination = ?",
    )
    .bind(&user.id)
    .bind(&req.origin)
    .bind(&req.destination)
    .fetch_optional(&state.db)
    .await?;
    if duplicate.is_some() {
        return Err(ApiError::conflict("Route is already saved"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO favorite_routes (id, user_id, origin, destination, added_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&user.id)
    .bind(&req.origin)
    .bind(&req.destination)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    let route: FavoriteRoute = sqlx::query_as("SELECT * FROM favorite_routes WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(FavoriteRouteResponse {
            message: "Route saved successfully".to_string(),
            route,
        }),
    ))
}

/// DELETE /api/profile/routes/:id
pub async fn delete_route(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(route_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM favorite_routes WHERE id = ? AND user_id = ?")
        .bind(&route_id)
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Favorite route not found"));
    }

    Ok(Json(MessageResponse {
        message: "Route removed successfully".to_string(),
    }))
}
