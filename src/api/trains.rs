use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::db::{DbPool, FareClass, Train, TrainPagination, TrainResponse};
use crate::AppState;

/// Cap on the unfiltered listing.
const ALL_TRAINS_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
pub struct TrainListResponse {
    pub trains: Vec<TrainResponse>,
    pub total_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct TrainSearchQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    // Older clients send from/to
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchFilters {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Serialize)]
pub struct TrainSearchResponse {
    pub trains: Vec<TrainResponse>,
    pub pagination: TrainPagination,
    pub filters: SearchFilters,
}

#[derive(Debug, Serialize)]
pub struct RouteSummary {
    pub origin: String,
    pub destination: String,
    pub train_count: i64,
    pub available_trains: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
    pub popular_routes: Vec<RouteSummary>,
}

pub async fn classes_for(db: &DbPool, train_id: &str) -> Result<Vec<FareClass>, ApiError> {
    let classes =
        sqlx::query_as("SELECT * FROM fare_classes WHERE train_id = ? ORDER BY class_type")
            .bind(train_id)
            .fetch_all(db)
            .await?;
    Ok(classes)
}

/// GET /api/trains/all
pub async fn list_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TrainListResponse>, ApiError> {
    let trains: Vec<Train> = sqlx::query_as(
        "SELECT * FROM trains WHERE status = 'active' ORDER BY departure_time ASC LIMIT ?",
    )
    .bind(ALL_TRAINS_LIMIT)
    .fetch_all(&state.db)
    .await?;

    let mut out = Vec::with_capacity(trains.len());
    for train in trains {
        let classes = classes_for(&state.db, &train.id).await?;
        out.push(TrainResponse::from_train(train, classes));
    }

    Ok(Json(TrainListResponse {
        total_count: out.len(),
        trains: out,
    }))
}

/// GET /api/trains?origin=&destination=
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrainSearchQuery>,
) -> Result<Json<TrainSearchResponse>, ApiError> {
    let origin = query.origin.or(query.from).unwrap_or_default();
    let destination = query.destination.or(query.to).unwrap_or_default();

    if origin.is_empty() || destination.is_empty() {
        return Err(ApiError::bad_request("origin and destination are required"));
    }

    let now = Utc::now().to_rfc3339();
    let trains: Vec<Train> = sqlx::query_as(
        r#"
        SELECT * FROM trains
        WHERE origin = ? AND destination = ? AND status = 'active' AND departure_time > ?
        ORDER BY departure_time ASC
        "#,
    )
    .bind(&origin)
    .bind(&destination)
    .bind(&now)
    .fetch_all(&state.db)
    .await?;

    let mut out = Vec::with_capacity(trains.len());
    for train in trains {
        let classes = classes_for(&state.db, &train.id).await?;
        out.push(TrainResponse::from_train(train, classes));
    }

    Ok(Json(TrainSearchResponse {
        pagination: TrainPagination::single_page(out.len() as i64),
        trains: out,
        filters: SearchFilters {
            origin,
            destination,
        },
    }))
}

/// GET /api/trains/routes
pub async fn routes(State(state): State<Arc<AppState>>) -> Result<Json<RoutesResponse>, ApiError> {
    let origins: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT origin FROM trains WHERE status = 'active' ORDER BY origin")
            .fetch_all(&state.db)
            .await?;

    let destinations: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT destination FROM trains WHERE status = 'active' ORDER BY destination",
    )
    .fetch_all(&state.db)
    .await?;

    let rows: Vec<(String, String, String)> =
        sqlx::query_as("SELECT origin, destination, train_name FROM trains WHERE status = 'active'")
            .fetch_all(&state.db)
            .await?;

    let mut by_route: HashMap<(String, String), (i64, Vec<String>)> = HashMap::new();
    for (origin, destination, name) in rows {
        let entry = by_route.entry((origin, destination)).or_default();
        entry.0 += 1;
        if !entry.1.contains(&name) {
            entry.1.push(name);
        }
    }

    let mut popular_routes: Vec<RouteSummary> = by_route
        .into_iter()
        .map(|((origin, destination), (count, mut names))| {
            names.sort();
            RouteSummary {
                origin,
                destination,
                train_count: count,
                available_trains: names,
            }
        })
        .collect();
    popular_routes.sort_by(|a, b| {
        b.train_count
            .cmp(&a.train_count)
            .then_with(|| a.origin.cmp(&b.origin))
            .then_with(|| a.destination.cmp(&b.destination))
    });
    popular_routes.truncate(10);

    Ok(Json(RoutesResponse {
        origins: origins.into_iter().map(|(o,)| o).collect(),
        destinations: destinations.into_iter().map(|(d,)| d).collect(),
        popular_routes,
    }))
}

/// GET /api/trains/:id
pub async fn get_train(
    State(state): State<Arc<AppState>>,
    Path(train_id): Path<String>,
) -> Result<Json<TrainResponse>, ApiError> {
    let train: Option<Train> = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
        .bind(&train_id)
        .fetch_optional(&state.db)
        .await?;
    let train = train.ok_or_else(|| ApiError::not_found("Train not found"))?;

    let classes = classes_for(&state.db, &train.id).await?;
    Ok(Json(TrainResponse::from_train(train, classes)))
}
