//! Prometheus metrics endpoint and HTTP request tracking middleware.
//!
//! This module provides:
//! - A `/api/system/metrics` endpoint that returns Prometheus-formatted metrics
//! - Middleware for tracking HTTP request counts and durations
//! - Helper functions to record booking and payment events

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::AppState;

// Metric names as constants for consistency
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const BOOKINGS_TOTAL: &str = "bookings_total";
pub const PAYMENTS_RECONCILED_TOTAL: &str = "payments_reconciled_total";
pub const TRAINS_ACTIVE: &str = "trains_active";
pub const BOOKINGS_CONFIRMED: &str = "bookings_confirmed";

/// Initialize the Prometheus metrics recorder and return a handle for rendering metrics.
///
/// This should be called once during application startup.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    // Register metric descriptions
    describe_counter!(
        HTTP_REQUESTS_TOTAL,
        "Total number of HTTP requests received"
    );
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(
        BOOKINGS_TOTAL,
        "Total number of booking events by action (created/cancelled)"
    );
    describe_counter!(
        PAYMENTS_RECONCILED_TOTAL,
        "Total number of payments reconciled into confirmed bookings"
    );
    describe_gauge!(TRAINS_ACTIVE, "Number of active trains in the catalogue");
    describe_gauge!(BOOKINGS_CONFIRMED, "Number of currently confirmed bookings");

    handle
}

/// GET /api/system/metrics - Returns Prometheus-formatted metrics.
///
/// This endpoint is accessible without authentication.
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Update gauge metrics before rendering
    update_gauge_metrics(&state).await;

    // Render metrics in Prometheus text format
    let handle = state.metrics_handle.as_ref();
    match handle {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Update gauge metrics (trains_active, bookings_confirmed) from current state.
async fn update_gauge_metrics(state: &AppState) {
    if let Ok(count) =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM trains WHERE status = 'active'")
            .fetch_one(&state.db)
            .await
    {
        gauge!(TRAINS_ACTIVE).set(count as f64);
    }

    if let Ok(count) =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE status = 'confirmed'")
            .fetch_one(&state.db)
            .await
    {
        gauge!(BOOKINGS_CONFIRMED).set(count as f64);
    }
}

/// Middleware to track HTTP request metrics.
///
/// Records:
/// - `http_requests_total` counter with method, path, and status labels
/// - `http_request_duration_seconds` histogram with method and path labels
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    // Extract path pattern (use matched path for templates like /bookings/:id)
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let method = request.method().to_string();

    // Process the request
    let response = next.run(request).await;

    // Record metrics
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

/// Record a booking confirmed through either flow.
pub fn record_booking_created() {
    counter!(BOOKINGS_TOTAL, "action" => "created").increment(1);
}

/// Record a booking cancellation.
pub fn record_booking_cancelled() {
    counter!(BOOKINGS_TOTAL, "action" => "cancelled").increment(1);
}

/// Record a payment turned into a booking by the reconciliation path.
pub fn record_payment_reconciled() {
    counter!(PAYMENTS_RECONCILED_TOTAL).increment(1);
    record_booking_created();
}
