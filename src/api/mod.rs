mod admin;
pub mod auth;
mod bookings;
mod error;
pub mod metrics;
mod payments;
mod profile;
mod trains;
mod validation;
pub mod ws;

use axum::{
    extract::State,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/login", post(auth::login))
        .route("/resend-otp", post(auth::resend_otp));

    // WebSocket routes (auth handled in handlers via query param)
    let ws_routes = Router::new().route("/ws/trains", get(ws::trains_ws));

    // Admin routes (role gate on top of the session gate)
    let admin_routes = Router::new()
        .route("/trains", get(admin::list_trains))
        .route("/trains", post(admin::create_train))
        .route("/trains/:id", put(admin::update_train))
        .route("/trains/:id", delete(admin::delete_train))
        .route("/bookings/:id/complete", post(admin::complete_booking))
        .layer(middleware::from_fn(auth::require_admin));

    // Protected API routes
    let api_routes = Router::new()
        // Trains
        .route("/trains", get(trains::search))
        .route("/trains/all", get(trains::list_all))
        .route("/trains/routes", get(trains::routes))
        .route("/trains/:id", get(trains::get_train))
        // Bookings
        .route("/bookings", post(bookings::create))
        .route("/bookings", get(bookings::list))
        .route("/bookings/verify-ticket", post(bookings::verify_ticket))
        .route("/bookings/:id", get(bookings::get))
        .route("/bookings/:id/cancel", put(bookings::cancel))
        .route("/bookings/:id/ticket", get(bookings::ticket))
        // Payments
        .route("/payments/config", get(payments::config))
        .route("/payments/order", post(payments::create_order))
        .route("/payments/verify", post(payments::verify))
        .route("/payments/status/:payment_id", get(payments::status))
        .route("/payments/refund/:booking_id", post(payments::refund))
        // Profile
        .route("/profile", get(profile::get_profile))
        .route("/profile", put(profile::update_profile))
        .route("/profile/password", put(profile::change_password))
        .route("/profile/travel-history", get(profile::travel_history))
        .route("/profile/passengers", get(profile::list_passengers))
        .route("/profile/passengers", post(profile::save_passenger))
        .route("/profile/passengers/:id", put(profile::update_passenger))
        .route("/profile/passengers/:id", delete(profile::delete_passenger))
        .route("/profile/routes", get(profile::list_routes))
        .route("/profile/routes", post(profile::save_route))
        .route("/profile/routes/:id", delete(profile::delete_route))
        // Admin
        .nest("/admin", admin_routes)
        // Protected by auth
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        // Merge WS routes (they handle their own auth)
        .merge(ws_routes);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/system/metrics", get(metrics::metrics_endpoint))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}
