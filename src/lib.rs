pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod notifications;
pub mod payments;
pub mod reservation;
pub mod tickets;
pub mod utils;

pub use db::DbPool;

use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::mpsc;

use crate::api::ws::ViewerRegistry;
use crate::notifications::NotificationJob;
use crate::payments::PaymentService;
use crate::reservation::{ReservationCoordinator, SeatEventBus};

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub coordinator: ReservationCoordinator,
    /// None when payment processing is disabled in config.
    pub payments: Option<PaymentService>,
    pub events: SeatEventBus,
    pub notify_tx: mpsc::Sender<NotificationJob>,
    /// Live WebSocket viewer counts per train.
    pub viewers: ViewerRegistry,
    pub metrics_handle: Option<PrometheusHandle>,
    pub started_at: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        db: DbPool,
        coordinator: ReservationCoordinator,
        payments: Option<PaymentService>,
        events: SeatEventBus,
        notify_tx: mpsc::Sender<NotificationJob>,
    ) -> Self {
        Self {
            config,
            db,
            coordinator,
            payments,
            events,
            notify_tx,
            viewers: ViewerRegistry::new(),
            metrics_handle: None,
            started_at: std::time::Instant::now(),
        }
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
