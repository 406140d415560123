use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use railbook::cli::{run_command, Cli};
use railbook::config::Config;
use railbook::notifications::NotificationWorker;
use railbook::payments::PaymentService;
use railbook::reservation::{ReservationCoordinator, SeatEventBus};
use railbook::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Subcommands talk to a running server or the database and exit
    if cli.command.is_some() {
        return run_command(&cli).await;
    }

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Railbook v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data directory exists
    railbook::utils::ensure_dir(&config.server.data_dir)?;

    // Initialize database
    let db = railbook::db::init(&config.server.data_dir).await?;

    // Ensure default admin user exists
    railbook::api::auth::ensure_admin_user(&db, &config.auth).await?;

    // Reservation core: seat-event bus and transaction coordinator
    let events = SeatEventBus::default();
    let coordinator = ReservationCoordinator::new(db.clone(), events.clone(), &config.booking);

    // Payment service (None when disabled in config)
    let payments = PaymentService::from_config(&config.payment, db.clone(), coordinator.clone())?;

    // Notification channel and worker
    let (notify_tx, notify_rx) = mpsc::channel(100);
    let worker = NotificationWorker::new(&config, notify_rx)?;
    tokio::spawn(worker.run());

    // Prometheus metrics recorder
    let metrics_handle = railbook::api::metrics::init_metrics();

    // Create app state
    let state = Arc::new(
        AppState::new(
            config.clone(),
            db.clone(),
            coordinator,
            payments,
            events,
            notify_tx,
        )
        .with_metrics(metrics_handle),
    );

    // Create API router
    let app = railbook::api::create_router(state);

    // Start API server
    let api_addr = format!("{}:{}", config.server.host, config.server.api_port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;

    tracing::info!("API server listening on http://{}", api_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
