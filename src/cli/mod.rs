//! CLI module for the Railbook command-line interface.
//!
//! Provides subcommands for interacting with a running Railbook server:
//! - `status` - Show server health, version, and uptime
//! - `trains list` - List active trains
//! - `trains show <train>` - Show details for a specific train
//! - `config check` - Validate configuration file
//! - `db seed` - Initialize the database and load demo trains

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "railbook")]
#[command(author, version, about = "A train search and booking backend", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "railbook.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API URL to connect to (default: http://localhost:8080)
    #[arg(long, env = "RAILBOOK_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Authentication token (can also be set via RAILBOOK_TOKEN env var)
    #[arg(long, env = "RAILBOOK_TOKEN")]
    pub token: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show server status (health, version, uptime)
    Status,

    /// Train management commands
    #[command(subcommand)]
    Trains(TrainsCommands),

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),
}

/// Trains subcommands
#[derive(Subcommand, Debug)]
pub enum TrainsCommands {
    /// List active trains
    List,
    /// Show details for a specific train
    Show {
        /// Train number, name, or ID
        train: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// Database subcommands
#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Initialize the database and insert demo trains
    Seed,
}

// ============================================================================
// API Response Types
// ============================================================================

/// Health status from /api/health
#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Train from /api/trains/all
#[derive(Debug, Deserialize)]
pub struct TrainSummary {
    pub id: String,
    pub train_name: String,
    pub train_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub total_seats: i64,
    pub available_seats: i64,
    pub status: String,
    pub duration: String,
    pub price: i64,
    #[serde(default)]
    pub classes: Vec<ClassSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ClassSummary {
    pub class_type: String,
    pub total_seats: i64,
    pub available_seats: i64,
    pub price: i64,
}

/// Envelope from /api/trains/all
#[derive(Debug, Deserialize)]
pub struct TrainsListResponse {
    pub trains: Vec<TrainSummary>,
    pub total_count: usize,
}

// ============================================================================
// CLI Command Handlers
// ============================================================================

/// Create an HTTP client with the given token
fn create_client(token: Option<&str>) -> Result<Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(token) = token {
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", token)
                .parse()
                .context("Invalid token format")?,
        );
    }

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}

/// Run a CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Status) => cmd_status(cli).await,
        Some(Commands::Trains(TrainsCommands::List)) => cmd_trains_list(cli).await,
        Some(Commands::Trains(TrainsCommands::Show { train })) => {
            cmd_trains_show(cli, train).await
        }
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli).await,
        Some(Commands::Db(DbCommands::Seed)) => cmd_db_seed(cli).await,
        None => {
            // No subcommand means start the server - this is handled in main.rs
            Ok(())
        }
    }
}

/// Display server status
async fn cmd_status(cli: &Cli) -> Result<()> {
    let client = create_client(cli.token.as_deref())?;
    let base_url = &cli.api_url;

    println!("Connecting to {}...", base_url);

    let health_url = format!("{}/api/health", base_url);
    let health_response = client
        .get(&health_url)
        .send()
        .await
        .context("Failed to connect to server. Is Railbook running?")?;

    if !health_response.status().is_success() {
        let status = health_response.status();
        let body = health_response.text().await.unwrap_or_default();
        anyhow::bail!("Server returned error {}: {}", status, body);
    }

    let health: HealthStatus = health_response
        .json()
        .await
        .context("Failed to parse health response")?;

    let healthy = health.status == "ok";
    let health_icon = if healthy { "[OK]" } else { "[!!]" };

    println!();
    println!("=== Railbook Server Status ===");
    println!();
    println!("Version:    v{}", health.version);
    println!(
        "Status:     {} {}",
        health_icon,
        if healthy { "Healthy" } else { "Unhealthy" }
    );
    println!("Uptime:     {}", format_duration(health.uptime_seconds));
    println!();

    Ok(())
}

/// List active trains
async fn cmd_trains_list(cli: &Cli) -> Result<()> {
    let client = create_client(cli.token.as_deref())?;
    let base_url = &cli.api_url;

    let url = format!("{}/api/trains/all", base_url);
    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to connect to server")?;

    if !response.status().is_success() {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            anyhow::bail!(
                "Authentication required. Use --token or set RAILBOOK_TOKEN environment variable."
            );
        }
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Server returned error {}: {}", status, body);
    }

    let list: TrainsListResponse = response
        .json()
        .await
        .context("Failed to parse trains response")?;

    if list.trains.is_empty() {
        println!("No trains found.");
        return Ok(());
    }

    // Print header
    println!();
    println!(
        "{:<10}  {:<24}  {:<32}  {:<16}  {:<11}  {:<9}",
        "NUMBER", "NAME", "ROUTE", "DEPARTURE", "SEATS", "STATUS"
    );
    println!("{}", "-".repeat(112));

    // Print trains
    for train in &list.trains {
        let route = format!("{} - {}", train.origin, train.destination);
        let seats = format!("{}/{}", train.available_seats, train.total_seats);
        println!(
            "{:<10}  {:<24}  {:<32}  {:<16}  {:<11}  {:<9}",
            train.train_number,
            truncate(&train.train_name, 24),
            truncate(&route, 32),
            format_departure(&train.departure_time),
            seats,
            train.status
        );
    }

    println!();
    println!("{} train(s)", list.total_count);
    println!();

    Ok(())
}

/// Show details for a specific train
async fn cmd_trains_show(cli: &Cli, identifier: &str) -> Result<()> {
    let client = create_client(cli.token.as_deref())?;
    let base_url = &cli.api_url;

    let train = find_train(&client, base_url, identifier).await?;

    println!();
    println!("=== Train: {} ===", train.train_name);
    println!();
    println!("ID:           {}", train.id);
    println!("Number:       {}", train.train_number);
    println!("Origin:       {}", train.origin);
    println!("Destination:  {}", train.destination);
    println!("Departure:    {}", format_departure(&train.departure_time));
    println!("Arrival:      {}", format_departure(&train.arrival_time));
    println!("Duration:     {}", train.duration);
    println!("Status:       {}", train.status);
    println!("Base Price:   {}", train.price);
    println!(
        "Seats:        {}/{} available",
        train.available_seats, train.total_seats
    );

    if !train.classes.is_empty() {
        println!();
        println!("Classes:");
        for class in &train.classes {
            println!(
                "  {:<10}  {:>7}/{:<7}  price {}",
                class.class_type, class.available_seats, class.total_seats, class.price
            );
        }
    }

    println!();
    Ok(())
}

/// Validate configuration file
async fn cmd_config_check(cli: &Cli) -> Result<()> {
    use crate::config::Config;

    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("A default configuration will be used when starting the server.");
        println!("To create a custom configuration, copy railbook.example.toml to railbook.toml");
        return Ok(());
    }

    // Try to load the configuration
    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            println!("=== Configuration Summary ===");
            println!();
            println!("Server:");
            println!("  Host:         {}", config.server.host);
            println!("  API Port:     {}", config.server.api_port);
            println!("  Data Dir:     {}", config.server.data_dir.display());
            println!();
            println!("Booking:");
            println!("  Max Passengers:      {}", config.booking.max_passengers);
            println!(
                "  Cancellation Cutoff: {} hours before departure",
                config.booking.cancellation_cutoff_hours
            );
            println!(
                "  Transaction Attempts: {}",
                config.booking.transaction_attempts
            );
            println!();
            println!("Auth:");
            println!("  Admin Email:  {}", config.auth.admin_email);
            println!("  Session TTL:  {} days", config.auth.session_ttl_days);
            println!("  OTP TTL:      {} minutes", config.auth.otp_ttl_minutes);
            println!();
            println!("Features:");
            println!(
                "  Payments:     {}",
                if config.payment.enabled {
                    "Enabled"
                } else {
                    "Disabled"
                }
            );
            println!(
                "  Email:        {}",
                if config.email.enabled {
                    "Enabled"
                } else {
                    "Disabled"
                }
            );
            println!(
                "  SMS:          {}",
                if config.sms.enabled {
                    "Enabled"
                } else {
                    "Disabled"
                }
            );
            println!();

            // Warnings
            let mut warnings = Vec::new();

            if config.payment.enabled
                && (config.payment.key_id.is_none() || config.payment.key_secret.is_none())
            {
                warnings.push(
                    "Payments enabled but key_id/key_secret not set - the server will refuse to start",
                );
            }

            if !config.payment.enabled {
                warnings.push("Payments disabled - bookings are confirmed without charging");
            }

            if !config.email.enabled {
                warnings.push("Email delivery disabled - tickets and confirmations are logged only");
            }

            if !config.sms.enabled {
                warnings.push("SMS delivery disabled - OTP codes are logged instead of sent");
            }

            if !warnings.is_empty() {
                println!("Warnings:");
                for warning in warnings {
                    println!("  [!] {}", warning);
                }
                println!();
            }

            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check the configuration file syntax and try again.");
            anyhow::bail!("Invalid configuration file");
        }
    }
}

/// Initialize the database and insert demo trains
async fn cmd_db_seed(cli: &Cli) -> Result<()> {
    use crate::config::Config;

    let config = Config::load(&cli.config)?;

    println!();
    println!("=== Railbook Database Seed ===");
    println!();

    crate::utils::ensure_dir(&config.server.data_dir)?;

    let db_path = config.server.data_dir.join("railbook.db");
    let pool = crate::db::init(&config.server.data_dir)
        .await
        .context("Failed to initialize database")?;
    println!("[OK] Database ready at {}", db_path.display());

    crate::api::auth::ensure_admin_user(&pool, &config.auth)
        .await
        .context("Failed to ensure admin user")?;
    println!("[OK] Admin user ensured ({})", config.auth.admin_email);

    crate::db::seed_demo_data(&pool)
        .await
        .context("Failed to seed demo trains")?;
    println!("[OK] Demo trains seeded");

    let (train_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trains")
        .fetch_one(&pool)
        .await?;

    println!();
    println!("{} train(s) in database.", train_count);
    println!();

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Find a train by number, name, or ID
async fn find_train(client: &Client, base_url: &str, identifier: &str) -> Result<TrainSummary> {
    // First try by ID (if it looks like a UUID)
    if identifier.len() == 36 && identifier.contains('-') {
        let url = format!("{}/api/trains/{}", base_url, identifier);
        let response = client.get(&url).send().await;

        if let Ok(resp) = response {
            if resp.status().is_success() {
                if let Ok(train) = resp.json::<TrainSummary>().await {
                    return Ok(train);
                }
            } else if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
                anyhow::bail!("Authentication required. Use --token or set RAILBOOK_TOKEN environment variable.");
            }
        }
    }

    // Try to find by number or name in the list
    let url = format!("{}/api/trains/all", base_url);
    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to fetch trains list")?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
        anyhow::bail!(
            "Authentication required. Use --token or set RAILBOOK_TOKEN environment variable."
        );
    }

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Failed to fetch trains: {} - {}", status, body);
    }

    let list: TrainsListResponse = response
        .json()
        .await
        .context("Failed to parse trains response")?;

    // Match number or name (case-insensitive)
    let identifier_lower = identifier.to_lowercase();
    for train in list.trains {
        if train.train_number.to_lowercase() == identifier_lower
            || train.train_name.to_lowercase() == identifier_lower
            || train.id == identifier
        {
            return Ok(train);
        }
    }

    anyhow::bail!("Train not found: {}", identifier);
}

/// Format an RFC 3339 timestamp as "YYYY-MM-DD HH:MM" for table output
fn format_departure(timestamp: &str) -> String {
    let cleaned = timestamp.replace('T', " ");
    truncate_plain(&cleaned, 16)
}

/// Format duration to human-readable string
fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Truncate a string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

/// Truncate a string to max length without ellipsis
fn truncate_plain(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        s[..max_len].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3725), "1h 2m 5s");
        assert_eq!(format_duration(90061), "1d 1h 1m");
    }

    #[test]
    fn test_format_departure() {
        assert_eq!(
            format_departure("2026-09-01T08:30:00+00:00"),
            "2026-09-01 08:30"
        );
        assert_eq!(format_departure("2026-09-01"), "2026-09-01");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long train name", 10), "a very ...");
    }
}
