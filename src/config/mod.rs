use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_port: default_api_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default = "default_admin_mobile")]
    pub admin_mobile: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
    #[serde(default = "default_otp_ttl_minutes")]
    pub otp_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_email: default_admin_email(),
            admin_mobile: default_admin_mobile(),
            admin_password: default_admin_password(),
            session_ttl_days: default_session_ttl_days(),
            otp_ttl_minutes: default_otp_ttl_minutes(),
        }
    }
}

fn default_admin_email() -> String {
    "admin@railbook.local".to_string()
}

fn default_admin_mobile() -> String {
    "+910000000000".to_string()
}

fn default_admin_password() -> String {
    // Generate a random password if not provided; logged once at startup
    uuid::Uuid::new_v4().to_string()
}

fn default_session_ttl_days() -> i64 {
    7
}

fn default_otp_ttl_minutes() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Maximum passengers per booking
    #[serde(default = "default_max_passengers")]
    pub max_passengers: usize,
    /// Cancellation is rejected within this many hours of departure
    #[serde(default = "default_cancellation_cutoff_hours")]
    pub cancellation_cutoff_hours: i64,
    /// Attempts per reservation transaction when storage reports busy/locked
    #[serde(default = "default_transaction_attempts")]
    pub transaction_attempts: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_passengers: default_max_passengers(),
            cancellation_cutoff_hours: default_cancellation_cutoff_hours(),
            transaction_attempts: default_transaction_attempts(),
        }
    }
}

fn default_max_passengers() -> usize {
    10
}

fn default_cancellation_cutoff_hours() -> i64 {
    2
}

fn default_transaction_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Gateway REST base URL
    #[serde(default = "default_payment_base_url")]
    pub base_url: String,
    /// Publishable key id, shared with clients for checkout
    pub key_id: Option<String>,
    /// Secret key; also signs the order|payment verification digest
    pub key_secret: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_payment_base_url(),
            key_id: None,
            key_secret: None,
            currency: default_currency(),
        }
    }
}

fn default_payment_base_url() -> String {
    "https://api.razorpay.com/v1".to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from_address: default_from_address(),
            from_name: default_from_name(),
            use_tls: default_use_tls(),
        }
    }
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "bookings@railbook.local".to_string()
}

fn default_from_name() -> String {
    "Railbook".to_string()
}

fn default_use_tls() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    /// When disabled, OTP codes are logged instead of sent
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_sms_base_url")]
    pub base_url: String,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_sms_base_url(),
            account_sid: None,
            auth_token: None,
            from_number: None,
        }
    }
}

fn default_sms_base_url() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            booking: BookingConfig::default(),
            payment: PaymentConfig::default(),
            email: EmailConfig::default(),
            sms: SmsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.server.api_port, 8080);
        assert_eq!(config.booking.max_passengers, 10);
        assert_eq!(config.booking.cancellation_cutoff_hours, 2);
        assert!(!config.payment.enabled);
        assert_eq!(config.payment.currency, "INR");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            api_port = 9090

            [booking]
            max_passengers = 6
            "#,
        )
        .unwrap();
        assert_eq!(config.server.api_port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.booking.max_passengers, 6);
        assert_eq!(config.booking.transaction_attempts, 3);
        assert_eq!(config.auth.session_ttl_days, 7);
    }
}
