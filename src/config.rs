use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_DOCUMENT_PREFIX: &str = "SNX";
const DEFAULT_INVOICE_DUE_DAYS: u32 = 30;
const DEFAULT_NUMBER_RETRY_LIMIT: u32 = 3;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Requests running longer than this are answered with 408
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    /// Literal prefix of every generated document number
    #[serde(default = "default_document_prefix")]
    #[validate(custom = "validate_document_prefix")]
    pub document_prefix: String,

    /// VAT rate applied when a quote does not carry one (decimal fraction, 0.20 = 20%)
    #[serde(default = "default_vat_rate")]
    #[validate(custom = "validate_vat_rate")]
    pub default_vat_rate: Decimal,

    /// Days between invoice issue date and due date when none is given
    #[serde(default = "default_invoice_due_days")]
    pub invoice_due_days: u32,

    /// Attempts made for a document creation racing on its sequence number
    #[serde(default = "default_number_retry_limit")]
    #[validate(range(min = 1, max = 10))]
    pub number_retry_limit: u32,
}

impl AppConfig {
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            document_prefix: default_document_prefix(),
            default_vat_rate: default_vat_rate(),
            invoice_due_days: default_invoice_due_days(),
            number_retry_limit: default_number_retry_limit(),
        }
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Document rules handed to the command layer.
    pub fn document_settings(&self) -> DocumentSettings {
        DocumentSettings {
            prefix: self.document_prefix.clone(),
            default_vat_rate: self.default_vat_rate,
            invoice_due_days: self.invoice_due_days,
            number_retry_limit: self.number_retry_limit,
        }
    }
}

/// Business settings shared by every document command
#[derive(Clone, Debug)]
pub struct DocumentSettings {
    pub prefix: String,
    pub default_vat_rate: Decimal,
    pub invoice_due_days: u32,
    pub number_retry_limit: u32,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            prefix: default_document_prefix(),
            default_vat_rate: default_vat_rate(),
            invoice_due_days: default_invoice_due_days(),
            number_retry_limit: default_number_retry_limit(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_request_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_document_prefix() -> String {
    DEFAULT_DOCUMENT_PREFIX.to_string()
}

fn default_vat_rate() -> Decimal {
    dec!(0.20)
}

fn default_invoice_due_days() -> u32 {
    DEFAULT_INVOICE_DUE_DAYS
}

fn default_number_retry_limit() -> u32 {
    DEFAULT_NUMBER_RETRY_LIMIT
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_vat_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() || *rate > Decimal::ONE {
        let mut err = ValidationError::new("default_vat_rate");
        err.message = Some("default_vat_rate must be a fraction between 0 and 1".into());
        return Err(err);
    }
    Ok(())
}

fn validate_document_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("document_prefix");
        err.message = Some("document_prefix must be non-empty ASCII alphanumerics".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("orderchain_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter_directive));

    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing already initialised: {}", e);
    }
}

pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://orderchain.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        )
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.default_vat_rate, dec!(0.20));
        assert_eq!(cfg.document_prefix, "SNX");
        assert_eq!(cfg.invoice_due_days, 30);
    }

    #[test]
    fn vat_rate_outside_unit_interval_is_rejected() {
        let mut cfg = base_config();
        cfg.default_vat_rate = dec!(20);
        assert!(cfg.validate().is_err());

        cfg.default_vat_rate = dec!(-0.1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn prefix_must_be_alphanumeric() {
        let mut cfg = base_config();
        cfg.document_prefix = "SN-X".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_retry_limit_is_rejected() {
        let mut cfg = base_config();
        cfg.number_retry_limit = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn document_settings_mirror_config() {
        let mut cfg = base_config();
        cfg.document_prefix = "ACME".into();
        let settings = cfg.document_settings();
        assert_eq!(settings.prefix, "ACME");
        assert_eq!(settings.number_retry_limit, 3);
    }
}
