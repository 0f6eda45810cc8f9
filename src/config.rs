use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_DATABASE_URL: &str = "sqlite://forecast.db?mode=rwc";

/// Forecast engine settings.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastSettings {
    /// Trailing window of sales history fed to the model, in days
    #[validate(range(min = 7, max = 730))]
    pub history_window_days: u32,

    /// Forecast horizon in hours; one forecast point per started day
    #[validate(range(min = 24, max = 8760))]
    pub horizon_hours: u32,

    /// Below this many daily points the baseline model is used
    #[validate(range(min = 7))]
    pub min_history_points: usize,

    /// Number of trailing points held out when backtesting
    #[validate(range(min = 1))]
    pub holdout_days: usize,

    /// z-score used for the P10/P90 bands
    #[validate(range(min = 0.0, max = 5.0))]
    pub interval_z: f64,

    /// Baseline value when there is no history at all
    #[validate(range(min = 0.0))]
    pub baseline_default: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub baseline_p10_multiplier: f64,

    #[validate(range(min = 1.0))]
    pub baseline_p90_multiplier: f64,

    /// Accuracy reported for baseline forecasts
    #[validate(range(min = 0.0, max = 100.0))]
    pub baseline_accuracy: f64,

    /// Accuracy reported when the backtest has too little training data
    #[validate(range(min = 0.0, max = 100.0))]
    pub fallback_accuracy: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            history_window_days: 30,
            horizon_hours: 168,
            min_history_points: 7,
            holdout_days: 7,
            interval_z: 1.28,
            baseline_default: 5.0,
            baseline_p10_multiplier: 0.6,
            baseline_p90_multiplier: 1.8,
            baseline_accuracy: 60.0,
            fallback_accuracy: 70.0,
        }
    }
}

/// Reorder engine settings.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ReorderSettings {
    /// Safety stock as a share of lead time demand
    #[validate(range(min = 0.0, max = 10.0))]
    pub safety_stock_ratio: f64,

    /// Lead time demand multiplier of the aggressive alternative
    #[validate(range(min = 1.0, max = 10.0))]
    pub aggressive_multiplier: f64,

    /// Persist triggered suggestions whose quantity is zero or below
    pub persist_non_positive: bool,
}

impl Default for ReorderSettings {
    fn default() -> Self {
        Self {
            safety_stock_ratio: 0.2,
            aggressive_multiplier: 1.5,
            persist_non_positive: false,
        }
    }
}

/// Anomaly engine settings.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct AnomalySettings {
    #[validate(range(min = 7, max = 730))]
    pub window_days: u32,

    /// Minimum number of sales days before demand anomalies are evaluated
    #[validate(range(min = 2))]
    pub min_days: usize,

    /// Number of trailing days checked for spikes and drops
    #[validate(range(min = 1))]
    pub recent_days: usize,

    pub spike_sigma: f64,
    pub spike_mean_multiple: f64,
    pub high_spike_multiple: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub drop_ratio: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub high_drop_ratio: f64,
    pub drop_min_mean: f64,

    pub weekend_high_ratio: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub weekend_low_ratio: f64,
    pub min_weekday_observations: usize,
    pub min_weekend_observations: usize,

    pub stale_days: i64,
    pub very_stale_days: i64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub reserved_ratio: f64,
}

impl Default for AnomalySettings {
    fn default() -> Self {
        Self {
            window_days: 30,
            min_days: 7,
            recent_days: 3,
            spike_sigma: 2.0,
            spike_mean_multiple: 2.0,
            high_spike_multiple: 3.0,
            drop_ratio: 0.3,
            high_drop_ratio: 0.1,
            drop_min_mean: 5.0,
            weekend_high_ratio: 2.0,
            weekend_low_ratio: 0.3,
            min_weekday_observations: 3,
            min_weekend_observations: 2,
            stale_days: 30,
            very_stale_days: 60,
            reserved_ratio: 0.8,
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    #[serde(default)]
    #[validate]
    pub forecast: ForecastSettings,

    #[serde(default)]
    #[validate]
    pub reorder: ReorderSettings,

    #[serde(default)]
    #[validate]
    pub anomaly: AnomalySettings,
}

impl AppConfig {
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            db_max_connections: default_db_max_connections(),
            forecast: ForecastSettings::default(),
            reorder: ReorderSettings::default(),
            anomaly: AnomalySettings::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Cross-field checks the derive cannot express.
    fn validate_thresholds(&self) -> Result<(), AppConfigError> {
        if self.anomaly.very_stale_days < self.anomaly.stale_days {
            return Err(AppConfigError::Invalid(
                "anomaly.very_stale_days must be >= anomaly.stale_days".into(),
            ));
        }
        if self.anomaly.high_drop_ratio > self.anomaly.drop_ratio {
            return Err(AppConfigError::Invalid(
                "anomaly.high_drop_ratio must be <= anomaly.drop_ratio".into(),
            ));
        }
        if self.anomaly.high_spike_multiple < self.anomaly.spike_mean_multiple {
            return Err(AppConfigError::Invalid(
                "anomaly.high_spike_multiple must be >= anomaly.spike_mean_multiple".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

/// Validates log level values
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

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("inventory_forecast={},sea_orm=warn", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
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
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("environment", run_env.as_str())?
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
    app_config.validate_thresholds().map_err(|e| {
        error!("Configuration threshold validation failed: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new("sqlite::memory:".into(), "test".into())
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_thresholds().is_ok());
        assert!(!cfg.is_production());
    }

    #[test]
    fn defaults_match_engine_constants() {
        let cfg = base_config();
        assert_eq!(cfg.forecast.history_window_days, 30);
        assert_eq!(cfg.forecast.horizon_hours, 168);
        assert_eq!(cfg.forecast.interval_z, 1.28);
        assert_eq!(cfg.reorder.safety_stock_ratio, 0.2);
        assert_eq!(cfg.reorder.aggressive_multiplier, 1.5);
        assert_eq!(cfg.anomaly.recent_days, 3);
        assert_eq!(cfg.anomaly.reserved_ratio, 0.8);
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn nested_sections_are_validated() {
        let mut cfg = base_config();
        cfg.forecast.baseline_p10_multiplier = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_stale_thresholds_are_rejected() {
        let mut cfg = base_config();
        cfg.anomaly.very_stale_days = 10;
        assert!(matches!(
            cfg.validate_thresholds(),
            Err(AppConfigError::Invalid(_))
        ));
    }

    #[test]
    fn sections_deserialize_with_partial_overrides() {
        let raw = Config::builder()
            .set_default("database_url", "sqlite::memory:")
            .unwrap()
            .set_default("environment", "test")
            .unwrap()
            .set_override("reorder.safety_stock_ratio", 0.3)
            .unwrap()
            .build()
            .unwrap();
        let cfg: AppConfig = raw.try_deserialize().unwrap();
        assert_eq!(cfg.reorder.safety_stock_ratio, 0.3);
        assert_eq!(cfg.reorder.aggressive_multiplier, 1.5);
        assert_eq!(cfg.forecast.horizon_hours, 168);
    }
}
