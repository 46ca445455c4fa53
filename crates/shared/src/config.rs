//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppResult;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Bank reconciliation tuning.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Tuning knobs for the reconciliation matcher and the suspense sweep.
///
/// All thresholds are decimals in `[0, 1]`; amounts are in account currency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReconciliationConfig {
    /// Maximum distance in days between a statement line and a movement's
    /// value date for an exact match.
    #[serde(default = "default_date_tolerance_days")]
    pub date_tolerance_days: i64,
    /// Maximum absolute amount difference accepted by the fuzzy strategy.
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance: Decimal,
    /// Minimum description similarity accepted by the fuzzy strategy.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: Decimal,
    /// Confidence assigned to reference matches.
    #[serde(default = "default_reference_confidence")]
    pub reference_confidence: Decimal,
    /// Pairs below this confidence are left for manual action.
    #[serde(default = "default_min_auto_confidence")]
    pub min_auto_confidence: Decimal,
    /// Days an unmatched line may wait before the sweep parks it in suspense.
    #[serde(default = "default_suspense_grace_days")]
    pub suspense_grace_days: i64,
}

fn default_date_tolerance_days() -> i64 {
    3
}

fn default_amount_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

fn default_similarity_threshold() -> Decimal {
    Decimal::new(60, 2)
}

fn default_reference_confidence() -> Decimal {
    Decimal::new(85, 2)
}

fn default_min_auto_confidence() -> Decimal {
    Decimal::new(70, 2)
}

fn default_suspense_grace_days() -> i64 {
    30
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            date_tolerance_days: default_date_tolerance_days(),
            amount_tolerance: default_amount_tolerance(),
            similarity_threshold: default_similarity_threshold(),
            reference_confidence: default_reference_confidence(),
            min_auto_confidence: default_min_auto_confidence(),
            suspense_grace_days: default_suspense_grace_days(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` if a source cannot be read or a
    /// required field is missing.
    pub fn load() -> AppResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TREASURY").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
