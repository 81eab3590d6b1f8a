//! Order API configuration module.
//!
//! Configuration is layered: built-in defaults, then an optional
//! `bistro.toml`, then `BISTRO_*` environment variables.
//!
//! ```text
//! BISTRO_PORT=8080 BISTRO_TAX_RATE_BPS=800 order-api
//! order-api --config prod.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use bistro_core::validation::validate_tax_rate_bps;
use bistro_core::{PricingEngine, TaxRate};
use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};
use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Largest real-world UTC offset, in minutes (UTC+14).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Command-line arguments of the `order-api` binary.
#[derive(Debug, Parser)]
#[command(name = "order-api", about = "Bistro order API server", long_about = None)]
pub struct Cli {
    /// Config file to load instead of `./bistro.toml`. Must exist.
    #[arg(short, long, env = "BISTRO_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Loads the configuration the arguments point at.
    pub fn load_config(&self) -> Result<ApiConfig, ConfigError> {
        ApiConfig::load(self.config.as_deref())
    }
}

/// Order API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind host
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Connection pool size
    pub max_connections: u32,

    /// Tax added after the discount, in basis points
    pub tax_rate_bps: u32,

    /// Bill reconciliation tolerance, in minor units
    pub bill_epsilon: i64,

    /// Store wall-clock offset from UTC. Unset means server local time.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_path: "./bistro.db".to_string(),
            max_connections: 5,
            tax_rate_bps: 0,
            bill_epsilon: bistro_core::DEFAULT_BILL_EPSILON,
            utc_offset_minutes: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration.
    ///
    /// `path` names a config file that must exist; without it an optional
    /// `bistro.toml` in the working directory is used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("bistro").required(false),
        };

        let config = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("database_path", defaults.database_path)?
            .set_default("max_connections", i64::from(defaults.max_connections))?
            .set_default("tax_rate_bps", i64::from(defaults.tax_rate_bps))?
            .set_default("bill_epsilon", defaults.bill_epsilon)?
            .add_source(file)
            .add_source(Environment::with_prefix("BISTRO").try_parsing(true))
            .build()?
            .try_deserialize::<ApiConfig>()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tax_rate_bps(self.tax_rate_bps)
            .map_err(|e| ConfigError::InvalidValue("tax_rate_bps".to_string(), e.to_string()))?;

        if self.bill_epsilon < 0 {
            return Err(ConfigError::InvalidValue(
                "bill_epsilon".to_string(),
                "must not be negative".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "max_connections".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        if let Some(offset) = self.utc_offset_minutes {
            if offset.abs() > MAX_UTC_OFFSET_MINUTES {
                return Err(ConfigError::InvalidValue(
                    "utc_offset_minutes".to_string(),
                    format!("must be within ±{}", MAX_UTC_OFFSET_MINUTES),
                ));
            }
        }

        Ok(())
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "host".to_string(),
                    format!("{}:{} is not a socket address", self.host, self.port),
                )
            })
    }

    /// Pricing engine for the configured tax rate and tolerance.
    pub fn engine(&self) -> PricingEngine {
        PricingEngine::new(TaxRate::from_bps(self.tax_rate_bps), self.bill_epsilon)
    }

    /// Converts an instant to store wall-clock time.
    pub fn store_time(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self.utc_offset_minutes {
            Some(offset) => instant.naive_utc() + Duration::minutes(i64::from(offset)),
            None => instant.with_timezone(&Local).naive_local(),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
