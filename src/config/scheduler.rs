//! Application configuration loading from config.toml
//!
//! The scheduler name, batch sizes and HTTP bind address are read from a TOML file.
//! Every field has a default, so an empty file (or a missing `[scheduler]` table)
//! yields a working configuration.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Auto-close scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the API listens on
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Auto-close scheduler settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Name of the row in `scheduler_status` this service owns
    pub name: String,
    /// Batch size used by system-invoked runs
    pub automatic_batch_size: u64,
    /// Batch size used by operator/instructor-invoked runs
    pub manual_batch_size: u64,
    /// Upper bound accepted for any requested batch size
    pub max_batch_size: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: "assignment_auto_close".to_string(),
            automatic_batch_size: 100,
            manual_batch_size: 50,
            max_batch_size: 1000,
        }
    }
}

impl AppConfig {
    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let scheduler = &self.scheduler;
        if scheduler.name.trim().is_empty() {
            return Err(Error::Config {
                message: "scheduler.name must not be empty".to_string(),
            });
        }
        if scheduler.max_batch_size == 0 {
            return Err(Error::Config {
                message: "scheduler.max_batch_size must be at least 1".to_string(),
            });
        }
        for (field, value) in [
            ("automatic_batch_size", scheduler.automatic_batch_size),
            ("manual_batch_size", scheduler.manual_batch_size),
        ] {
            if value == 0 || value > scheduler.max_batch_size {
                return Err(Error::Config {
                    message: format!(
                        "scheduler.{field} must be between 1 and {}, got {value}",
                        scheduler.max_batch_size
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Loads and validates configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A batch size is outside `1..=max_batch_size`
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    let config: AppConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `SCHEDULER_CONFIG`, or ./config.toml when unset.
///
/// A missing default file is not an error: built-in defaults are used instead.
pub fn load_app_config() -> Result<AppConfig> {
    match std::env::var("SCHEDULER_CONFIG") {
        Ok(path) => load_config(path),
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH),
        Err(_) => {
            info!("No {DEFAULT_CONFIG_PATH} found, using default configuration");
            Ok(AppConfig::default())
        }
    }
}
