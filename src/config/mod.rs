/// Database connection and table creation
pub mod database;

/// Scheduler and server settings loaded from config.toml
pub mod scheduler;

pub use scheduler::{AppConfig, SchedulerConfig, ServerConfig, load_app_config, load_config};
