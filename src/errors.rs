//! Unified error type for the scheduler service.
//!
//! Per-assignment failures during an auto-close run are not errors in this sense:
//! they are collected into [`crate::core::auto_close::AutoCloseResult::errors`].
//! Everything here aborts the current operation and is reported to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("User {user_id} not found")]
    Unauthorized { user_id: i64 },

    #[error("User {user_id} with role '{role}' may not perform this action")]
    NotAuthorized { user_id: i64, role: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Scheduler '{scheduler_name}' is already running")]
    SchedulerAlreadyRunning { scheduler_name: String },

    #[error("Auto-close run of '{scheduler_name}' failed: {message}")]
    AutoCloseFailed {
        scheduler_name: String,
        message: String,
    },
}

impl Error {
    /// Stable machine-readable code used in API error bodies.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Io(_) | Self::EnvVar(_) => "INTERNAL_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::SchedulerAlreadyRunning { .. } => "SCHEDULER_ALREADY_RUNNING",
            Self::AutoCloseFailed { .. } => "AUTO_CLOSE_FAILED",
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
