//! Scheduler status entity - one row per scheduler holding run counters.
//!
//! The row is seeded at startup and never deleted. `is_running` doubles as the
//! run lock: it is only ever flipped to `true` by a conditional update that also
//! requires it to be `false`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Scheduler status database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scheduler_status")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Name of the scheduler this row tracks
    #[sea_orm(unique)]
    pub scheduler_name: String,
    /// Whether a run is currently in progress
    pub is_running: bool,
    /// When the last run started
    pub last_run_at: Option<DateTimeUtc>,
    /// When the last run completed without a fatal error
    pub last_success_at: Option<DateTimeUtc>,
    /// When the last fatal error occurred
    pub last_error_at: Option<DateTimeUtc>,
    /// Message of the last fatal error
    pub last_error_message: Option<String>,
    /// Number of runs started
    pub run_count: i64,
    /// Number of assignments closed across all runs
    pub success_count: i64,
    /// Number of per-assignment and fatal errors across all runs
    pub error_count: i64,
    /// When the row was seeded
    pub created_at: DateTimeUtc,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
}

/// `SchedulerStatus` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
