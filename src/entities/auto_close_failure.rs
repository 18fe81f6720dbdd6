//! Auto-close failure entity - one row per assignment the scheduler failed to close.
//!
//! Successful transitions are recorded in `assignment_logs`; failures land here so
//! statistics can report real error counts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Auto-close failure database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "auto_close_failures")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Assignment that could not be closed
    pub assignment_id: i64,
    /// Scheduler that attempted the transition
    pub scheduler_name: String,
    /// Error description
    pub error: String,
    /// When the failure was recorded
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
