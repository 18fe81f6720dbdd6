//! Assignment log entity - the append-only audit trail of status transitions.
//!
//! Rows are written once per transition and never updated or deleted. The free-form
//! `metadata` column is stored as JSON; use [`Model::parsed_metadata`] to read it back
//! as a [`LogMetadata`].

use super::assignment::AssignmentStatus;
use crate::errors::Error;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Why a status transition happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// Changed by a person through the UI or API
    #[sea_orm(string_value = "manual")]
    Manual,
    /// Closed by the auto-close scheduler after the due date passed
    #[sea_orm(string_value = "auto_close")]
    AutoClose,
    /// Any other automated change
    #[sea_orm(string_value = "system")]
    System,
}

impl FromStr for ChangeReason {
    type Err = Error;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "manual" => Ok(Self::Manual),
            "auto_close" => Ok(Self::AutoClose),
            "system" => Ok(Self::System),
            other => Err(Error::validation(format!(
                "unknown change reason `{other}`, expected one of `manual`, `auto_close`, `system`"
            ))),
        }
    }
}

/// Metadata written by the auto-close scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCloseMetadata {
    /// Scheduler that performed the transition
    pub scheduler_name: String,
    /// Due date of the assignment at the time it was closed
    pub due_date: DateTimeUtc,
    /// When the transition was written
    pub processed_at: DateTimeUtc,
    /// Time spent closing this assignment, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

/// Metadata written for manual status changes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualMetadata {
    /// Optional free-text note from the person making the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Known metadata shapes, tagged by `kind` in storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum KnownMetadata {
    AutoClose(AutoCloseMetadata),
    Manual(ManualMetadata),
}

/// Typed view over the `metadata` column.
#[derive(Clone, Debug, PartialEq)]
pub enum LogMetadata {
    /// Written by the auto-close scheduler
    AutoClose(AutoCloseMetadata),
    /// Written by a manual status change
    Manual(ManualMetadata),
    /// Any payload that does not match a known shape
    Other(Json),
}

impl LogMetadata {
    /// Converts the metadata into its stored JSON form.
    #[must_use]
    pub fn to_json(&self) -> Json {
        let known = match self {
            Self::AutoClose(meta) => KnownMetadata::AutoClose(meta.clone()),
            Self::Manual(meta) => KnownMetadata::Manual(meta.clone()),
            Self::Other(value) => return value.clone(),
        };
        // Serializing plain structs of strings and timestamps cannot fail.
        serde_json::to_value(known).unwrap_or(Json::Null)
    }

    /// Parses stored JSON, falling back to [`LogMetadata::Other`] for unknown shapes.
    #[must_use]
    pub fn from_json(value: &Json) -> Self {
        match serde_json::from_value::<KnownMetadata>(value.clone()) {
            Ok(KnownMetadata::AutoClose(meta)) => Self::AutoClose(meta),
            Ok(KnownMetadata::Manual(meta)) => Self::Manual(meta),
            Err(_) => Self::Other(value.clone()),
        }
    }

    /// Processing time recorded in the metadata, if any.
    ///
    /// Foreign payloads may carry `duration` as an integer or a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_ms(&self) -> Option<f64> {
        match self {
            Self::AutoClose(meta) => meta.duration_ms.map(|ms| ms as f64),
            Self::Manual(_) => None,
            Self::Other(value) => value.get("duration").and_then(Json::as_f64),
        }
    }

    /// Scheduler named in the metadata, if the payload records one.
    #[must_use]
    pub fn scheduler_name(&self) -> Option<&str> {
        match self {
            Self::AutoClose(meta) => Some(meta.scheduler_name.as_str()),
            Self::Manual(_) => None,
            Self::Other(value) => value.get("schedulerName").and_then(Json::as_str),
        }
    }
}

/// Assignment log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignment_logs")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the log entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Assignment whose status changed
    pub assignment_id: i64,
    /// User the change is attributed to
    pub changed_by: i64,
    /// Status before the change
    pub previous_status: AssignmentStatus,
    /// Status after the change
    pub new_status: AssignmentStatus,
    /// Cause of the change
    pub change_reason: ChangeReason,
    /// JSON payload, see [`LogMetadata`]
    pub metadata: Json,
    /// When the change was recorded
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Returns the typed view of the `metadata` column.
    #[must_use]
    pub fn parsed_metadata(&self) -> LogMetadata {
        LogMetadata::from_json(&self.metadata)
    }
}

/// Defines relationships between `AssignmentLog` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each log entry belongs to one assignment
    #[sea_orm(
        belongs_to = "super::assignment::Entity",
        from = "Column::AssignmentId",
        to = "super::assignment::Column::Id"
    )]
    Assignment,
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
