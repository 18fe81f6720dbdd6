//! Assignment entity - the record the auto-close scheduler mutates.
//!
//! Only `published` assignments whose `due_date` has passed are eligible for
//! auto-close, and the transition to `closed` is always written conditionally on
//! the row still being `published`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Not yet visible to learners
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Open for submissions
    #[sea_orm(string_value = "published")]
    Published,
    /// No longer accepting submissions
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Assignment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignments")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the assignment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the course this assignment belongs to
    pub course_id: i64,
    /// Assignment title
    pub title: String,
    /// Current lifecycle status
    pub status: AssignmentStatus,
    /// Submission deadline
    pub due_date: DateTimeUtc,
    /// Whether submissions are accepted after the due date
    pub allow_late_submission: bool,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Assignment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each assignment belongs to one course
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    /// One assignment has many audit log entries
    #[sea_orm(has_many = "super::assignment_log::Entity")]
    Logs,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::assignment_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Logs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
