//! User entity - the subset of LMS accounts the scheduler needs for authorization
//! and for attributing audit entries.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a user within the LMS.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Enrolled student
    #[sea_orm(string_value = "learner")]
    Learner,
    /// Course owner
    #[sea_orm(string_value = "instructor")]
    Instructor,
    /// Platform administrator
    #[sea_orm(string_value = "operator")]
    Operator,
}

impl UserRole {
    /// Whether this role may trigger the auto-close scheduler by hand.
    #[must_use]
    pub const fn can_trigger_scheduler(self) -> bool {
        matches!(self, Self::Instructor | Self::Operator)
    }

    /// Lowercase name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Learner => "learner",
            Self::Instructor => "instructor",
            Self::Operator => "operator",
        }
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Role used for authorization checks
    pub role: UserRole,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One instructor teaches many courses
    #[sea_orm(has_many = "super::course::Entity")]
    Courses,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Courses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
