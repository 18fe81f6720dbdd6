//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod assignment;
pub mod assignment_log;
pub mod auto_close_failure;
pub mod course;
pub mod scheduler_status;
pub mod user;

// Re-export specific types to avoid conflicts
pub use assignment::{
    AssignmentStatus, Column as AssignmentColumn, Entity as Assignment, Model as AssignmentModel,
};
pub use assignment_log::{
    ChangeReason, Column as AssignmentLogColumn, Entity as AssignmentLog,
    Model as AssignmentLogModel,
};
pub use auto_close_failure::{
    Column as AutoCloseFailureColumn, Entity as AutoCloseFailure, Model as AutoCloseFailureModel,
};
pub use course::{Column as CourseColumn, Entity as Course, Model as CourseModel};
pub use scheduler_status::{
    Column as SchedulerStatusColumn, Entity as SchedulerStatus, Model as SchedulerStatusModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, UserRole};
