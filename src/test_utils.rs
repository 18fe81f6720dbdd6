//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::SchedulerConfig,
    core::status,
    entities::{AssignmentStatus, UserRole, assignment, course, user},
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Scheduler name used by all tests.
pub const TEST_SCHEDULER: &str = "test_auto_close";

/// Scheduler configuration pointing at [`TEST_SCHEDULER`].
#[must_use]
pub fn test_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        name: TEST_SCHEDULER.to_string(),
        ..SchedulerConfig::default()
    }
}

/// A timestamp `days` days from now (negative for the past).
#[must_use]
pub fn days_from_now(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Test database with the [`TEST_SCHEDULER`] status row seeded.
pub async fn setup_scheduler_db() -> Result<DatabaseConnection> {
    let db = setup_test_db().await?;
    status::ensure_status_row(&db, TEST_SCHEDULER).await?;
    Ok(db)
}

/// Creates a user with the given role.
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    role: UserRole,
) -> Result<user::Model> {
    let model = user::ActiveModel {
        name: Set(name.to_string()),
        role: Set(role),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Creates a course taught by `instructor_id`.
pub async fn create_test_course(
    db: &DatabaseConnection,
    title: &str,
    instructor_id: i64,
) -> Result<course::Model> {
    let model = course::ActiveModel {
        title: Set(title.to_string()),
        instructor_id: Set(instructor_id),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Creates an assignment with the given status and due date.
///
/// # Defaults
/// * `title`: "Test Assignment"
/// * `allow_late_submission`: false
pub async fn create_test_assignment(
    db: &DatabaseConnection,
    course_id: i64,
    status: AssignmentStatus,
    due_date: DateTime<Utc>,
) -> Result<assignment::Model> {
    let model = assignment::ActiveModel {
        course_id: Set(course_id),
        title: Set("Test Assignment".to_string()),
        status: Set(status),
        due_date: Set(due_date),
        allow_late_submission: Set(false),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Sets up a database with an instructor and one course they teach.
/// Returns (db, instructor, course).
pub async fn setup_with_course() -> Result<(DatabaseConnection, user::Model, course::Model)> {
    let db = setup_test_db().await?;
    let instructor = create_test_user(&db, "Ada", UserRole::Instructor).await?;
    let course = create_test_course(&db, "Systems Programming", instructor.id).await?;
    Ok((db, instructor, course))
}

/// Same as [`setup_with_course`] with the scheduler status row seeded.
pub async fn setup_scheduler_with_course()
-> Result<(DatabaseConnection, user::Model, course::Model)> {
    let (db, instructor, course) = setup_with_course().await?;
    status::ensure_status_row(&db, TEST_SCHEDULER).await?;
    Ok((db, instructor, course))
}
