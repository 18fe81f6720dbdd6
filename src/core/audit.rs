//! Audit log business logic.
//!
//! Writes immutable `assignment_logs` entries for every status transition and
//! `auto_close_failures` entries for assignments the scheduler could not close,
//! and serves paginated log history per assignment.

use crate::{
    entities::{
        Assignment, AssignmentLog, AssignmentStatus, AutoCloseFailure, ChangeReason,
        assignment_log::{self, LogMetadata},
        auto_close_failure,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::{fmt, str::FromStr};
use tracing::instrument;

/// Largest page size accepted by [`list_logs`].
pub const MAX_PAGE_SIZE: u64 = 100;

/// Fields of a new audit entry.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
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
    /// Structured metadata
    pub metadata: LogMetadata,
    /// Timestamp to record
    pub created_at: DateTime<Utc>,
}

/// Appends one entry to the audit log.
#[instrument(skip(db, entry), fields(assignment_id = entry.assignment_id))]
pub async fn record_transition<C>(db: &C, entry: NewLogEntry) -> Result<assignment_log::Model>
where
    C: ConnectionTrait,
{
    let model = assignment_log::ActiveModel {
        assignment_id: Set(entry.assignment_id),
        changed_by: Set(entry.changed_by),
        previous_status: Set(entry.previous_status),
        new_status: Set(entry.new_status),
        change_reason: Set(entry.change_reason),
        metadata: Set(entry.metadata.to_json()),
        created_at: Set(entry.created_at),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}

/// Records that the scheduler failed to close an assignment.
pub async fn record_failure<C>(
    db: &C,
    assignment_id: i64,
    scheduler_name: &str,
    error: &str,
    created_at: DateTime<Utc>,
) -> Result<auto_close_failure::Model>
where
    C: ConnectionTrait,
{
    let model = auto_close_failure::ActiveModel {
        assignment_id: Set(assignment_id),
        scheduler_name: Set(scheduler_name.to_string()),
        error: Set(error.to_string()),
        created_at: Set(created_at),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}

/// Filters and paging for [`list_logs`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    /// Only return entries with this reason
    #[serde(default, deserialize_with = "blank_as_none")]
    pub change_reason: Option<ChangeReason>,
    /// 1-based page number
    #[serde(default = "default_page", deserialize_with = "page_or_default")]
    pub page: u64,
    /// Entries per page
    #[serde(default = "default_limit", deserialize_with = "limit_or_default")]
    pub limit: u64,
}

/// Treats an empty query value (`?page=`) like a missing one.
fn blank_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

fn page_or_default<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(blank_as_none(deserializer)?.unwrap_or_else(default_page))
}

fn limit_or_default<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(blank_as_none(deserializer)?.unwrap_or_else(default_limit))
}

const fn default_page() -> u64 {
    1
}

const fn default_limit() -> u64 {
    20
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            change_reason: None,
            page: default_page(),
            limit: default_limit(),
        }
    }
}

/// One page of audit entries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    /// Entries on this page, newest first
    pub items: Vec<assignment_log::Model>,
    /// Total number of matching entries
    pub total: u64,
    /// 1-based page number
    pub page: u64,
    /// Requested page size
    pub limit: u64,
    /// Number of pages available
    pub total_pages: u64,
}

/// Returns the audit history of one assignment, newest first.
///
/// # Errors
/// * `Validation` if `page` is 0 or `limit` is outside `1..=100`
/// * `NotFound` if the assignment does not exist
#[instrument(skip(db))]
pub async fn list_logs<C>(db: &C, assignment_id: i64, query: &LogQuery) -> Result<LogPage>
where
    C: ConnectionTrait,
{
    if query.page == 0 {
        return Err(Error::validation("page must be at least 1"));
    }
    if query.limit == 0 || query.limit > MAX_PAGE_SIZE {
        return Err(Error::validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    Assignment::find_by_id(assignment_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("assignment", assignment_id))?;

    let mut select =
        AssignmentLog::find().filter(assignment_log::Column::AssignmentId.eq(assignment_id));
    if let Some(reason) = query.change_reason {
        select = select.filter(assignment_log::Column::ChangeReason.eq(reason));
    }

    let paginator = select
        .order_by_desc(assignment_log::Column::CreatedAt)
        .order_by_desc(assignment_log::Column::Id)
        .paginate(db, query.limit);
    let totals = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(query.page - 1).await?;

    Ok(LogPage {
        items,
        total: totals.number_of_items,
        page: query.page,
        limit: query.limit,
        total_pages: totals.number_of_pages,
    })
}

/// Returns every failure recorded for an assignment, newest first.
pub async fn failures_for_assignment<C>(
    db: &C,
    assignment_id: i64,
) -> Result<Vec<auto_close_failure::Model>>
where
    C: ConnectionTrait,
{
    AutoCloseFailure::find()
        .filter(auto_close_failure::Column::AssignmentId.eq(assignment_id))
        .order_by_desc(auto_close_failure::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}
