//! Scheduler status store.
//!
//! Keeps one `scheduler_status` row per scheduler name and implements the run
//! lifecycle transitions used by the auto-close engine. Acquiring a run is a single
//! conditional `UPDATE ... WHERE is_running = false`, so two callers racing to start
//! cannot both succeed.

use crate::{
    entities::{SchedulerStatus, scheduler_status},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Status row plus values derived at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatusView {
    /// The persisted status row
    #[serde(flatten)]
    pub status: scheduler_status::Model,
    /// Seconds since the row was seeded
    pub uptime_seconds: i64,
    /// `success_count / run_count * 100`, rounded to two decimals
    pub success_rate: f64,
}

/// Computes the success rate percentage, rounded to two decimals.
///
/// Returns `0.0` when no run has been recorded yet.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn success_rate(success_count: i64, run_count: i64) -> f64 {
    if run_count <= 0 {
        return 0.0;
    }
    let rate = success_count as f64 / run_count as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Creates the status row for `name` if it does not exist yet and returns it.
///
/// Called once at startup; an existing row is left untouched.
#[instrument(skip(db))]
pub async fn ensure_status_row<C>(db: &C, name: &str) -> Result<scheduler_status::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_status_row(db, name).await? {
        return Ok(existing);
    }

    let now = Utc::now();
    let row = scheduler_status::ActiveModel {
        scheduler_name: Set(name.to_string()),
        is_running: Set(false),
        last_run_at: Set(None),
        last_success_at: Set(None),
        last_error_at: Set(None),
        last_error_message: Set(None),
        run_count: Set(0),
        success_count: Set(0),
        error_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let inserted = row.insert(db).await?;
    info!(scheduler = name, "Seeded scheduler status row");
    Ok(inserted)
}

async fn find_status_row<C>(db: &C, name: &str) -> Result<Option<scheduler_status::Model>>
where
    C: ConnectionTrait,
{
    SchedulerStatus::find()
        .filter(scheduler_status::Column::SchedulerName.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the raw status row, or `NotFound` if it was never seeded.
pub async fn get_status_row<C>(db: &C, name: &str) -> Result<scheduler_status::Model>
where
    C: ConnectionTrait,
{
    find_status_row(db, name)
        .await?
        .ok_or_else(|| Error::not_found("scheduler status", name))
}

/// Returns the status row together with uptime and success rate.
#[instrument(skip(db))]
pub async fn get_status<C>(db: &C, name: &str) -> Result<SchedulerStatusView>
where
    C: ConnectionTrait,
{
    let status = get_status_row(db, name).await?;
    let uptime_seconds = (Utc::now() - status.created_at).num_seconds().max(0);
    let success_rate = success_rate(status.success_count, status.run_count);

    Ok(SchedulerStatusView {
        status,
        uptime_seconds,
        success_rate,
    })
}

/// Whether a run is currently marked as in progress.
pub async fn is_running<C>(db: &C, name: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(get_status_row(db, name).await?.is_running)
}

/// Marks a run as started: `is_running = true`, `last_run_at = now`, `run_count + 1`.
///
/// Without `force` the update only matches a row that is not running, which makes
/// the check and the write one statement. With `force` the running flag is ignored.
#[instrument(skip(db, now))]
pub(crate) async fn begin_run<C>(db: &C, name: &str, force: bool, now: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut update = SchedulerStatus::update_many()
        .col_expr(scheduler_status::Column::IsRunning, Expr::value(true))
        .col_expr(scheduler_status::Column::LastRunAt, Expr::value(now))
        .col_expr(
            scheduler_status::Column::RunCount,
            Expr::col(scheduler_status::Column::RunCount).add(1),
        )
        .col_expr(scheduler_status::Column::UpdatedAt, Expr::value(now))
        .filter(scheduler_status::Column::SchedulerName.eq(name));
    if !force {
        update = update.filter(scheduler_status::Column::IsRunning.eq(false));
    }

    let result = update.exec(db).await?;
    if result.rows_affected > 0 {
        debug!(scheduler = name, force, "Acquired scheduler run");
        return Ok(());
    }

    // Nothing matched: either the row is missing or another run holds it.
    get_status_row(db, name).await?;
    Err(Error::SchedulerAlreadyRunning {
        scheduler_name: name.to_string(),
    })
}

/// Clears the running flag without touching any counter (dry runs).
pub(crate) async fn release<C>(db: &C, name: &str, now: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    SchedulerStatus::update_many()
        .col_expr(scheduler_status::Column::IsRunning, Expr::value(false))
        .col_expr(scheduler_status::Column::UpdatedAt, Expr::value(now))
        .filter(scheduler_status::Column::SchedulerName.eq(name))
        .exec(db)
        .await?;
    Ok(())
}

/// Records a completed run and clears the running flag.
pub(crate) async fn finish_success<C>(
    db: &C,
    name: &str,
    processed: usize,
    errors: usize,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let processed = i64::try_from(processed).unwrap_or(i64::MAX);
    let errors = i64::try_from(errors).unwrap_or(i64::MAX);

    SchedulerStatus::update_many()
        .col_expr(scheduler_status::Column::IsRunning, Expr::value(false))
        .col_expr(scheduler_status::Column::LastSuccessAt, Expr::value(now))
        .col_expr(
            scheduler_status::Column::SuccessCount,
            Expr::col(scheduler_status::Column::SuccessCount).add(processed),
        )
        .col_expr(
            scheduler_status::Column::ErrorCount,
            Expr::col(scheduler_status::Column::ErrorCount).add(errors),
        )
        .col_expr(scheduler_status::Column::UpdatedAt, Expr::value(now))
        .filter(scheduler_status::Column::SchedulerName.eq(name))
        .exec(db)
        .await?;
    Ok(())
}

/// Records a fatal run error and clears the running flag.
pub(crate) async fn finish_failure<C>(
    db: &C,
    name: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    SchedulerStatus::update_many()
        .col_expr(scheduler_status::Column::IsRunning, Expr::value(false))
        .col_expr(scheduler_status::Column::LastErrorAt, Expr::value(now))
        .col_expr(
            scheduler_status::Column::LastErrorMessage,
            Expr::value(message.to_string()),
        )
        .col_expr(
            scheduler_status::Column::ErrorCount,
            Expr::col(scheduler_status::Column::ErrorCount).add(1),
        )
        .col_expr(scheduler_status::Column::UpdatedAt, Expr::value(now))
        .filter(scheduler_status::Column::SchedulerName.eq(name))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_success_rate_zero_runs() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(5, 0), 0.0);
    }

    #[test]
    fn test_success_rate_rounds_to_two_decimals() {
        assert_eq!(success_rate(1, 3), 33.33);
        assert_eq!(success_rate(2, 3), 66.67);
        assert_eq!(success_rate(4, 4), 100.0);
        assert_eq!(success_rate(0, 7), 0.0);
    }

    #[tokio::test]
    async fn test_ensure_status_row_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;

        let first = ensure_status_row(&db, TEST_SCHEDULER).await?;
        let second = ensure_status_row(&db, TEST_SCHEDULER).await?;
        assert_eq!(first.id, second.id);
        assert!(!first.is_running);
        assert_eq!(first.run_count, 0);

        let count = SchedulerStatus::find().count(&db).await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_status_missing_row() -> Result<()> {
        let db = setup_test_db().await?;

        let result = get_status(&db, "unknown").await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound {
                entity: "scheduler status",
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_status_fresh_row() -> Result<()> {
        let db = setup_scheduler_db().await?;

        let view = get_status(&db, TEST_SCHEDULER).await?;
        assert_eq!(view.success_rate, 0.0);
        assert!(view.uptime_seconds >= 0);
        assert!(!view.status.is_running);
        Ok(())
    }

    #[tokio::test]
    async fn test_begin_run_rejects_second_start() -> Result<()> {
        let db = setup_scheduler_db().await?;
        let now = Utc::now();

        begin_run(&db, TEST_SCHEDULER, false, now).await?;
        assert!(is_running(&db, TEST_SCHEDULER).await?);

        let second = begin_run(&db, TEST_SCHEDULER, false, now).await;
        assert!(matches!(
            second.unwrap_err(),
            Error::SchedulerAlreadyRunning { .. }
        ));

        // The rejected attempt must not count as a run
        let row = get_status_row(&db, TEST_SCHEDULER).await?;
        assert_eq!(row.run_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_begin_run_force_bypasses_running_flag() -> Result<()> {
        let db = setup_scheduler_db().await?;
        let now = Utc::now();

        begin_run(&db, TEST_SCHEDULER, false, now).await?;
        begin_run(&db, TEST_SCHEDULER, true, now).await?;

        let row = get_status_row(&db, TEST_SCHEDULER).await?;
        assert!(row.is_running);
        assert_eq!(row.run_count, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_begin_run_missing_row() -> Result<()> {
        let db = setup_test_db().await?;

        let result = begin_run(&db, "missing", false, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_finish_success_updates_counters() -> Result<()> {
        let db = setup_scheduler_db().await?;
        let now = Utc::now();

        begin_run(&db, TEST_SCHEDULER, false, now).await?;
        finish_success(&db, TEST_SCHEDULER, 3, 1, now).await?;

        let row = get_status_row(&db, TEST_SCHEDULER).await?;
        assert!(!row.is_running);
        assert_eq!(row.run_count, 1);
        assert_eq!(row.success_count, 3);
        assert_eq!(row.error_count, 1);
        assert!(row.last_success_at.is_some());
        assert!(row.last_error_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_finish_failure_records_message() -> Result<()> {
        let db = setup_scheduler_db().await?;
        let now = Utc::now();

        begin_run(&db, TEST_SCHEDULER, false, now).await?;
        finish_failure(&db, TEST_SCHEDULER, "connection reset", now).await?;

        let row = get_status_row(&db, TEST_SCHEDULER).await?;
        assert!(!row.is_running);
        assert_eq!(row.error_count, 1);
        assert_eq!(row.last_error_message.as_deref(), Some("connection reset"));
        assert!(row.last_error_at.is_some());
        assert!(row.last_success_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_release_keeps_counters() -> Result<()> {
        let db = setup_scheduler_db().await?;
        let now = Utc::now();

        begin_run(&db, TEST_SCHEDULER, false, now).await?;
        release(&db, TEST_SCHEDULER, now).await?;

        let row = get_status_row(&db, TEST_SCHEDULER).await?;
        assert!(!row.is_running);
        assert_eq!(row.run_count, 1);
        assert_eq!(row.success_count, 0);
        assert_eq!(row.error_count, 0);
        Ok(())
    }
}
