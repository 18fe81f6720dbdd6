//! Auto-close statistics over a trailing window of days.

use crate::{
    entities::{
        AssignmentLog, AutoCloseFailure, ChangeReason, assignment_log, auto_close_failure,
    },
    errors::{Error, Result},
};
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::instrument;

/// Largest window accepted by [`get_stats`].
pub const MAX_STATS_DAYS: i64 = 365;

/// Activity on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    /// Calendar date
    pub date: NaiveDate,
    /// Assignments auto-closed that day
    pub processed: u64,
    /// Assignments the scheduler failed to close that day
    pub errors: u64,
}

/// Aggregated auto-close statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    /// Length of the window in days
    pub period_days: i64,
    /// Auto-close log entries in the window
    pub total_processed: u64,
    /// Failure records in the window
    pub total_errors: u64,
    /// Mean per-assignment processing time in milliseconds, over entries that recorded one
    pub average_processing_time: f64,
    /// Per-day buckets in ascending date order
    pub daily_activity: Vec<DailyActivity>,
}

/// Clamps a caller-supplied window to `1..=365` days.
#[must_use]
pub fn clamp_days(days: i64) -> i64 {
    days.clamp(1, MAX_STATS_DAYS)
}

/// Reads the activity of one scheduler for the trailing `days` days.
///
/// Auto-close entries whose metadata names another scheduler are skipped;
/// entries that name none are attributed to `scheduler_name`.
///
/// # Errors
/// `Validation` if `days` is outside `1..=365`.
#[instrument(skip(db))]
pub async fn get_stats<C>(db: &C, scheduler_name: &str, days: i64) -> Result<SchedulerStats>
where
    C: ConnectionTrait,
{
    if !(1..=MAX_STATS_DAYS).contains(&days) {
        return Err(Error::validation(format!(
            "days must be between 1 and {MAX_STATS_DAYS}, got {days}"
        )));
    }
    let since = Utc::now() - Duration::days(days);

    let logs = AssignmentLog::find()
        .filter(assignment_log::Column::ChangeReason.eq(ChangeReason::AutoClose))
        .filter(assignment_log::Column::CreatedAt.gte(since))
        .order_by_asc(assignment_log::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .filter(|log| {
            log.parsed_metadata()
                .scheduler_name()
                .is_none_or(|name| name == scheduler_name)
        })
        .collect::<Vec<_>>();
    let failures = AutoCloseFailure::find()
        .filter(auto_close_failure::Column::SchedulerName.eq(scheduler_name))
        .filter(auto_close_failure::Column::CreatedAt.gte(since))
        .all(db)
        .await?;

    Ok(summarize(days, &logs, &failures))
}

/// Builds statistics from already-loaded log and failure rows.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(
    period_days: i64,
    logs: &[assignment_log::Model],
    failures: &[auto_close_failure::Model],
) -> SchedulerStats {
    let mut buckets: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    let mut durations = Vec::new();

    for log in logs {
        buckets.entry(log.created_at.date_naive()).or_default().0 += 1;
        if let Some(duration) = log.parsed_metadata().duration_ms() {
            durations.push(duration);
        }
    }
    for failure in failures {
        buckets.entry(failure.created_at.date_naive()).or_default().1 += 1;
    }

    let average_processing_time = if durations.is_empty() {
        0.0
    } else {
        let mean = durations.iter().sum::<f64>() / durations.len() as f64;
        (mean * 100.0).round() / 100.0
    };

    SchedulerStats {
        period_days,
        total_processed: logs.len() as u64,
        total_errors: failures.len() as u64,
        average_processing_time,
        daily_activity: buckets
            .into_iter()
            .map(|(date, (processed, errors))| DailyActivity {
                date,
                processed,
                errors,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::audit::{NewLogEntry, record_failure, record_transition};
    use crate::entities::{
        AssignmentStatus,
        assignment_log::{AutoCloseMetadata, LogMetadata, ManualMetadata},
    };
    use crate::test_utils::*;
    use chrono::DateTime;

    fn auto_close_entry(
        assignment_id: i64,
        changed_by: i64,
        at: DateTime<Utc>,
        duration_ms: Option<i64>,
    ) -> NewLogEntry {
        NewLogEntry {
            assignment_id,
            changed_by,
            previous_status: AssignmentStatus::Published,
            new_status: AssignmentStatus::Closed,
            change_reason: ChangeReason::AutoClose,
            metadata: LogMetadata::AutoClose(AutoCloseMetadata {
                scheduler_name: TEST_SCHEDULER.to_string(),
                due_date: at - Duration::hours(1),
                processed_at: at,
                duration_ms,
            }),
            created_at: at,
        }
    }

    #[test]
    fn test_clamp_days() {
        assert_eq!(clamp_days(0), 1);
        assert_eq!(clamp_days(-5), 1);
        assert_eq!(clamp_days(30), 30);
        assert_eq!(clamp_days(1000), 365);
    }

    #[test]
    fn test_summarize_empty() {
        let stats = summarize(7, &[], &[]);
        assert_eq!(stats.total_processed, 0);
        assert_eq!(stats.total_errors, 0);
        assert_eq!(stats.average_processing_time, 0.0);
        assert!(stats.daily_activity.is_empty());
    }

    #[tokio::test]
    async fn test_three_logs_on_two_dates() -> Result<()> {
        let (db, instructor, course) = setup_with_course().await?;
        let assignment =
            create_test_assignment(&db, course.id, AssignmentStatus::Closed, days_from_now(-3))
                .await?;

        let yesterday = days_from_now(-1);
        let two_days_ago = days_from_now(-2);
        for (at, duration) in [
            (yesterday, Some(10)),
            (yesterday, Some(20)),
            (two_days_ago, None),
        ] {
            record_transition(&db, auto_close_entry(assignment.id, instructor.id, at, duration))
                .await?;
        }

        let stats = get_stats(&db, TEST_SCHEDULER, 7).await?;
        assert_eq!(stats.period_days, 7);
        assert_eq!(stats.total_processed, 3);
        assert_eq!(stats.daily_activity.len(), 2);
        assert_eq!(
            stats
                .daily_activity
                .iter()
                .map(|day| day.processed)
                .sum::<u64>(),
            3
        );
        assert_eq!(stats.daily_activity[0].date, two_days_ago.date_naive());
        assert_eq!(stats.daily_activity[0].processed, 1);
        assert_eq!(stats.daily_activity[1].date, yesterday.date_naive());
        assert_eq!(stats.daily_activity[1].processed, 2);

        // The entry without a duration is left out of the average
        assert_eq!(stats.average_processing_time, 15.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_window_and_reason_filtering() -> Result<()> {
        let (db, instructor, course) = setup_with_course().await?;
        let assignment =
            create_test_assignment(&db, course.id, AssignmentStatus::Closed, days_from_now(-30))
                .await?;

        record_transition(
            &db,
            auto_close_entry(assignment.id, instructor.id, days_from_now(-20), Some(5)),
        )
        .await?;
        record_transition(
            &db,
            NewLogEntry {
                change_reason: ChangeReason::Manual,
                metadata: LogMetadata::Manual(ManualMetadata::default()),
                ..auto_close_entry(assignment.id, instructor.id, days_from_now(-1), None)
            },
        )
        .await?;

        let stats = get_stats(&db, TEST_SCHEDULER, 7).await?;
        assert_eq!(stats.total_processed, 0);

        let stats = get_stats(&db, TEST_SCHEDULER, 30).await?;
        assert_eq!(stats.total_processed, 1);
        assert_eq!(stats.average_processing_time, 5.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_failures_are_counted_per_day() -> Result<()> {
        let (db, instructor, course) = setup_with_course().await?;
        let assignment =
            create_test_assignment(&db, course.id, AssignmentStatus::Closed, days_from_now(-3))
                .await?;
        let yesterday = days_from_now(-1);

        record_transition(&db, auto_close_entry(assignment.id, instructor.id, yesterday, None))
            .await?;
        record_failure(&db, assignment.id, TEST_SCHEDULER, "no longer published", yesterday)
            .await?;

        let stats = get_stats(&db, TEST_SCHEDULER, 7).await?;
        assert_eq!(stats.total_errors, 1);
        assert_eq!(
            stats.daily_activity,
            vec![DailyActivity {
                date: yesterday.date_naive(),
                processed: 1,
                errors: 1,
            }]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_fractional_durations_are_averaged() -> Result<()> {
        let (db, instructor, course) = setup_with_course().await?;
        let assignment =
            create_test_assignment(&db, course.id, AssignmentStatus::Closed, days_from_now(-3))
                .await?;
        let yesterday = days_from_now(-1);

        record_transition(
            &db,
            auto_close_entry(assignment.id, instructor.id, yesterday, Some(10)),
        )
        .await?;
        record_transition(
            &db,
            NewLogEntry {
                metadata: LogMetadata::Other(serde_json::json!({ "duration": 12.5 })),
                ..auto_close_entry(assignment.id, instructor.id, yesterday, None)
            },
        )
        .await?;

        let stats = get_stats(&db, TEST_SCHEDULER, 7).await?;
        assert_eq!(stats.total_processed, 2);
        assert_eq!(stats.average_processing_time, 11.25);
        Ok(())
    }

    #[tokio::test]
    async fn test_other_schedulers_are_excluded() -> Result<()> {
        let (db, instructor, course) = setup_with_course().await?;
        let assignment =
            create_test_assignment(&db, course.id, AssignmentStatus::Closed, days_from_now(-3))
                .await?;
        let yesterday = days_from_now(-1);

        record_transition(&db, auto_close_entry(assignment.id, instructor.id, yesterday, None))
            .await?;
        let mut foreign = auto_close_entry(assignment.id, instructor.id, yesterday, Some(99));
        if let LogMetadata::AutoClose(meta) = &mut foreign.metadata {
            meta.scheduler_name = "late_penalty".to_string();
        }
        record_transition(&db, foreign).await?;
        record_failure(&db, assignment.id, "late_penalty", "locked", yesterday).await?;

        let stats = get_stats(&db, TEST_SCHEDULER, 7).await?;
        assert_eq!(stats.total_processed, 1);
        assert_eq!(stats.total_errors, 0);
        assert_eq!(stats.average_processing_time, 0.0);

        let stats = get_stats(&db, "late_penalty", 7).await?;
        assert_eq!(stats.total_processed, 1);
        assert_eq!(stats.total_errors, 1);
        assert_eq!(stats.average_processing_time, 99.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_days_out_of_range() -> Result<()> {
        let db = setup_test_db().await?;

        for days in [0, MAX_STATS_DAYS + 1] {
            assert!(matches!(
                get_stats(&db, TEST_SCHEDULER, days).await.unwrap_err(),
                Error::Validation { .. }
            ));
        }
        Ok(())
    }
}
