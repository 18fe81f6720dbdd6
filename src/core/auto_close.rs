//! Auto-close engine.
//!
//! Selects published assignments whose due date has passed and closes them one at a
//! time. A run is bracketed by the status store: it is acquired with
//! `status::begin_run` and always ends in exactly one of `release` (dry run),
//! `finish_success` or `finish_failure`, so the running flag is cleared on every path.
//!
//! Failures to close an individual assignment are collected in
//! [`AutoCloseResult::errors`] and never abort the batch. Only failures outside the
//! per-assignment loop (for example the candidate query) are fatal to the run.

use crate::{
    config::SchedulerConfig,
    core::{
        assignment::transition_status,
        audit::{self, NewLogEntry},
        status,
    },
    entities::{
        Assignment, AssignmentStatus, ChangeReason, Course, assignment,
        assignment_log::{AutoCloseMetadata, LogMetadata},
        course,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::{collections::HashMap, time::Instant};
use tracing::{error, info, instrument, warn};

/// Parameters of a single engine run.
#[derive(Debug, Clone, Copy)]
pub struct AutoCloseOptions {
    /// Report candidates without mutating anything
    pub dry_run: bool,
    /// Maximum number of assignments to process
    pub batch_size: u64,
    /// Start even if the status store says a run is in progress
    pub force: bool,
}

/// An assignment the engine failed to close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    /// Assignment that was not closed
    pub assignment_id: i64,
    /// Why it was not closed
    pub error: String,
}

/// Outcome of one engine run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCloseResult {
    /// Number of assignments closed (or, for a dry run, eligible)
    pub processed_count: usize,
    /// IDs of the assignments closed (or eligible)
    pub processed_assignments: Vec<i64>,
    /// Assignments that could not be closed
    pub errors: Vec<ItemError>,
    /// When the run started
    pub executed_at: DateTime<Utc>,
    /// Wall-clock duration of the run in milliseconds
    pub duration: u64,
    /// Whether this was a dry run
    pub dry_run: bool,
}

/// A published, overdue assignment together with the instructor the close is
/// attributed to.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub assignment: assignment::Model,
    pub instructor_id: Option<i64>,
}

#[derive(Debug, Default)]
pub(crate) struct BatchOutcome {
    pub processed: Vec<i64>,
    pub errors: Vec<ItemError>,
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Runs the auto-close engine once.
///
/// # Errors
/// * `Validation` if `batch_size` is 0 or above `config.max_batch_size`
/// * `NotFound` if the scheduler status row was never seeded
/// * `SchedulerAlreadyRunning` if another run holds the scheduler and `force` is unset
/// * `AutoCloseFailed` if the run aborted; the status store records the error
#[instrument(skip(db, config), fields(scheduler = %config.name))]
pub async fn run_auto_close(
    db: &DatabaseConnection,
    config: &SchedulerConfig,
    options: AutoCloseOptions,
) -> Result<AutoCloseResult> {
    if options.batch_size == 0 || options.batch_size > config.max_batch_size {
        return Err(Error::validation(format!(
            "batch size must be between 1 and {}, got {}",
            config.max_batch_size, options.batch_size
        )));
    }

    let name = config.name.as_str();
    let started = Instant::now();
    let executed_at = Utc::now();

    status::begin_run(db, name, options.force, executed_at).await?;
    info!(
        dry_run = options.dry_run,
        batch_size = options.batch_size,
        force = options.force,
        "Auto-close run started"
    );

    let outcome = match execute(db, name, options).await {
        Ok(outcome) => outcome,
        Err(e) => return Err(record_fatal(db, name, &e).await),
    };

    let finished_at = Utc::now();
    let bookkeeping = if options.dry_run {
        status::release(db, name, finished_at).await
    } else {
        status::finish_success(
            db,
            name,
            outcome.processed.len(),
            outcome.errors.len(),
            finished_at,
        )
        .await
    };
    if let Err(e) = bookkeeping {
        return Err(record_fatal(db, name, &e).await);
    }

    let result = AutoCloseResult {
        processed_count: outcome.processed.len(),
        processed_assignments: outcome.processed,
        errors: outcome.errors,
        executed_at,
        duration: elapsed_ms(started),
        dry_run: options.dry_run,
    };
    info!(
        processed = result.processed_count,
        errors = result.errors.len(),
        duration_ms = result.duration,
        dry_run = result.dry_run,
        "Auto-close run finished"
    );
    Ok(result)
}

async fn execute(
    db: &DatabaseConnection,
    scheduler_name: &str,
    options: AutoCloseOptions,
) -> Result<BatchOutcome> {
    let candidates = find_candidates(db, Utc::now(), options.batch_size).await?;

    if options.dry_run {
        return Ok(BatchOutcome {
            processed: candidates.iter().map(|c| c.assignment.id).collect(),
            errors: Vec::new(),
        });
    }

    Ok(close_candidates(db, scheduler_name, candidates).await)
}

/// Records a fatal error in the status store and converts it for the caller.
async fn record_fatal(db: &DatabaseConnection, scheduler_name: &str, cause: &Error) -> Error {
    let message = cause.to_string();
    error!(error = %message, "Auto-close run failed");

    if let Err(e) = status::finish_failure(db, scheduler_name, &message, Utc::now()).await {
        error!(error = %e, "Failed to record auto-close failure in status store");
    }

    Error::AutoCloseFailed {
        scheduler_name: scheduler_name.to_string(),
        message,
    }
}

/// Loads up to `limit` published assignments due before `now`, oldest due date first.
pub(crate) async fn find_candidates<C>(
    db: &C,
    now: DateTime<Utc>,
    limit: u64,
) -> Result<Vec<Candidate>>
where
    C: ConnectionTrait,
{
    let assignments = Assignment::find()
        .filter(assignment::Column::Status.eq(AssignmentStatus::Published))
        .filter(assignment::Column::DueDate.lt(now))
        .order_by_asc(assignment::Column::DueDate)
        .order_by_asc(assignment::Column::Id)
        .limit(limit)
        .all(db)
        .await?;

    if assignments.is_empty() {
        return Ok(Vec::new());
    }

    let mut course_ids: Vec<i64> = assignments.iter().map(|a| a.course_id).collect();
    course_ids.sort_unstable();
    course_ids.dedup();

    let instructors: HashMap<i64, i64> = Course::find()
        .filter(course::Column::Id.is_in(course_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.instructor_id))
        .collect();

    Ok(assignments
        .into_iter()
        .map(|assignment| Candidate {
            instructor_id: instructors.get(&assignment.course_id).copied(),
            assignment,
        })
        .collect())
}

/// Closes each candidate in turn.
///
/// Never fails as a whole: per-assignment problems end up in `errors`.
pub(crate) async fn close_candidates<C>(
    db: &C,
    scheduler_name: &str,
    candidates: Vec<Candidate>,
) -> BatchOutcome
where
    C: ConnectionTrait,
{
    let mut outcome = BatchOutcome::default();

    for candidate in candidates {
        let item_started = Instant::now();
        let assignment_id = candidate.assignment.id;

        let failure = match transition_status(
            db,
            assignment_id,
            AssignmentStatus::Published,
            AssignmentStatus::Closed,
        )
        .await
        {
            Ok(true) => None,
            Ok(false) => Some("assignment is no longer published".to_string()),
            Err(e) => Some(e.to_string()),
        };

        if let Some(message) = failure {
            warn!(assignment_id, error = %message, "Failed to auto-close assignment");
            if let Err(e) =
                audit::record_failure(db, assignment_id, scheduler_name, &message, Utc::now())
                    .await
            {
                warn!(assignment_id, error = %e, "Failed to record auto-close failure");
            }
            outcome.errors.push(ItemError {
                assignment_id,
                error: message,
            });
            continue;
        }

        // The status change stands even if the audit entry cannot be written.
        if let Err(e) =
            write_close_log(db, scheduler_name, &candidate, elapsed_ms(item_started)).await
        {
            warn!(assignment_id, error = %e, "Closed assignment but failed to write audit log");
        }
        outcome.processed.push(assignment_id);
    }

    outcome
}

async fn write_close_log<C>(
    db: &C,
    scheduler_name: &str,
    candidate: &Candidate,
    duration_ms: u64,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let assignment = &candidate.assignment;
    let changed_by = candidate
        .instructor_id
        .ok_or_else(|| Error::not_found("course", assignment.course_id))?;
    let processed_at = Utc::now();

    audit::record_transition(
        db,
        NewLogEntry {
            assignment_id: assignment.id,
            changed_by,
            previous_status: AssignmentStatus::Published,
            new_status: AssignmentStatus::Closed,
            change_reason: ChangeReason::AutoClose,
            metadata: LogMetadata::AutoClose(AutoCloseMetadata {
                scheduler_name: scheduler_name.to_string(),
                due_date: assignment.due_date,
                processed_at,
                duration_ms: Some(i64::try_from(duration_ms).unwrap_or(i64::MAX)),
            }),
            created_at: processed_at,
        },
    )
    .await?;
    Ok(())
}
