//! Manual assignment status changes.
//!
//! Instructors and operators can move an assignment between statuses by hand. The
//! write is conditioned on the status observed at read time, the same guard the
//! auto-close engine uses, so a manual close and an auto-close never both succeed.

use crate::{
    core::audit::{self, NewLogEntry},
    entities::{
        Assignment, AssignmentStatus, ChangeReason, User, assignment,
        assignment_log::{LogMetadata, ManualMetadata},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument};

/// Retrieves an assignment by ID.
pub async fn get_assignment<C>(db: &C, assignment_id: i64) -> Result<Option<assignment::Model>>
where
    C: ConnectionTrait,
{
    Assignment::find_by_id(assignment_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Conditionally moves an assignment from `from` to `to`.
///
/// Returns `false` when the row no longer has status `from`.
pub(crate) async fn transition_status<C>(
    db: &C,
    assignment_id: i64,
    from: AssignmentStatus,
    to: AssignmentStatus,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Assignment::update_many()
        .col_expr(assignment::Column::Status, Expr::value(to))
        .col_expr(assignment::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(assignment::Column::Id.eq(assignment_id))
        .filter(assignment::Column::Status.eq(from))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Changes an assignment's status on behalf of a user and records a `manual` audit entry.
///
/// The status update and the audit entry are written in one transaction.
///
/// # Errors
/// * `Validation` if the assignment already has `new_status`, or was changed concurrently
/// * `NotFound` if the assignment or the user does not exist
#[instrument(skip(db, note))]
pub async fn change_status(
    db: &DatabaseConnection,
    assignment_id: i64,
    new_status: AssignmentStatus,
    changed_by: i64,
    note: Option<String>,
) -> Result<assignment::Model> {
    let txn = db.begin().await?;

    let current = get_assignment(&txn, assignment_id)
        .await?
        .ok_or_else(|| Error::not_found("assignment", assignment_id))?;
    User::find_by_id(changed_by)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("user", changed_by))?;

    if current.status == new_status {
        return Err(Error::validation(format!(
            "assignment {assignment_id} already has status {new_status:?}"
        )));
    }

    if !transition_status(&txn, assignment_id, current.status, new_status).await? {
        return Err(Error::validation(format!(
            "assignment {assignment_id} was modified concurrently"
        )));
    }

    audit::record_transition(
        &txn,
        NewLogEntry {
            assignment_id,
            changed_by,
            previous_status: current.status,
            new_status,
            change_reason: ChangeReason::Manual,
            metadata: LogMetadata::Manual(ManualMetadata { note }),
            created_at: Utc::now(),
        },
    )
    .await?;

    let updated = get_assignment(&txn, assignment_id)
        .await?
        .ok_or_else(|| Error::not_found("assignment", assignment_id))?;
    txn.commit().await?;

    info!(
        assignment_id,
        changed_by,
        from = ?current.status,
        to = ?new_status,
        "Assignment status changed manually"
    );
    Ok(updated)
}
