//! Entry points that start auto-close runs.
//!
//! Manual runs are requested by an operator or instructor and use the smaller
//! manual batch size; automatic runs come from the system caller (cron, platform
//! scheduler) and may ask for a dry run or a custom batch size.

use crate::{
    config::SchedulerConfig,
    core::auto_close::{AutoCloseOptions, AutoCloseResult, run_auto_close},
    entities::User,
    errors::{Error, Result},
};
use sea_orm::prelude::*;
use serde::Deserialize;
use tracing::{info, instrument, warn};

/// Body of a manual trigger request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualTriggerRequest {
    /// User requesting the run
    pub admin_id: i64,
    /// Start even if another run is marked as in progress
    #[serde(default)]
    pub force: bool,
}

/// Body of an automatic trigger request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCloseRequest {
    /// Report candidates without closing them (default `false`)
    #[serde(default)]
    pub dry_run: Option<bool>,
    /// Overrides the configured automatic batch size
    #[serde(default)]
    pub batch_size: Option<u64>,
}

/// Runs the scheduler on behalf of a user.
///
/// # Errors
/// * `Unauthorized` if `admin_id` does not name a user
/// * `NotAuthorized` if the user is neither an operator nor an instructor
/// * `SchedulerAlreadyRunning` if a run is in progress and `force` is unset
/// * any error of [`run_auto_close`]
#[instrument(skip(db, config))]
pub async fn manual_trigger(
    db: &DatabaseConnection,
    config: &SchedulerConfig,
    request: &ManualTriggerRequest,
) -> Result<AutoCloseResult> {
    let user = User::find_by_id(request.admin_id)
        .one(db)
        .await?
        .ok_or(Error::Unauthorized {
            user_id: request.admin_id,
        })?;

    if !user.role.can_trigger_scheduler() {
        warn!(
            user_id = user.id,
            role = user.role.as_str(),
            "Rejected manual scheduler trigger"
        );
        return Err(Error::NotAuthorized {
            user_id: user.id,
            role: user.role.as_str().to_string(),
        });
    }

    info!(user_id = user.id, force = request.force, "Manual scheduler trigger");
    run_auto_close(
        db,
        config,
        AutoCloseOptions {
            dry_run: false,
            batch_size: config.manual_batch_size,
            force: request.force,
        },
    )
    .await
}

/// Runs the scheduler on behalf of the system.
///
/// # Errors
/// Any error of [`run_auto_close`]; automatic runs are never forced.
#[instrument(skip(db, config))]
pub async fn automatic_trigger(
    db: &DatabaseConnection,
    config: &SchedulerConfig,
    request: &AutoCloseRequest,
) -> Result<AutoCloseResult> {
    run_auto_close(
        db,
        config,
        AutoCloseOptions {
            dry_run: request.dry_run.unwrap_or(false),
            batch_size: request.batch_size.unwrap_or(config.automatic_batch_size),
            force: false,
        },
    )
    .await
}
