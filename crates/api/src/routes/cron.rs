//! Cron-triggered scheduled audit runs.

use axum::{extract::State, Json};

use crate::app::AppState;
use crate::error::ApiError;
use crate::jobs::{run_scheduled_audit_pass, ScheduledAuditPass};

/// Runs every due audit, then sends notifications for the successful runs.
///
/// POST /api/cron/scheduled-audits
pub async fn run_scheduled_audits(
    State(state): State<AppState>,
) -> Result<Json<ScheduledAuditPass>, ApiError> {
    Ok(Json(run_scheduled_audit_pass(&state.scheduler).await?))
}
