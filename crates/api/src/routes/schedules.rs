//! Audit schedule endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::scheduled_audit::UpsertScheduleRequest;
use domain::models::ScheduledAudit;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// GET /api/v1/shops/:shop_id/schedule
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<ScheduledAudit>, ApiError> {
    let schedule = state.scheduler.get_schedule(shop_id).await?;
    Ok(Json(schedule))
}

/// Create or replace the shop's schedule.
///
/// PUT /api/v1/shops/:shop_id/schedule
pub async fn upsert_schedule(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<UpsertScheduleRequest>,
) -> Result<Json<ScheduledAudit>, ApiError> {
    request.validate()?;
    let schedule = state
        .scheduler
        .upsert_schedule(shop_id, request.into())
        .await?;
    Ok(Json(schedule))
}
