//! Compliance drift endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::drift::{
    DriftSummary, DriftSummaryQuery, ListDriftsQuery, ListDriftsResponse, ResolveAllResponse,
    ResolveDriftRequest,
};
use domain::models::{ComplianceDrift, ResolvedBy};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OptionalJson;
use crate::middleware::metrics::record_drifts_auto_resolved;

/// Unresolved drifts, newest first.
///
/// GET /api/v1/shops/:shop_id/drifts?limit=
pub async fn list_unresolved(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<ListDriftsQuery>,
) -> Result<Json<ListDriftsResponse>, ApiError> {
    let drifts = state.detector.unresolved_drifts(shop_id, query.limit).await?;
    Ok(Json(ListDriftsResponse {
        total: drifts.len(),
        drifts,
    }))
}

/// GET /api/v1/shops/:shop_id/drifts/summary?days=
pub async fn drift_summary(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<DriftSummaryQuery>,
) -> Result<Json<DriftSummary>, ApiError> {
    let summary = state.detector.drift_summary(shop_id, query.days).await?;
    Ok(Json(summary))
}

/// Resolve a single drift as `user` or `ignored`.
///
/// POST /api/v1/shops/:shop_id/drifts/:drift_id/resolve
pub async fn resolve_drift(
    State(state): State<AppState>,
    Path((shop_id, drift_id)): Path<(Uuid, Uuid)>,
    OptionalJson(body): OptionalJson<ResolveDriftRequest>,
) -> Result<Json<ComplianceDrift>, ApiError> {
    let resolved_by = body.map_or(ResolvedBy::User, |r| r.resolved_by);
    if resolved_by == ResolvedBy::Auto {
        return Err(ApiError::Validation(
            "resolvedBy must be 'user' or 'ignored'".to_string(),
        ));
    }

    let drift = state.detector.find_drift(drift_id).await?;
    if drift.shop_id != shop_id {
        return Err(ApiError::NotFound("Drift not found".to_string()));
    }

    let drift = state.detector.resolve_drift(drift_id, resolved_by).await?;
    Ok(Json(drift))
}

/// Resolve every open drift for a product.
///
/// POST /api/v1/shops/:shop_id/products/:product_id/drifts/resolve
pub async fn resolve_all_for_product(
    State(state): State<AppState>,
    Path((shop_id, product_id)): Path<(Uuid, String)>,
) -> Result<Json<ResolveAllResponse>, ApiError> {
    let resolved = state
        .detector
        .resolve_all_for_product(shop_id, &product_id)
        .await?;
    record_drifts_auto_resolved(resolved);
    Ok(Json(ResolveAllResponse { resolved }))
}
