//! Product scan endpoints: manual scans and catalog webhooks.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::drift::ScanResult;
use domain::models::product::{ProductWebhookPayload, ScanProductRequest};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OptionalJson;
use crate::middleware::metrics::{record_drifts_auto_resolved, record_drifts_detected};

async fn run_scan(
    state: &AppState,
    trigger: &'static str,
    shop_id: Uuid,
    product_id: &str,
    request: ScanProductRequest,
) -> Result<ScanResult, ApiError> {
    shared::validation::validate_product_id(product_id)
        .map_err(|_| ApiError::Validation("Invalid product id".to_string()))?;

    let result = state
        .detector
        .scan_product(shop_id, product_id, request.snapshot)
        .await?;

    record_drifts_detected(trigger, result.drifts.len());
    record_drifts_auto_resolved(result.auto_resolved);
    info!(
        shop_id = %shop_id,
        product_id = %product_id,
        trigger,
        drifts = result.drifts.len(),
        auto_resolved = result.auto_resolved,
        "Product scanned"
    );
    Ok(result)
}

/// Scan one product. The body may carry the snapshot; otherwise it is fetched.
///
/// POST /api/v1/shops/:shop_id/products/:product_id/scan
pub async fn scan_product(
    State(state): State<AppState>,
    Path((shop_id, product_id)): Path<(Uuid, String)>,
    OptionalJson(body): OptionalJson<ScanProductRequest>,
) -> Result<Json<ScanResult>, ApiError> {
    let request = body.unwrap_or_default();
    let result = run_scan(&state, "manual", shop_id, &product_id, request).await?;
    Ok(Json(result))
}

/// Product update webhook. Always re-fetches the product from the catalog.
///
/// POST /api/v1/webhooks/products
pub async fn product_webhook(
    State(state): State<AppState>,
    Json(payload): Json<ProductWebhookPayload>,
) -> Result<Json<ScanResult>, ApiError> {
    payload.validate()?;
    let result = run_scan(
        &state,
        "webhook",
        payload.shop_id,
        &payload.product_id,
        ScanProductRequest::default(),
    )
    .await?;
    Ok(Json(result))
}
