//! Billing gate endpoint handlers.
//!
//! Denials are not errors: they return 403 with the decision as the body.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::billing::{AuditUsage, BillingStatus, CreditUsage, EnforceQuery};
use domain::models::GateDecision;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_credit_consumed, record_gate_denial};

/// 200 with the decision when allowed, 403 otherwise.
pub(crate) fn decision_response(decision: GateDecision) -> Response {
    if decision.allowed {
        return Json(decision).into_response();
    }
    if let Some(code) = decision.error_code {
        record_gate_denial(code.as_str());
    }
    (StatusCode::FORBIDDEN, Json(decision)).into_response()
}

/// GET /api/v1/shops/:shop_id/billing
pub async fn billing_status(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<BillingStatus>, ApiError> {
    Ok(Json(state.billing.billing_status(shop_id).await?))
}

/// GET /api/v1/shops/:shop_id/billing/enforce?feature=autofix|ai|ai_with_credits&credits=n
pub async fn enforce(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<EnforceQuery>,
) -> Result<Response, ApiError> {
    let decision = state
        .billing
        .enforce(shop_id, query.feature, query.credits)
        .await?;
    Ok(decision_response(decision))
}

/// Record one AI credit.
///
/// POST /api/v1/shops/:shop_id/billing/credits/consume
pub async fn consume_credit(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<CreditUsage>, ApiError> {
    let outcome = state.billing.consume_credit(shop_id).await?;
    if outcome.consumed {
        record_credit_consumed();
    }
    Ok(Json(outcome.usage))
}

/// GET /api/v1/shops/:shop_id/billing/audits
pub async fn check_audit_limit(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let decision = state.billing.check_audit_limit(shop_id).await?;
    Ok(decision_response(decision))
}

/// POST /api/v1/shops/:shop_id/billing/audits/increment
pub async fn increment_audit_count(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<AuditUsage>, ApiError> {
    Ok(Json(state.billing.increment_audit_count(shop_id).await?))
}
