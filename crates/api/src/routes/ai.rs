//! AI content generation, gated by plan and credits.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use domain::models::billing::{GenerateContentRequest, GenerateContentResponse};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_credit_consumed;
use crate::routes::billing::decision_response;

/// Checks the gate for one credit, generates, then records the credit.
///
/// A failed generation consumes nothing.
///
/// POST /api/v1/shops/:shop_id/ai/generate
pub async fn generate_content(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<GenerateContentRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    let decision = state.billing.enforce_ai_with_credits(shop_id, 1).await?;
    if !decision.allowed {
        return Ok(decision_response(decision));
    }

    let content = state.text_generator.generate(shop_id, &request).await?;
    let outcome = state.billing.consume_credit(shop_id).await?;
    if outcome.consumed {
        record_credit_consumed();
    }
    let credits = outcome.usage;

    info!(
        shop_id = %shop_id,
        product_id = %request.product_id,
        field = %request.field,
        credits_used = credits.used,
        "AI content generated"
    );

    Ok(Json(GenerateContentResponse {
        product_id: request.product_id,
        field: request.field,
        content,
        credits,
    })
    .into_response())
}
