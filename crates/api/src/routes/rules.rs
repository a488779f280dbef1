//! Rule catalog and custom rule endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::catalog_rule::{
    CatalogRuleResponse, CreateRuleRequest, ListRulesResponse, RuleTemplateResponse,
    ToggleRuleRequest, UpdateRuleRequest,
};
use domain::models::rule_kind::RuleDefinition;
use domain::models::RuleKind;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// List every rule kind with its configuration fields.
///
/// GET /api/v1/rule-kinds
pub async fn list_rule_kinds() -> Json<Vec<RuleDefinition>> {
    Json(RuleKind::catalog())
}

/// List the built-in rule templates.
///
/// GET /api/v1/rule-templates
pub async fn list_templates(State(state): State<AppState>) -> Json<Vec<RuleTemplateResponse>> {
    Json(
        state
            .rules
            .list_templates()
            .into_iter()
            .map(RuleTemplateResponse::from)
            .collect(),
    )
}

/// GET /api/v1/shops/:shop_id/rules
pub async fn list_rules(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<ListRulesResponse>, ApiError> {
    let rules: Vec<CatalogRuleResponse> = state
        .rules
        .list_rules(shop_id)
        .await?
        .into_iter()
        .map(CatalogRuleResponse::from)
        .collect();

    Ok(Json(ListRulesResponse {
        total: rules.len(),
        rules,
    }))
}

/// GET /api/v1/shops/:shop_id/rules/:rule_id
pub async fn get_rule(
    State(state): State<AppState>,
    Path((shop_id, rule_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CatalogRuleResponse>, ApiError> {
    let rule = state.rules.get_rule(shop_id, rule_id).await?;
    Ok(Json(rule.into()))
}

/// Create a custom rule.
///
/// POST /api/v1/shops/:shop_id/rules
pub async fn create_rule(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<CatalogRuleResponse>), ApiError> {
    request.validate()?;
    let rule = state.rules.create_rule(shop_id, request).await?;
    Ok((StatusCode::CREATED, Json(rule.into())))
}

/// Partially update a rule.
///
/// PATCH /api/v1/shops/:shop_id/rules/:rule_id
pub async fn update_rule(
    State(state): State<AppState>,
    Path((shop_id, rule_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateRuleRequest>,
) -> Result<Json<CatalogRuleResponse>, ApiError> {
    request.validate()?;
    let rule = state.rules.update_rule(shop_id, rule_id, request).await?;
    Ok(Json(rule.into()))
}

/// POST /api/v1/shops/:shop_id/rules/:rule_id/toggle
pub async fn toggle_rule(
    State(state): State<AppState>,
    Path((shop_id, rule_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ToggleRuleRequest>,
) -> Result<Json<CatalogRuleResponse>, ApiError> {
    let rule = state
        .rules
        .toggle_rule(shop_id, rule_id, request.is_enabled)
        .await?;
    Ok(Json(rule.into()))
}

/// DELETE /api/v1/shops/:shop_id/rules/:rule_id
pub async fn delete_rule(
    State(state): State<AppState>,
    Path((shop_id, rule_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.rules.delete_rule(shop_id, rule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create every rule in a template.
///
/// POST /api/v1/shops/:shop_id/rule-templates/:template
pub async fn apply_template(
    State(state): State<AppState>,
    Path((shop_id, template)): Path<(Uuid, String)>,
) -> Result<(StatusCode, Json<ListRulesResponse>), ApiError> {
    let rules: Vec<CatalogRuleResponse> = state
        .rules
        .apply_template(shop_id, &template)
        .await?
        .into_iter()
        .map(CatalogRuleResponse::from)
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(ListRulesResponse {
            total: rules.len(),
            rules,
        }),
    ))
}
