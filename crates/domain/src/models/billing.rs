//! Billing plans, usage ledgers and gate decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Starter,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Starter => "starter",
            Plan::Pro => "pro",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Plan::Free),
            "starter" => Some(Plan::Starter),
            "pro" => Some(Plan::Pro),
            _ => None,
        }
    }

    pub fn is_paid(&self) -> bool {
        *self != Plan::Free
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted billing row for a shop.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopBillingState {
    pub shop_id: Uuid,
    pub plan: Plan,
    pub subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub is_dev_store: bool,
    pub ai_credits_used: i32,
    pub ai_credits_reset_at: DateTime<Utc>,
    pub audits_this_month: i32,
    pub audits_reset_at: DateTime<Utc>,
}

impl ShopBillingState {
    /// Default row for a shop with no billing history.
    pub fn new_free(shop_id: Uuid, now: DateTime<Utc>) -> Self {
        let reset_at = shared::time::add_months(now, 1);
        Self {
            shop_id,
            plan: Plan::Free,
            subscription_id: None,
            subscription_status: None,
            trial_ends_at: None,
            current_period_end: None,
            is_dev_store: false,
            ai_credits_used: 0,
            ai_credits_reset_at: reset_at,
            audits_this_month: 0,
            audits_reset_at: reset_at,
        }
    }

    pub fn in_trial(&self, now: DateTime<Utc>) -> bool {
        self.trial_ends_at.is_some_and(|t| now < t)
    }
}

/// Usage limits for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub ai_credits: i32,
    pub trial_ai_credits: i32,
    /// `None` means unlimited.
    pub audits_per_month: Option<i32>,
}

/// Gate configuration injected by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingConfig {
    pub free: PlanLimits,
    pub starter: PlanLimits,
    pub pro: PlanLimits,
    pub dev_plan_override: Option<Plan>,
}

impl BillingConfig {
    pub fn limits(&self, plan: Plan) -> &PlanLimits {
        match plan {
            Plan::Free => &self.free,
            Plan::Starter => &self.starter,
            Plan::Pro => &self.pro,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            free: PlanLimits {
                ai_credits: 0,
                trial_ai_credits: 0,
                audits_per_month: Some(1),
            },
            starter: PlanLimits {
                ai_credits: 0,
                trial_ai_credits: 0,
                audits_per_month: None,
            },
            pro: PlanLimits {
                ai_credits: 100,
                trial_ai_credits: 20,
                audits_per_month: None,
            },
            dev_plan_override: None,
        }
    }
}

/// Feature checked by the enforce endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatedFeature {
    Autofix,
    Ai,
    AiWithCredits,
}

/// Machine-readable denial reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateErrorCode {
    AutofixFeatureLocked,
    AiFeatureLocked,
    AiLimitReached,
    AuditLimitReached,
}

impl GateErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateErrorCode::AutofixFeatureLocked => "AUTOFIX_FEATURE_LOCKED",
            GateErrorCode::AiFeatureLocked => "AI_FEATURE_LOCKED",
            GateErrorCode::AiLimitReached => "AI_LIMIT_REACHED",
            GateErrorCode::AuditLimitReached => "AUDIT_LIMIT_REACHED",
        }
    }
}

/// AI credit ledger view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditUsage {
    pub used: i32,
    pub limit: i32,
    pub remaining: i32,
    pub resets_at: DateTime<Utc>,
}

impl CreditUsage {
    pub fn new(used: i32, limit: i32, resets_at: DateTime<Utc>) -> Self {
        Self {
            used,
            limit,
            remaining: (limit - used).max(0),
            resets_at,
        }
    }
}

/// Result of recording a credit. `consumed` is false when the ceiling was
/// already reached and the counter did not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditConsumption {
    pub usage: CreditUsage,
    pub consumed: bool,
}

/// Audit counter view. `limit` is `None` on unlimited plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditUsage {
    pub used: i32,
    pub limit: Option<i32>,
    pub remaining: Option<i32>,
    pub resets_at: DateTime<Utc>,
}

impl AuditUsage {
    pub fn new(used: i32, limit: Option<i32>, resets_at: DateTime<Utc>) -> Self {
        Self {
            used,
            limit,
            remaining: limit.map(|l| (l - used).max(0)),
            resets_at,
        }
    }
}

/// Outcome of a gate check. Denials are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    pub allowed: bool,
    pub plan: Plan,
    pub in_trial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<GateErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<CreditUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audits: Option<AuditUsage>,
}

impl GateDecision {
    pub fn allow(plan: Plan, in_trial: bool) -> Self {
        Self {
            allowed: true,
            plan,
            in_trial,
            error_code: None,
            message: None,
            required_plan: None,
            credits: None,
            audits: None,
        }
    }

    pub fn deny(
        plan: Plan,
        in_trial: bool,
        code: GateErrorCode,
        message: impl Into<String>,
        required_plan: Option<Plan>,
    ) -> Self {
        Self {
            allowed: false,
            plan,
            in_trial,
            error_code: Some(code),
            message: Some(message.into()),
            required_plan,
            credits: None,
            audits: None,
        }
    }

    pub fn with_credits(mut self, credits: CreditUsage) -> Self {
        self.credits = Some(credits);
        self
    }

    pub fn with_audits(mut self, audits: AuditUsage) -> Self {
        self.audits = Some(audits);
        self
    }
}

/// Plan, trial and both ledgers for a shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingStatus {
    pub shop_id: Uuid,
    pub plan: Plan,
    pub in_trial: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub is_dev_store: bool,
    pub subscription_status: Option<String>,
    pub credits: CreditUsage,
    pub audits: AuditUsage,
}

fn default_credits() -> i32 {
    1
}

/// Query parameters for the enforce endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforceQuery {
    pub feature: GatedFeature,
    #[serde(default = "default_credits")]
    pub credits: i32,
}

/// Request payload for AI content generation.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[validate(custom(function = "shared::validation::validate_product_id"))]
    pub product_id: String,

    #[validate(length(min = 1, max = 50))]
    pub field: String,

    #[validate(length(max = 2000))]
    pub instructions: Option<String>,
}

/// Response for AI content generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    pub product_id: String,
    pub field: String,
    pub content: String,
    pub credits: CreditUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_parse() {
        assert_eq!(Plan::parse("PRO"), Some(Plan::Pro));
        assert_eq!(Plan::parse(" starter "), Some(Plan::Starter));
        assert_eq!(Plan::parse("enterprise"), None);
        assert!(!Plan::Free.is_paid());
        assert!(Plan::Starter.is_paid());
    }

    #[test]
    fn test_error_code_wire_format() {
        assert_eq!(
            serde_json::to_string(&GateErrorCode::AiLimitReached).unwrap(),
            "\"AI_LIMIT_REACHED\""
        );
        for code in [
            GateErrorCode::AutofixFeatureLocked,
            GateErrorCode::AiFeatureLocked,
            GateErrorCode::AiLimitReached,
            GateErrorCode::AuditLimitReached,
        ] {
            assert_eq!(serde_json::to_value(code).unwrap(), code.as_str());
        }
    }

    #[test]
    fn test_credit_usage_remaining_never_negative() {
        let now = Utc::now();
        assert_eq!(CreditUsage::new(25, 20, now).remaining, 0);
        assert_eq!(CreditUsage::new(5, 20, now).remaining, 15);
    }

    #[test]
    fn test_audit_usage_unlimited() {
        let usage = AuditUsage::new(40, None, Utc::now());
        assert_eq!(usage.remaining, None);
    }

    #[test]
    fn test_trial_window() {
        let now = Utc::now();
        let mut state = ShopBillingState::new_free(Uuid::new_v4(), now);
        assert!(!state.in_trial(now));
        state.trial_ends_at = Some(now + chrono::Duration::days(3));
        assert!(state.in_trial(now));
        state.trial_ends_at = Some(now);
        assert!(!state.in_trial(now));
    }

    #[test]
    fn test_decision_serialization_skips_empty_fields() {
        let json = serde_json::to_value(GateDecision::allow(Plan::Pro, false)).unwrap();
        assert_eq!(json["allowed"], true);
        assert!(json.get("errorCode").is_none());

        let denied = GateDecision::deny(
            Plan::Free,
            false,
            GateErrorCode::AiFeatureLocked,
            "AI requires pro",
            Some(Plan::Pro),
        );
        let json = serde_json::to_value(denied).unwrap();
        assert_eq!(json["errorCode"], "AI_FEATURE_LOCKED");
        assert_eq!(json["requiredPlan"], "pro");
    }

    #[test]
    fn test_enforce_query_defaults_credit_count() {
        let query: EnforceQuery =
            serde_json::from_str(r#"{"feature": "ai_with_credits"}"#).unwrap();
        assert_eq!(query.feature, GatedFeature::AiWithCredits);
        assert_eq!(query.credits, 1);
    }
}
