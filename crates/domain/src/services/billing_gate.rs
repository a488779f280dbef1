//! Plan resolution, feature gates and the monthly usage ledgers.
//!
//! Checks run before the gated action; credits are consumed only after it
//! succeeds. Counters are incremented atomically with a ceiling in storage.
//! Resets are applied lazily by whichever check first sees them due, and the
//! next reset is always computed from now.

use std::sync::Arc;

use shared::time::{first_day_of_next_month, Clock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::billing::{
    AuditUsage, BillingConfig, BillingStatus, CreditConsumption, CreditUsage, GateDecision,
    GateErrorCode, GatedFeature, Plan, ShopBillingState,
};
use crate::ports::BillingRepository;

/// A shop's effective plan after overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPlan {
    pub plan: Plan,
    pub in_trial: bool,
}

#[derive(Clone)]
pub struct BillingGate {
    config: BillingConfig,
    billing: Arc<dyn BillingRepository>,
    clock: Arc<dyn Clock>,
}

impl BillingGate {
    pub fn new(
        config: BillingConfig,
        billing: Arc<dyn BillingRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            billing,
            clock,
        }
    }

    /// Developer override, then dev-store bypass, then the stored plan.
    pub fn resolve_plan(&self, state: &ShopBillingState) -> ResolvedPlan {
        if let Some(plan) = self.config.dev_plan_override {
            return ResolvedPlan {
                plan,
                in_trial: false,
            };
        }
        if state.is_dev_store {
            return ResolvedPlan {
                plan: Plan::Pro,
                in_trial: false,
            };
        }
        ResolvedPlan {
            plan: state.plan,
            in_trial: state.in_trial(self.clock.now()),
        }
    }

    fn credit_limit(&self, resolved: ResolvedPlan) -> i32 {
        let limits = self.config.limits(resolved.plan);
        if resolved.in_trial {
            limits.trial_ai_credits
        } else {
            limits.ai_credits
        }
    }

    /// Monthly audit cap. Paid plans are unlimited.
    fn audit_limit(&self, plan: Plan) -> Option<i32> {
        if plan.is_paid() {
            None
        } else {
            self.config.free.audits_per_month
        }
    }

    async fn load(&self, shop_id: Uuid) -> Result<ShopBillingState, DomainError> {
        self.billing
            .find_or_create_billing(shop_id, self.clock.now())
            .await
    }

    /// Applies a due credit reset. A concurrent reset wins; we reload its result.
    async fn with_fresh_credits(
        &self,
        state: ShopBillingState,
    ) -> Result<ShopBillingState, DomainError> {
        let now = self.clock.now();
        if now <= state.ai_credits_reset_at {
            return Ok(state);
        }
        let next = first_day_of_next_month(now);
        match self.billing.reset_ai_credits(state.shop_id, now, next).await? {
            Some(reset) => {
                info!(shop_id = %state.shop_id, next_reset_at = %next, "AI credits reset");
                Ok(reset)
            }
            None => self.load(state.shop_id).await,
        }
    }

    async fn with_fresh_audits(
        &self,
        state: ShopBillingState,
    ) -> Result<ShopBillingState, DomainError> {
        let now = self.clock.now();
        if now <= state.audits_reset_at {
            return Ok(state);
        }
        let next = first_day_of_next_month(now);
        match self.billing.reset_audit_count(state.shop_id, now, next).await? {
            Some(reset) => {
                info!(shop_id = %state.shop_id, next_reset_at = %next, "Audit count reset");
                Ok(reset)
            }
            None => self.load(state.shop_id).await,
        }
    }

    fn autofix_decision(&self, resolved: ResolvedPlan) -> GateDecision {
        if resolved.plan == Plan::Free {
            return GateDecision::deny(
                resolved.plan,
                resolved.in_trial,
                GateErrorCode::AutofixFeatureLocked,
                "Auto-fix requires the Starter plan or higher",
                Some(Plan::Starter),
            );
        }
        GateDecision::allow(resolved.plan, resolved.in_trial)
    }

    fn ai_decision(&self, resolved: ResolvedPlan) -> GateDecision {
        if resolved.plan != Plan::Pro {
            return GateDecision::deny(
                resolved.plan,
                resolved.in_trial,
                GateErrorCode::AiFeatureLocked,
                "AI features require the Pro plan",
                Some(Plan::Pro),
            );
        }
        GateDecision::allow(resolved.plan, resolved.in_trial)
    }

    pub async fn enforce_autofix(&self, shop_id: Uuid) -> Result<GateDecision, DomainError> {
        let state = self.load(shop_id).await?;
        Ok(self.autofix_decision(self.resolve_plan(&state)))
    }

    pub async fn enforce_ai(&self, shop_id: Uuid) -> Result<GateDecision, DomainError> {
        let state = self.load(shop_id).await?;
        Ok(self.ai_decision(self.resolve_plan(&state)))
    }

    /// AI gate plus a check that `credits` are still available this month.
    pub async fn enforce_ai_with_credits(
        &self,
        shop_id: Uuid,
        credits: i32,
    ) -> Result<GateDecision, DomainError> {
        if credits < 1 {
            return Err(DomainError::Validation(
                "Credit amount must be at least 1".to_string(),
            ));
        }

        let state = self.load(shop_id).await?;
        let resolved = self.resolve_plan(&state);
        let decision = self.ai_decision(resolved);
        if !decision.allowed {
            return Ok(decision);
        }

        let state = self.with_fresh_credits(state).await?;
        let limit = self.credit_limit(resolved);
        let usage = CreditUsage::new(state.ai_credits_used, limit, state.ai_credits_reset_at);

        if usage.remaining < credits {
            debug!(shop_id = %shop_id, used = usage.used, limit, "AI credit limit reached");
            return Ok(GateDecision::deny(
                resolved.plan,
                resolved.in_trial,
                GateErrorCode::AiLimitReached,
                format!(
                    "AI credit limit reached ({} of {} used). Credits reset on {}",
                    usage.used,
                    usage.limit,
                    usage.resets_at.format("%Y-%m-%d")
                ),
                None,
            )
            .with_credits(usage));
        }
        Ok(decision.with_credits(usage))
    }

    pub async fn enforce(
        &self,
        shop_id: Uuid,
        feature: GatedFeature,
        credits: i32,
    ) -> Result<GateDecision, DomainError> {
        match feature {
            GatedFeature::Autofix => self.enforce_autofix(shop_id).await,
            GatedFeature::Ai => self.enforce_ai(shop_id).await,
            GatedFeature::AiWithCredits => self.enforce_ai_with_credits(shop_id, credits).await,
        }
    }

    /// Records one credit after a successful AI call.
    ///
    /// At the ceiling the count is left unchanged and a warning is logged.
    pub async fn consume_credit(&self, shop_id: Uuid) -> Result<CreditConsumption, DomainError> {
        let state = self.load(shop_id).await?;
        let resolved = self.resolve_plan(&state);
        let limit = self.credit_limit(resolved);
        let state = self.with_fresh_credits(state).await?;

        let (used, consumed) = match self.billing.increment_ai_credits(shop_id, limit).await? {
            Some(used) => (used, true),
            None => {
                warn!(
                    shop_id = %shop_id,
                    used = state.ai_credits_used,
                    limit,
                    "AI credit ceiling reached on consume"
                );
                (state.ai_credits_used, false)
            }
        };
        Ok(CreditConsumption {
            usage: CreditUsage::new(used, limit, state.ai_credits_reset_at),
            consumed,
        })
    }

    fn audit_usage(&self, state: &ShopBillingState, plan: Plan) -> AuditUsage {
        AuditUsage::new(state.audits_this_month, self.audit_limit(plan), state.audits_reset_at)
    }

    pub async fn check_audit_limit(&self, shop_id: Uuid) -> Result<GateDecision, DomainError> {
        let state = self.load(shop_id).await?;
        let resolved = self.resolve_plan(&state);
        let state = self.with_fresh_audits(state).await?;
        let usage = self.audit_usage(&state, resolved.plan);

        match usage.limit {
            Some(limit) if usage.used >= limit => Ok(GateDecision::deny(
                resolved.plan,
                resolved.in_trial,
                GateErrorCode::AuditLimitReached,
                format!(
                    "Monthly audit limit reached ({} of {}). Upgrade for unlimited audits",
                    usage.used, limit
                ),
                Some(Plan::Starter),
            )
            .with_audits(usage)),
            _ => Ok(GateDecision::allow(resolved.plan, resolved.in_trial).with_audits(usage)),
        }
    }

    pub async fn increment_audit_count(&self, shop_id: Uuid) -> Result<AuditUsage, DomainError> {
        let state = self.load(shop_id).await?;
        let resolved = self.resolve_plan(&state);
        let limit = self.audit_limit(resolved.plan);
        let state = self.with_fresh_audits(state).await?;

        let used = match self.billing.increment_audit_count(shop_id, limit).await? {
            Some(used) => used,
            None => {
                warn!(
                    shop_id = %shop_id,
                    used = state.audits_this_month,
                    "Audit ceiling reached on increment"
                );
                state.audits_this_month
            }
        };
        Ok(AuditUsage::new(used, limit, state.audits_reset_at))
    }

    /// Plan, trial and both ledgers. Due resets are applied first.
    pub async fn billing_status(&self, shop_id: Uuid) -> Result<BillingStatus, DomainError> {
        let state = self.load(shop_id).await?;
        let resolved = self.resolve_plan(&state);
        let state = self.with_fresh_credits(state).await?;
        let state = self.with_fresh_audits(state).await?;

        Ok(BillingStatus {
            shop_id,
            plan: resolved.plan,
            in_trial: resolved.in_trial,
            trial_ends_at: state.trial_ends_at,
            is_dev_store: state.is_dev_store,
            subscription_status: state.subscription_status.clone(),
            credits: CreditUsage::new(
                state.ai_credits_used,
                self.credit_limit(resolved),
                state.ai_credits_reset_at,
            ),
            audits: self.audit_usage(&state, resolved.plan),
        })
    }
}
