//! Shop billing entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Plan, ShopBillingState};

/// Database row mapping for the shop_billing table.
#[derive(Debug, Clone, FromRow)]
pub struct ShopBillingEntity {
    pub shop_id: Uuid,
    pub plan: String,
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

impl From<ShopBillingEntity> for ShopBillingState {
    fn from(entity: ShopBillingEntity) -> Self {
        let plan = Plan::parse(&entity.plan).unwrap_or_else(|| {
            tracing::warn!(
                shop_id = %entity.shop_id,
                plan = %entity.plan,
                "Unknown plan, treating as free"
            );
            Plan::Free
        });
        Self {
            shop_id: entity.shop_id,
            plan,
            subscription_id: entity.subscription_id,
            subscription_status: entity.subscription_status,
            trial_ends_at: entity.trial_ends_at,
            current_period_end: entity.current_period_end,
            is_dev_store: entity.is_dev_store,
            ai_credits_used: entity.ai_credits_used,
            ai_credits_reset_at: entity.ai_credits_reset_at,
            audits_this_month: entity.audits_this_month,
            audits_reset_at: entity.audits_reset_at,
        }
    }
}
