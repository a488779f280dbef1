//! Shop billing repository for database operations.
//!
//! Counter updates are single conditional statements so that concurrent
//! requests cannot push a ledger past its limit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::error::DomainError;
use domain::models::ShopBillingState;
use domain::ports::BillingRepository;

use crate::entities::ShopBillingEntity;
use crate::metrics::QueryTimer;
use super::missing_parent;

/// Repository for billing rows and usage counters.
#[derive(Clone)]
pub struct PgBillingRepository {
    pool: PgPool,
}

impl PgBillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingRepository for PgBillingRepository {
    async fn find_or_create_billing(
        &self,
        shop_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ShopBillingState, DomainError> {
        let timer = QueryTimer::new("find_or_create_shop_billing");
        let defaults = ShopBillingState::new_free(shop_id, now);

        sqlx::query(
            r#"
            INSERT INTO shop_billing (shop_id, plan, ai_credits_reset_at, audits_reset_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (shop_id) DO NOTHING
            "#,
        )
        .bind(shop_id)
        .bind(defaults.plan.as_str())
        .bind(defaults.ai_credits_reset_at)
        .bind(defaults.audits_reset_at)
        .execute(&self.pool)
        .await
        .map_err(|e| missing_parent(e, "Shop"))?;

        let result = sqlx::query_as::<_, ShopBillingEntity>(
            "SELECT * FROM shop_billing WHERE shop_id = $1",
        )
        .bind(shop_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result?.into())
    }

    async fn reset_ai_credits(
        &self,
        shop_id: Uuid,
        now: DateTime<Utc>,
        next_reset_at: DateTime<Utc>,
    ) -> Result<Option<ShopBillingState>, DomainError> {
        let timer = QueryTimer::new("reset_ai_credits");
        let result = sqlx::query_as::<_, ShopBillingEntity>(
            r#"
            UPDATE shop_billing
            SET ai_credits_used = 0, ai_credits_reset_at = $3, updated_at = NOW()
            WHERE shop_id = $1 AND ai_credits_reset_at < $2
            RETURNING *
            "#,
        )
        .bind(shop_id)
        .bind(now)
        .bind(next_reset_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result?.map(ShopBillingState::from))
    }

    async fn increment_ai_credits(
        &self,
        shop_id: Uuid,
        limit: i32,
    ) -> Result<Option<i32>, DomainError> {
        let timer = QueryTimer::new("increment_ai_credits");
        let result = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE shop_billing
            SET ai_credits_used = ai_credits_used + 1, updated_at = NOW()
            WHERE shop_id = $1 AND ai_credits_used < $2
            RETURNING ai_credits_used
            "#,
        )
        .bind(shop_id)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result?)
    }

    async fn reset_audit_count(
        &self,
        shop_id: Uuid,
        now: DateTime<Utc>,
        next_reset_at: DateTime<Utc>,
    ) -> Result<Option<ShopBillingState>, DomainError> {
        let timer = QueryTimer::new("reset_audit_count");
        let result = sqlx::query_as::<_, ShopBillingEntity>(
            r#"
            UPDATE shop_billing
            SET audits_this_month = 0, audits_reset_at = $3, updated_at = NOW()
            WHERE shop_id = $1 AND audits_reset_at < $2
            RETURNING *
            "#,
        )
        .bind(shop_id)
        .bind(now)
        .bind(next_reset_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result?.map(ShopBillingState::from))
    }

    async fn increment_audit_count(
        &self,
        shop_id: Uuid,
        limit: Option<i32>,
    ) -> Result<Option<i32>, DomainError> {
        let timer = QueryTimer::new("increment_audit_count");
        let result = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE shop_billing
            SET audits_this_month = audits_this_month + 1, updated_at = NOW()
            WHERE shop_id = $1 AND ($2::INTEGER IS NULL OR audits_this_month < $2)
            RETURNING audits_this_month
            "#,
        )
        .bind(shop_id)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result?)
    }
}
