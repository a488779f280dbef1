//! Catalog rule repository for database operations.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use domain::error::DomainError;
use domain::models::catalog_rule::{CatalogRulePatch, NewCatalogRule};
use domain::models::CatalogRule;
use domain::ports::CatalogRuleRepository;

use super::{decode_all, decode_one};
use crate::entities::CatalogRuleEntity;
use crate::metrics::QueryTimer;

/// Repository for shop-scoped catalog rules.
#[derive(Clone)]
pub struct PgCatalogRuleRepository {
    pool: PgPool,
}

impl PgCatalogRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRuleRepository for PgCatalogRuleRepository {
    async fn list_rules(&self, shop_id: Uuid) -> Result<Vec<CatalogRule>, DomainError> {
        let timer = QueryTimer::new("list_catalog_rules");
        let result = sqlx::query_as::<_, CatalogRuleEntity>(
            r#"
            SELECT * FROM catalog_rules
            WHERE shop_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(decode_all("catalog_rules", result?))
    }

    async fn list_enabled_rules(&self, shop_id: Uuid) -> Result<Vec<CatalogRule>, DomainError> {
        let timer = QueryTimer::new("list_enabled_catalog_rules");
        let result = sqlx::query_as::<_, CatalogRuleEntity>(
            r#"
            SELECT * FROM catalog_rules
            WHERE shop_id = $1 AND is_enabled = true
            ORDER BY created_at ASC
            "#,
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(decode_all("catalog_rules", result?))
    }

    async fn find_rule(
        &self,
        shop_id: Uuid,
        rule_id: Uuid,
    ) -> Result<Option<CatalogRule>, DomainError> {
        let timer = QueryTimer::new("find_catalog_rule");
        let result = sqlx::query_as::<_, CatalogRuleEntity>(
            "SELECT * FROM catalog_rules WHERE id = $1 AND shop_id = $2",
        )
        .bind(rule_id)
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result?.map(decode_one).transpose()
    }

    async fn create_rules(
        &self,
        rules: &[NewCatalogRule],
    ) -> Result<Vec<CatalogRule>, DomainError> {
        let timer = QueryTimer::new("insert_catalog_rules_batch");
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(rules.len());

        for rule in rules {
            let entity = sqlx::query_as::<_, CatalogRuleEntity>(
                r#"
                INSERT INTO catalog_rules (
                    shop_id, name, description, rule_kind, configuration,
                    severity, is_enabled, applies_to_all, product_filter
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
                "#,
            )
            .bind(rule.shop_id)
            .bind(&rule.name)
            .bind(&rule.description)
            .bind(rule.condition.kind().as_str())
            .bind(rule.condition.config())
            .bind(rule.severity.as_str())
            .bind(rule.is_enabled)
            .bind(rule.applies_to_all)
            .bind(rule.product_filter.as_ref().map(Json))
            .fetch_one(&mut *tx)
            .await?;
            created.push(entity);
        }

        tx.commit().await?;
        timer.record();

        created.into_iter().map(decode_one).collect()
    }

    async fn update_rule(
        &self,
        shop_id: Uuid,
        rule_id: Uuid,
        patch: &CatalogRulePatch,
    ) -> Result<Option<CatalogRule>, DomainError> {
        let timer = QueryTimer::new("update_catalog_rule");
        let result = sqlx::query_as::<_, CatalogRuleEntity>(
            r#"
            UPDATE catalog_rules
            SET name = COALESCE($3, name),
                description = COALESCE($4, description),
                rule_kind = COALESCE($5, rule_kind),
                configuration = COALESCE($6, configuration),
                severity = COALESCE($7, severity),
                is_enabled = COALESCE($8, is_enabled),
                applies_to_all = COALESCE($9, applies_to_all),
                product_filter = COALESCE($10, product_filter),
                updated_at = clock_timestamp()
            WHERE id = $1 AND shop_id = $2
            RETURNING *
            "#,
        )
        .bind(rule_id)
        .bind(shop_id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.condition.as_ref().map(|c| c.kind().as_str()))
        .bind(patch.condition.as_ref().map(|c| c.config()))
        .bind(patch.severity.map(|s| s.as_str()))
        .bind(patch.is_enabled)
        .bind(patch.applies_to_all)
        .bind(patch.product_filter.as_ref().map(Json))
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result?.map(decode_one).transpose()
    }

    async fn delete_rule(&self, shop_id: Uuid, rule_id: Uuid) -> Result<bool, DomainError> {
        let timer = QueryTimer::new("delete_catalog_rule");
        let result = sqlx::query("DELETE FROM catalog_rules WHERE id = $1 AND shop_id = $2")
            .bind(rule_id)
            .bind(shop_id)
            .execute(&self.pool)
            .await;
        timer.record();

        Ok(result?.rows_affected() > 0)
    }
}
