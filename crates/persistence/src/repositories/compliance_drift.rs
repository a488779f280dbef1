//! Compliance drift repository for database operations.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::error::DomainError;
use domain::models::drift::{DriftSummary, ResolvedBy};
use domain::models::{ComplianceDrift, DriftKind, NewDrift, Severity};
use domain::ports::DriftRepository;

use super::{decode_all, decode_one};
use crate::entities::ComplianceDriftEntity;
use crate::metrics::QueryTimer;

/// Repository for the drift ledger.
#[derive(Clone)]
pub struct PgDriftRepository {
    pool: PgPool,
}

impl PgDriftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DriftRepository for PgDriftRepository {
    async fn insert_drifts(
        &self,
        drifts: &[NewDrift],
    ) -> Result<Vec<ComplianceDrift>, DomainError> {
        if drifts.is_empty() {
            return Ok(Vec::new());
        }

        let timer = QueryTimer::new("insert_compliance_drifts_batch");
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(drifts.len());

        for drift in drifts {
            let entity = sqlx::query_as::<_, ComplianceDriftEntity>(
                r#"
                INSERT INTO compliance_drifts (
                    shop_id, product_id, product_title, drift_kind, severity,
                    previous_value, current_value, source_rule_id, fingerprint, detected_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
                "#,
            )
            .bind(drift.shop_id)
            .bind(&drift.product_id)
            .bind(&drift.product_title)
            .bind(drift.drift_kind.as_str())
            .bind(drift.severity.as_str())
            .bind(&drift.previous_value)
            .bind(&drift.current_value)
            .bind(drift.source_rule_id)
            .bind(&drift.fingerprint)
            .bind(drift.detected_at)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(entity);
        }

        tx.commit().await?;
        timer.record();

        inserted.into_iter().map(decode_one).collect()
    }

    async fn open_fingerprints(
        &self,
        shop_id: Uuid,
        product_id: &str,
    ) -> Result<HashSet<String>, DomainError> {
        let timer = QueryTimer::new("find_open_drift_fingerprints");
        let result = sqlx::query_scalar::<_, String>(
            r#"
            SELECT fingerprint FROM compliance_drifts
            WHERE shop_id = $1 AND product_id = $2 AND is_resolved = false
            "#,
        )
        .bind(shop_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(result?.into_iter().collect())
    }

    async fn list_unresolved(
        &self,
        shop_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ComplianceDrift>, DomainError> {
        let timer = QueryTimer::new("list_unresolved_drifts");
        let result = sqlx::query_as::<_, ComplianceDriftEntity>(
            r#"
            SELECT * FROM compliance_drifts
            WHERE shop_id = $1 AND is_resolved = false
            ORDER BY detected_at DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(shop_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(decode_all("compliance_drifts", result?))
    }

    async fn summarize(
        &self,
        shop_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<DriftSummary, DomainError> {
        let timer = QueryTimer::new("summarize_drifts");
        let (total, resolved, products_affected) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE is_resolved),
                COUNT(DISTINCT product_id) FILTER (WHERE NOT is_resolved)
            FROM compliance_drifts
            WHERE shop_id = $1 AND detected_at >= $2
            "#,
        )
        .bind(shop_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let groups = sqlx::query_as::<_, (String, String, i64)>(
            r#"
            SELECT severity, drift_kind, COUNT(*)
            FROM compliance_drifts
            WHERE shop_id = $1 AND detected_at >= $2 AND is_resolved = false
            GROUP BY severity, drift_kind
            "#,
        )
        .bind(shop_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        timer.record();

        let mut summary = DriftSummary {
            total,
            resolved,
            unresolved: total - resolved,
            products_affected,
            ..Default::default()
        };
        for (severity, kind, count) in groups {
            match (Severity::parse(&severity), DriftKind::parse(&kind)) {
                (Some(severity), Some(kind)) => {
                    summary.by_severity.add(severity, count);
                    *summary.by_kind.entry(kind).or_insert(0) += count;
                }
                _ => tracing::warn!(
                    severity = %severity,
                    drift_kind = %kind,
                    "Skipping unknown drift group"
                ),
            }
        }
        Ok(summary)
    }

    async fn find_drift(&self, drift_id: Uuid) -> Result<Option<ComplianceDrift>, DomainError> {
        let timer = QueryTimer::new("find_compliance_drift");
        let result = sqlx::query_as::<_, ComplianceDriftEntity>(
            "SELECT * FROM compliance_drifts WHERE id = $1",
        )
        .bind(drift_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result?.map(decode_one).transpose()
    }

    async fn resolve_drift(
        &self,
        drift_id: Uuid,
        resolved_by: ResolvedBy,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<ComplianceDrift>, DomainError> {
        let timer = QueryTimer::new("resolve_compliance_drift");
        let result = sqlx::query_as::<_, ComplianceDriftEntity>(
            r#"
            UPDATE compliance_drifts
            SET is_resolved = true, resolved_by = $2, resolved_at = $3
            WHERE id = $1 AND is_resolved = false
            RETURNING *
            "#,
        )
        .bind(drift_id)
        .bind(resolved_by.as_str())
        .bind(resolved_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result?.map(decode_one).transpose()
    }

    async fn resolve_all_for_product(
        &self,
        shop_id: Uuid,
        product_id: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        let timer = QueryTimer::new("resolve_product_drifts");
        let result = sqlx::query(
            r#"
            UPDATE compliance_drifts
            SET is_resolved = true, resolved_by = $3, resolved_at = $4
            WHERE shop_id = $1 AND product_id = $2 AND is_resolved = false
            "#,
        )
        .bind(shop_id)
        .bind(product_id)
        .bind(ResolvedBy::Auto.as_str())
        .bind(resolved_at)
        .execute(&self.pool)
        .await;
        timer.record();

        Ok(result?.rows_affected())
    }
}
