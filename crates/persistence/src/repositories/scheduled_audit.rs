//! Scheduled audit repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use domain::error::DomainError;
use domain::models::scheduled_audit::{RunStatus, RunSuccess, ScheduleSettings};
use domain::models::ScheduledAudit;
use domain::ports::ScheduledAuditRepository;

use crate::entities::ScheduledAuditEntity;
use crate::metrics::QueryTimer;

/// Repository for per-shop audit schedules.
#[derive(Clone)]
pub struct PgScheduledAuditRepository {
    pool: PgPool,
}

impl PgScheduledAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduledAuditRepository for PgScheduledAuditRepository {
    async fn find_schedule(&self, id: Uuid) -> Result<Option<ScheduledAudit>, DomainError> {
        let timer = QueryTimer::new("find_scheduled_audit");
        let result = sqlx::query_as::<_, ScheduledAuditEntity>(
            "SELECT * FROM scheduled_audits WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result?.map(ScheduledAudit::from))
    }

    async fn find_schedule_by_shop(
        &self,
        shop_id: Uuid,
    ) -> Result<Option<ScheduledAudit>, DomainError> {
        let timer = QueryTimer::new("find_scheduled_audit_by_shop");
        let result = sqlx::query_as::<_, ScheduledAuditEntity>(
            "SELECT * FROM scheduled_audits WHERE shop_id = $1",
        )
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result?.map(ScheduledAudit::from))
    }

    async fn find_due_schedules(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledAudit>, DomainError> {
        let timer = QueryTimer::new("find_due_scheduled_audits");
        let result = sqlx::query_as::<_, ScheduledAuditEntity>(
            r#"
            SELECT * FROM scheduled_audits
            WHERE is_enabled = true
              AND next_run_at IS NOT NULL
              AND next_run_at <= $1
            ORDER BY next_run_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(result?.into_iter().map(ScheduledAudit::from).collect())
    }

    async fn upsert_schedule(
        &self,
        shop_id: Uuid,
        settings: &ScheduleSettings,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<ScheduledAudit, DomainError> {
        let timer = QueryTimer::new("upsert_scheduled_audit");
        let result = sqlx::query_as::<_, ScheduledAuditEntity>(
            r#"
            INSERT INTO scheduled_audits (
                shop_id, frequency, hour, day_of_week, day_of_month,
                is_enabled, notification_preferences, next_run_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (shop_id) DO UPDATE SET
                frequency = EXCLUDED.frequency,
                hour = EXCLUDED.hour,
                day_of_week = EXCLUDED.day_of_week,
                day_of_month = EXCLUDED.day_of_month,
                is_enabled = EXCLUDED.is_enabled,
                notification_preferences = EXCLUDED.notification_preferences,
                next_run_at = EXCLUDED.next_run_at,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(shop_id)
        .bind(settings.frequency.as_str())
        .bind(settings.hour)
        .bind(settings.day_of_week)
        .bind(settings.day_of_month)
        .bind(settings.is_enabled)
        .bind(Json(&settings.notification_preferences))
        .bind(next_run_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result?.into())
    }

    async fn record_run_success(&self, id: Uuid, run: &RunSuccess) -> Result<(), DomainError> {
        let timer = QueryTimer::new("record_scheduled_audit_success");
        let result = sqlx::query(
            r#"
            UPDATE scheduled_audits
            SET last_run_at = $2,
                last_run_status = $3,
                last_run_product_count = $4,
                last_run_drift_count = $5,
                next_run_at = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(run.ran_at)
        .bind(RunStatus::Success.as_str())
        .bind(run.product_count)
        .bind(run.drift_count)
        .bind(run.next_run_at)
        .execute(&self.pool)
        .await;
        timer.record();

        result?;
        Ok(())
    }

    async fn record_run_failure(&self, id: Uuid, ran_at: DateTime<Utc>) -> Result<(), DomainError> {
        let timer = QueryTimer::new("record_scheduled_audit_failure");
        let result = sqlx::query(
            r#"
            UPDATE scheduled_audits
            SET last_run_at = $2, last_run_status = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(ran_at)
        .bind(RunStatus::Failed.as_str())
        .execute(&self.pool)
        .await;
        timer.record();

        result?;
        Ok(())
    }
}
