//! Scheduled audit entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::scheduled_audit::{AuditFrequency, NotificationPreferences, RunStatus};
use domain::models::ScheduledAudit;

/// Database row mapping for the scheduled_audits table.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduledAuditEntity {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub frequency: String,
    pub hour: i32,
    pub day_of_week: Option<i32>,
    pub day_of_month: Option<i32>,
    pub is_enabled: bool,
    pub notification_preferences: serde_json::Value,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_status: Option<String>,
    pub last_run_product_count: Option<i32>,
    pub last_run_drift_count: Option<i32>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScheduledAuditEntity> for ScheduledAudit {
    /// Unknown frequencies read as weekly; unreadable preferences fall back to defaults.
    fn from(entity: ScheduledAuditEntity) -> Self {
        let notification_preferences =
            serde_json::from_value::<NotificationPreferences>(entity.notification_preferences)
                .unwrap_or_else(|e| {
                    tracing::warn!(
                        scheduled_audit_id = %entity.id,
                        error = %e,
                        "Unreadable notification preferences, using defaults"
                    );
                    NotificationPreferences::default()
                });

        Self {
            id: entity.id,
            shop_id: entity.shop_id,
            frequency: AuditFrequency::parse_or_weekly(&entity.frequency),
            hour: entity.hour,
            day_of_week: entity.day_of_week,
            day_of_month: entity.day_of_month,
            is_enabled: entity.is_enabled,
            notification_preferences,
            last_run_at: entity.last_run_at,
            last_run_status: entity.last_run_status.as_deref().and_then(RunStatus::parse),
            last_run_product_count: entity.last_run_product_count,
            last_run_drift_count: entity.last_run_drift_count,
            next_run_at: entity.next_run_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
