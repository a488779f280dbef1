//! Runs due scheduled audits and sends their notifications.

use domain::models::scheduled_audit::RunAllSummary;
use domain::services::{AuditScheduler, NotificationDispatch};
use serde::Serialize;
use tracing::info;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_scheduled_audit_run;
use domain::error::DomainError;

/// Outcome of one pass over the due schedules.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledAuditPass {
    #[serde(flatten)]
    pub summary: RunAllSummary,
    pub notifications: NotificationDispatch,
}

/// Runs every due audit in order, then notifies for the successful ones.
///
/// Shared by the cron endpoint and the in-process job.
pub async fn run_scheduled_audit_pass(
    scheduler: &AuditScheduler,
) -> Result<ScheduledAuditPass, DomainError> {
    let summary = scheduler.run_all_due().await?;
    for result in &summary.results {
        record_scheduled_audit_run(result.success);
    }
    let notifications = scheduler.dispatch_run_notifications(&summary.results).await;

    info!(
        processed = summary.processed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        notifications_sent = notifications.sent,
        notifications_failed = notifications.failed,
        "Scheduled audits processed"
    );
    Ok(ScheduledAuditPass {
        summary,
        notifications,
    })
}

pub struct ScheduledAuditJob {
    scheduler: AuditScheduler,
    poll_interval_minutes: u64,
}

impl ScheduledAuditJob {
    pub fn new(scheduler: AuditScheduler, poll_interval_minutes: u64) -> Self {
        Self {
            scheduler,
            poll_interval_minutes,
        }
    }
}

#[async_trait::async_trait]
impl Job for ScheduledAuditJob {
    fn name(&self) -> &'static str {
        "scheduled_audits"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.poll_interval_minutes)
    }

    async fn execute(&self) -> Result<(), String> {
        run_scheduled_audit_pass(&self.scheduler)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domain::models::scheduled_audit::{AuditFrequency, ScheduleSettings};
    use domain::ports::{
        InMemoryStore, MockNotificationService, MockReportGenerator, MockReportMode,
    };
    use shared::time::FixedClock;
    use std::sync::Arc;

    fn scheduler(
        store: &InMemoryStore,
        clock: Arc<FixedClock>,
        notifications: MockNotificationService,
    ) -> AuditScheduler {
        AuditScheduler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(MockReportGenerator::new(MockReportMode::Succeed { drifts_detected: 2 })),
            Arc::new(notifications),
            clock,
        )
    }

    fn daily_at(hour: i32) -> ScheduleSettings {
        ScheduleSettings {
            frequency: AuditFrequency::Daily,
            hour,
            day_of_week: None,
            day_of_month: None,
            is_enabled: true,
            notification_preferences: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_pass_runs_due_schedule_and_notifies() {
        let store = InMemoryStore::new();
        let shop = store.seed_shop("demo.myshopify.com").await;
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap(),
        ));
        let notifications = MockNotificationService::new();
        let scheduler = scheduler(&store, clock.clone(), notifications.clone());

        scheduler.upsert_schedule(shop.id, daily_at(9)).await.unwrap();
        clock.set(Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap());

        let pass = run_scheduled_audit_pass(&scheduler).await.unwrap();
        assert_eq!(pass.summary.processed, 1);
        assert_eq!(pass.summary.succeeded, 1);
        assert!(pass.notifications.sent >= 1);
        assert!(!notifications.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_job_with_nothing_due() {
        let store = InMemoryStore::new();
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let job = ScheduledAuditJob::new(
            scheduler(&store, clock, MockNotificationService::new()),
            15,
        );
        assert_eq!(job.frequency(), JobFrequency::Minutes(15));
        assert!(job.execute().await.is_ok());
    }
}
