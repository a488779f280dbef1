//! Recurring catalog audits.
//!
//! A schedule moves `disabled -> pending -> running -> success | failed ->
//! pending`. Failed runs keep their `next_run_at`, so they stay due and are
//! retried on the next pass. Due schedules are processed one at a time.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use shared::time::Clock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::scheduled_audit::{
    AuditFrequency, AuditRunResult, DueAudit, RunAllSummary, RunSuccess, ScheduleSettings,
    ScheduledAudit,
};
use crate::models::shop::Shop;
use crate::ports::{
    DriftAlert, NotificationResult, NotificationService, ReportGenerator,
    ScheduledAuditRepository, ShopRepository, SnapshotRepository,
};

pub const DEFAULT_RUN_TIMEOUT: StdDuration = StdDuration::from_secs(120);

/// First run strictly after `now` at the configured hour and day.
pub fn initial_run_at(settings: &ScheduleSettings, now: DateTime<Utc>) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(settings.hour.clamp(0, 23) as u32, 0, 0)
        .unwrap_or(NaiveTime::MIN);
    let today = now.date_naive();
    let at = |date: chrono::NaiveDate| Utc.from_utc_datetime(&date.and_time(time));

    match settings.frequency {
        AuditFrequency::Daily => {
            let candidate = at(today);
            if candidate > now {
                candidate
            } else {
                candidate + Duration::days(1)
            }
        }
        AuditFrequency::Weekly => {
            let target = i64::from(settings.day_of_week.unwrap_or(1).rem_euclid(7));
            let current = i64::from(now.weekday().num_days_from_sunday());
            let candidate = at(today + Duration::days((target - current).rem_euclid(7)));
            if candidate > now {
                candidate
            } else {
                candidate + Duration::days(7)
            }
        }
        AuditFrequency::Monthly => {
            let day = settings.day_of_month.unwrap_or(1).clamp(1, 28) as u32;
            let candidate = at(today.with_day(day).unwrap_or(today));
            if candidate > now {
                candidate
            } else {
                shared::time::add_months(candidate, 1)
            }
        }
    }
}

fn validate_settings(settings: &ScheduleSettings) -> Result<(), DomainError> {
    let to_domain = |e: validator::ValidationError| {
        DomainError::Validation(
            e.message
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.code.to_string()),
        )
    };
    shared::validation::validate_hour(settings.hour).map_err(to_domain)?;
    if let Some(day) = settings.day_of_week {
        shared::validation::validate_day_of_week(day).map_err(to_domain)?;
    }
    if let Some(day) = settings.day_of_month {
        shared::validation::validate_day_of_month(day).map_err(to_domain)?;
    }
    shared::validation::validate_recipients(&settings.notification_preferences.recipients)
        .map_err(to_domain)
}

/// Counts from a notification dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDispatch {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl NotificationDispatch {
    fn record(&mut self, result: NotificationResult) {
        match result {
            NotificationResult::Sent => self.sent += 1,
            NotificationResult::Failed(_) => self.failed += 1,
            NotificationResult::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Clone)]
pub struct AuditScheduler {
    schedules: Arc<dyn ScheduledAuditRepository>,
    shops: Arc<dyn ShopRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
    reports: Arc<dyn ReportGenerator>,
    notifications: Arc<dyn NotificationService>,
    clock: Arc<dyn Clock>,
    run_timeout: StdDuration,
}

impl AuditScheduler {
    pub fn new(
        schedules: Arc<dyn ScheduledAuditRepository>,
        shops: Arc<dyn ShopRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        reports: Arc<dyn ReportGenerator>,
        notifications: Arc<dyn NotificationService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            schedules,
            shops,
            snapshots,
            reports,
            notifications,
            clock,
            run_timeout: DEFAULT_RUN_TIMEOUT,
        }
    }

    pub fn with_run_timeout(mut self, timeout: StdDuration) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Enabled schedules due now, joined with their shop.
    ///
    /// Schedules whose shop no longer exists are skipped.
    pub async fn get_due_audits(&self) -> Result<Vec<DueAudit>, DomainError> {
        let now = self.clock.now();
        let schedules = self.schedules.find_due_schedules(now).await?;

        let mut due = Vec::with_capacity(schedules.len());
        for audit in schedules {
            match self.shops.find_shop(audit.shop_id).await? {
                Some(shop) => due.push(DueAudit { audit, shop }),
                None => warn!(
                    scheduled_audit_id = %audit.id,
                    shop_id = %audit.shop_id,
                    "Skipping scheduled audit for missing shop"
                ),
            }
        }
        Ok(due)
    }

    /// Runs one scheduled audit.
    ///
    /// A missing schedule or shop yields a failure result without touching
    /// state. Snapshot count failures, report failures and timeouts are
    /// recorded as `failed`.
    pub async fn run_one(&self, scheduled_audit_id: Uuid) -> Result<AuditRunResult, DomainError> {
        let Some(audit) = self.schedules.find_schedule(scheduled_audit_id).await? else {
            return Ok(AuditRunResult::skipped(
                scheduled_audit_id,
                "Scheduled audit not found",
            ));
        };
        let Some(shop) = self.shops.find_shop(audit.shop_id).await? else {
            let mut result = AuditRunResult::skipped(scheduled_audit_id, "Shop not found");
            result.shop_id = Some(audit.shop_id);
            return Ok(result);
        };
        self.execute(audit, shop).await
    }

    async fn execute(
        &self,
        audit: ScheduledAudit,
        shop: Shop,
    ) -> Result<AuditRunResult, DomainError> {
        let now = self.clock.now();
        let counted = self.snapshots.count_snapshots(shop.id).await;
        let products_audited = counted
            .as_ref()
            .map_or(0, |count| i32::try_from(*count).unwrap_or(i32::MAX));
        let period = audit.frequency.report_period();

        let report = match counted {
            Ok(_) => match tokio::time::timeout(
                self.run_timeout,
                self.reports.generate_catalog_report(shop.id, period),
            )
            .await
            {
                Ok(report) => report,
                Err(_) => Err(DomainError::Timeout(self.run_timeout.as_secs())),
            },
            Err(e) => Err(e),
        };

        let mut result = AuditRunResult {
            scheduled_audit_id: audit.id,
            shop_id: Some(shop.id),
            shop_domain: Some(shop.domain.clone()),
            success: false,
            products_audited,
            drifts_detected: 0,
            report_id: None,
            next_run_at: audit.next_run_at,
            error: None,
            notification_preferences: Some(audit.notification_preferences.clone()),
            shop: Some(shop),
        };

        match report {
            Ok(report) => {
                let next_run_at = audit.frequency.advance(now);
                self.schedules
                    .record_run_success(
                        audit.id,
                        &RunSuccess {
                            ran_at: now,
                            product_count: products_audited,
                            drift_count: report.drifts_detected,
                            next_run_at,
                        },
                    )
                    .await?;

                info!(
                    scheduled_audit_id = %audit.id,
                    shop_id = %audit.shop_id,
                    products_audited,
                    drifts_detected = report.drifts_detected,
                    next_run_at = %next_run_at,
                    "Scheduled audit completed"
                );
                result.success = true;
                result.drifts_detected = report.drifts_detected;
                result.report_id = Some(report.id);
                result.next_run_at = Some(next_run_at);
            }
            Err(e) => {
                self.schedules.record_run_failure(audit.id, now).await?;
                warn!(
                    scheduled_audit_id = %audit.id,
                    shop_id = %audit.shop_id,
                    error = %e,
                    "Scheduled audit failed"
                );
                result.error = Some(e.to_string());
            }
        }
        Ok(result)
    }

    /// Runs every due audit sequentially. One failure never stops the rest.
    pub async fn run_all_due(&self) -> Result<RunAllSummary, DomainError> {
        let due = self.get_due_audits().await?;
        let mut results = Vec::with_capacity(due.len());

        for entry in due {
            let id = entry.audit.id;
            match self.run_one(id).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(scheduled_audit_id = %id, error = %e, "Scheduled audit errored");
                    let mut result = AuditRunResult::skipped(id, e.to_string());
                    result.shop_id = Some(entry.shop.id);
                    result.shop_domain = Some(entry.shop.domain);
                    results.push(result);
                }
            }
        }

        let summary = RunAllSummary::from_results(results);
        info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Scheduled audit pass finished"
        );
        Ok(summary)
    }

    pub async fn get_schedule(&self, shop_id: Uuid) -> Result<ScheduledAudit, DomainError> {
        self.schedules
            .find_schedule_by_shop(shop_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Schedule not found".to_string()))
    }

    /// Creates or updates the shop's schedule.
    ///
    /// `next_run_at` is recomputed for new or re-enabled schedules and when
    /// the timing changed; disabling clears it.
    pub async fn upsert_schedule(
        &self,
        shop_id: Uuid,
        settings: ScheduleSettings,
    ) -> Result<ScheduledAudit, DomainError> {
        validate_settings(&settings)?;
        if self.shops.find_shop(shop_id).await?.is_none() {
            return Err(DomainError::NotFound("Shop not found".to_string()));
        }

        let existing = self.schedules.find_schedule_by_shop(shop_id).await?;
        let next_run_at = if !settings.is_enabled {
            None
        } else {
            match &existing {
                Some(current)
                    if current.is_enabled
                        && current.same_timing(&settings)
                        && current.next_run_at.is_some() =>
                {
                    current.next_run_at
                }
                _ => Some(initial_run_at(&settings, self.clock.now())),
            }
        };

        let audit = self
            .schedules
            .upsert_schedule(shop_id, &settings, next_run_at)
            .await?;
        info!(
            shop_id = %shop_id,
            frequency = audit.frequency.as_str(),
            enabled = audit.is_enabled,
            next_run_at = ?audit.next_run_at,
            "Audit schedule saved"
        );
        Ok(audit)
    }

    /// Sends drift alerts and report emails for successful runs.
    ///
    /// Failures are logged and never retried.
    pub async fn dispatch_run_notifications(
        &self,
        results: &[AuditRunResult],
    ) -> NotificationDispatch {
        let mut dispatch = NotificationDispatch::default();

        for result in results.iter().filter(|r| r.success) {
            let (Some(shop), Some(prefs)) = (&result.shop, &result.notification_preferences) else {
                continue;
            };
            let recipients = result.recipients();

            if prefs.drift_alerts && result.drifts_detected > 0 {
                let outcome = self
                    .notifications
                    .send_drift_alert(
                        shop,
                        &recipients,
                        DriftAlert {
                            drifts_detected: result.drifts_detected,
                            products_audited: result.products_audited,
                        },
                    )
                    .await;
                if let NotificationResult::Failed(reason) = &outcome {
                    warn!(shop_id = %shop.id, error = %reason, "Drift alert email failed");
                }
                dispatch.record(outcome);
            }

            if prefs.report_emails {
                if let Some(report_id) = result.report_id {
                    let outcome = self
                        .notifications
                        .send_report_email(shop, &recipients, report_id)
                        .await;
                    if let NotificationResult::Failed(reason) = &outcome {
                        warn!(shop_id = %shop.id, error = %reason, "Report email failed");
                    }
                    dispatch.record(outcome);
                }
            }
        }
        dispatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scheduled_audit::{
        CatalogReport, NotificationPreferences, ReportPeriod, RunStatus,
    };
    use crate::models::ProductSnapshot;
    use crate::ports::{
        InMemoryStore, MockNotificationService, MockReportGenerator, MockReportMode,
        SentNotification,
    };
    use async_trait::async_trait;
    use shared::time::FixedClock;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn settings(frequency: AuditFrequency, hour: i32) -> ScheduleSettings {
        ScheduleSettings {
            frequency,
            hour,
            day_of_week: (frequency == AuditFrequency::Weekly).then_some(1),
            day_of_month: (frequency == AuditFrequency::Monthly).then_some(1),
            is_enabled: true,
            notification_preferences: NotificationPreferences::default(),
        }
    }

    struct Fixture {
        store: InMemoryStore,
        reports: MockReportGenerator,
        notifications: MockNotificationService,
        clock: Arc<FixedClock>,
        scheduler: AuditScheduler,
    }

    fn fixture_with(reports: Arc<dyn ReportGenerator>, mock: MockReportGenerator) -> Fixture {
        let store = InMemoryStore::new();
        let notifications = MockNotificationService::new();
        // Wednesday.
        let clock = Arc::new(FixedClock::new(utc(2025, 1, 29, 10, 0)));
        let scheduler = AuditScheduler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            reports,
            Arc::new(notifications.clone()),
            clock.clone(),
        )
        .with_run_timeout(StdDuration::from_millis(50));
        Fixture {
            store,
            reports: mock,
            notifications,
            clock,
            scheduler,
        }
    }

    fn fixture(mode: MockReportMode) -> Fixture {
        let reports = MockReportGenerator::new(mode);
        fixture_with(Arc::new(reports.clone()), reports)
    }

    /// Creates a shop with an enabled schedule that is due now.
    async fn due_schedule(f: &Fixture, frequency: AuditFrequency) -> ScheduledAudit {
        let shop = f.store.seed_shop(&format!("shop-{}.myshopify.com", Uuid::new_v4())).await;
        let mut audit = f
            .scheduler
            .upsert_schedule(shop.id, settings(frequency, 6))
            .await
            .unwrap();
        audit.next_run_at = Some(f.clock.now() - Duration::minutes(1));
        f.store.put_schedule(audit.clone()).await;
        audit
    }

    #[test]
    fn test_initial_run_daily() {
        let now = utc(2025, 1, 29, 10, 0);
        assert_eq!(
            initial_run_at(&settings(AuditFrequency::Daily, 11), now),
            utc(2025, 1, 29, 11, 0)
        );
        assert_eq!(
            initial_run_at(&settings(AuditFrequency::Daily, 10), now),
            utc(2025, 1, 30, 10, 0)
        );
    }

    #[test]
    fn test_initial_run_weekly() {
        // Wednesday 2025-01-29; Monday is day 1.
        let now = utc(2025, 1, 29, 10, 0);
        assert_eq!(
            initial_run_at(&settings(AuditFrequency::Weekly, 6), now),
            utc(2025, 2, 3, 6, 0)
        );
        let mut wednesday = settings(AuditFrequency::Weekly, 9);
        wednesday.day_of_week = Some(3);
        assert_eq!(initial_run_at(&wednesday, now), utc(2025, 2, 5, 9, 0));
        wednesday.hour = 12;
        assert_eq!(initial_run_at(&wednesday, now), utc(2025, 1, 29, 12, 0));
    }

    #[test]
    fn test_initial_run_monthly() {
        let now = utc(2025, 1, 29, 10, 0);
        let mut monthly = settings(AuditFrequency::Monthly, 8);
        monthly.day_of_month = Some(15);
        assert_eq!(initial_run_at(&monthly, now), utc(2025, 2, 15, 8, 0));
        monthly.day_of_month = Some(28);
        assert_eq!(initial_run_at(&monthly, now), utc(2025, 1, 28, 8, 0) + Duration::days(31));
    }

    #[tokio::test]
    async fn test_upsert_new_schedule_sets_next_run() {
        let f = fixture(MockReportMode::Succeed { drifts_detected: 0 });
        let shop = f.store.seed_shop("demo.myshopify.com").await;
        let audit = f
            .scheduler
            .upsert_schedule(shop.id, settings(AuditFrequency::Daily, 11))
            .await
            .unwrap();
        assert_eq!(audit.next_run_at, Some(utc(2025, 1, 29, 11, 0)));
        assert_eq!(f.scheduler.get_schedule(shop.id).await.unwrap().id, audit.id);
    }

    #[tokio::test]
    async fn test_upsert_keeps_next_run_when_timing_unchanged() {
        let f = fixture(MockReportMode::Succeed { drifts_detected: 0 });
        let shop = f.store.seed_shop("demo.myshopify.com").await;
        let first = f
            .scheduler
            .upsert_schedule(shop.id, settings(AuditFrequency::Daily, 11))
            .await
            .unwrap();

        f.clock.advance(Duration::hours(2));
        let mut same = settings(AuditFrequency::Daily, 11);
        same.notification_preferences.report_emails = true;
        let second = f.scheduler.upsert_schedule(shop.id, same).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.next_run_at, first.next_run_at);
        assert!(second.notification_preferences.report_emails);

        let changed = f
            .scheduler
            .upsert_schedule(shop.id, settings(AuditFrequency::Daily, 15))
            .await
            .unwrap();
        assert_eq!(changed.next_run_at, Some(utc(2025, 1, 29, 15, 0)));
    }

    #[tokio::test]
    async fn test_disable_clears_and_reenable_recomputes() {
        let f = fixture(MockReportMode::Succeed { drifts_detected: 0 });
        let shop = f.store.seed_shop("demo.myshopify.com").await;
        let mut s = settings(AuditFrequency::Daily, 11);
        f.scheduler.upsert_schedule(shop.id, s.clone()).await.unwrap();

        s.is_enabled = false;
        let disabled = f.scheduler.upsert_schedule(shop.id, s.clone()).await.unwrap();
        assert_eq!(disabled.next_run_at, None);

        f.clock.advance(Duration::hours(3));
        s.is_enabled = true;
        let enabled = f.scheduler.upsert_schedule(shop.id, s).await.unwrap();
        assert_eq!(enabled.next_run_at, Some(utc(2025, 1, 30, 11, 0)));
    }

    #[tokio::test]
    async fn test_upsert_validates_settings() {
        let f = fixture(MockReportMode::Succeed { drifts_detected: 0 });
        let shop = f.store.seed_shop("demo.myshopify.com").await;

        let bad_hour = settings(AuditFrequency::Daily, 24);
        assert!(matches!(
            f.scheduler.upsert_schedule(shop.id, bad_hour).await,
            Err(DomainError::Validation(_))
        ));

        let mut bad_day = settings(AuditFrequency::Monthly, 3);
        bad_day.day_of_month = Some(31);
        assert!(f.scheduler.upsert_schedule(shop.id, bad_day).await.is_err());

        assert!(matches!(
            f.scheduler
                .upsert_schedule(Uuid::new_v4(), settings(AuditFrequency::Daily, 3))
                .await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_due_audits_skip_disabled_future_and_orphaned() {
        let f = fixture(MockReportMode::Succeed { drifts_detected: 0 });
        let due = due_schedule(&f, AuditFrequency::Daily).await;

        let mut disabled = due_schedule(&f, AuditFrequency::Daily).await;
        disabled.is_enabled = false;
        f.store.put_schedule(disabled).await;

        let mut future = due_schedule(&f, AuditFrequency::Daily).await;
        future.next_run_at = Some(f.clock.now() + Duration::hours(1));
        f.store.put_schedule(future).await;

        let orphan = due_schedule(&f, AuditFrequency::Daily).await;
        f.store.remove_shop(orphan.shop_id).await;

        let listed = f.scheduler.get_due_audits().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].audit.id, due.id);
        assert_eq!(listed[0].shop.id, due.shop_id);
    }

    #[tokio::test]
    async fn test_run_one_success_advances_weekly_by_seven_days() {
        let f = fixture(MockReportMode::Succeed { drifts_detected: 3 });
        let audit = due_schedule(&f, AuditFrequency::Weekly).await;

        let result = f.scheduler.run_one(audit.id).await.unwrap();
        assert!(result.success);
        assert_eq!(result.drifts_detected, 3);
        assert_eq!(result.next_run_at, Some(f.clock.now() + Duration::days(7)));

        let stored = f.scheduler.get_schedule(audit.shop_id).await.unwrap();
        assert_eq!(stored.last_run_status, Some(RunStatus::Success));
        assert_eq!(stored.last_run_at, Some(f.clock.now()));
        assert_eq!(stored.last_run_drift_count, Some(3));
        assert_eq!(stored.next_run_at, Some(utc(2025, 2, 5, 10, 0)));
        assert_eq!(f.reports.calls().await, vec![(audit.shop_id, ReportPeriod::Weekly)]);
    }

    #[tokio::test]
    async fn test_monthly_run_on_jan_31_lands_on_feb_28() {
        let f = fixture(MockReportMode::Succeed { drifts_detected: 0 });
        f.clock.set(utc(2025, 1, 31, 6, 0));
        let audit = due_schedule(&f, AuditFrequency::Monthly).await;

        let result = f.scheduler.run_one(audit.id).await.unwrap();
        assert_eq!(result.next_run_at, Some(utc(2025, 2, 28, 6, 0)));
        assert_eq!(f.reports.calls().await[0].1, ReportPeriod::Monthly);

        f.clock.set(utc(2024, 1, 31, 6, 0));
        let leap = due_schedule(&f, AuditFrequency::Monthly).await;
        let result = f.scheduler.run_one(leap.id).await.unwrap();
        assert_eq!(result.next_run_at, Some(utc(2024, 2, 29, 6, 0)));
    }

    #[tokio::test]
    async fn test_failed_report_keeps_next_run() {
        let f = fixture(MockReportMode::Fail);
        let audit = due_schedule(&f, AuditFrequency::Daily).await;

        let result = f.scheduler.run_one(audit.id).await.unwrap();
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or_default().contains("Simulated"));

        let stored = f.scheduler.get_schedule(audit.shop_id).await.unwrap();
        assert_eq!(stored.next_run_at, audit.next_run_at);
        assert_eq!(stored.last_run_status, Some(RunStatus::Failed));
        assert_eq!(stored.last_run_at, Some(f.clock.now()));
        assert_eq!(f.scheduler.get_due_audits().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_report_timeout_is_a_failure() {
        let f = fixture(MockReportMode::Hang);
        let audit = due_schedule(&f, AuditFrequency::Daily).await;

        let result = f.scheduler.run_one(audit.id).await.unwrap();
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or_default().contains("timed out"));

        let stored = f.scheduler.get_schedule(audit.shop_id).await.unwrap();
        assert_eq!(stored.next_run_at, audit.next_run_at);
        assert_eq!(stored.last_run_status, Some(RunStatus::Failed));
    }

    /// Snapshot store whose count always errors.
    struct BrokenSnapshots;

    #[async_trait]
    impl SnapshotRepository for BrokenSnapshots {
        async fn find_snapshot(
            &self,
            _shop_id: Uuid,
            _product_id: &str,
        ) -> Result<Option<ProductSnapshot>, DomainError> {
            Ok(None)
        }

        async fn save_snapshot(
            &self,
            _shop_id: Uuid,
            _product_id: &str,
            _snapshot: &ProductSnapshot,
            _scanned_at: DateTime<Utc>,
        ) -> Result<(), DomainError> {
            Ok(())
        }

        async fn count_snapshots(&self, _shop_id: Uuid) -> Result<i64, DomainError> {
            Err(DomainError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn test_snapshot_count_failure_is_recorded() {
        let store = InMemoryStore::new();
        let reports = MockReportGenerator::new(MockReportMode::Succeed { drifts_detected: 0 });
        let clock = Arc::new(FixedClock::new(utc(2025, 1, 29, 10, 0)));
        let scheduler = AuditScheduler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(BrokenSnapshots),
            Arc::new(reports.clone()),
            Arc::new(MockNotificationService::new()),
            clock.clone(),
        );
        let shop = store.seed_shop("counting.myshopify.com").await;
        let mut audit = scheduler
            .upsert_schedule(shop.id, settings(AuditFrequency::Daily, 6))
            .await
            .unwrap();
        audit.next_run_at = Some(clock.now() - Duration::minutes(1));
        store.put_schedule(audit.clone()).await;

        let result = scheduler.run_one(audit.id).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.products_audited, 0);
        let error = result.error.unwrap_or_default();
        assert!(error.starts_with("Database error"));
        assert!(reports.calls().await.is_empty());

        let stored = scheduler.get_schedule(shop.id).await.unwrap();
        assert_eq!(stored.last_run_status, Some(RunStatus::Failed));
        assert_eq!(stored.last_run_at, Some(clock.now()));
        assert_eq!(stored.next_run_at, audit.next_run_at);
    }

    #[tokio::test]
    async fn test_run_one_missing_schedule_or_shop() {
        let f = fixture(MockReportMode::Succeed { drifts_detected: 0 });
        let result = f.scheduler.run_one(Uuid::new_v4()).await.unwrap();
        assert!(!result.success);
        assert!(result.error.is_some());

        let audit = due_schedule(&f, AuditFrequency::Daily).await;
        f.store.remove_shop(audit.shop_id).await;
        let result = f.scheduler.run_one(audit.id).await.unwrap();
        assert!(!result.success);

        let stored = f.scheduler.get_schedule(audit.shop_id).await.unwrap();
        assert_eq!(stored.last_run_at, None);
        assert!(f.reports.calls().await.is_empty());
    }

    /// Fails for one shop, succeeds for the others.
    struct FailFor(Uuid);

    #[async_trait]
    impl ReportGenerator for FailFor {
        async fn generate_catalog_report(
            &self,
            shop_id: Uuid,
            _period: ReportPeriod,
        ) -> Result<CatalogReport, DomainError> {
            if shop_id == self.0 {
                return Err(DomainError::Upstream("scoring service down".into()));
            }
            Ok(CatalogReport {
                id: Uuid::new_v4(),
                total_products: 1,
                ready_products: 1,
                average_score: 100.0,
                drifts_detected: 1,
            })
        }
    }

    #[tokio::test]
    async fn test_run_all_due_isolates_failures() {
        let store = InMemoryStore::new();
        let failing = store.seed_shop("broken.myshopify.com").await;
        let healthy = store.seed_shop("fine.myshopify.com").await;
        let clock = Arc::new(FixedClock::new(utc(2025, 1, 29, 10, 0)));
        let scheduler = AuditScheduler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(FailFor(failing.id)),
            Arc::new(MockNotificationService::new()),
            clock.clone(),
        );

        for shop in [&failing, &healthy] {
            let mut audit = scheduler
                .upsert_schedule(shop.id, settings(AuditFrequency::Daily, 6))
                .await
                .unwrap();
            audit.next_run_at = Some(clock.now() - Duration::minutes(5));
            store.put_schedule(audit).await;
        }

        let summary = scheduler.run_all_due().await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);

        let remaining = scheduler.get_due_audits().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].shop.id, failing.id);
    }

    #[tokio::test]
    async fn test_dispatch_notifications() {
        let f = fixture(MockReportMode::Succeed { drifts_detected: 2 });
        let audit = due_schedule(&f, AuditFrequency::Daily).await;
        let mut with_reports = audit.clone();
        with_reports.notification_preferences.report_emails = true;
        f.store.put_schedule(with_reports).await;

        let summary = f.scheduler.run_all_due().await.unwrap();
        let dispatch = f.scheduler.dispatch_run_notifications(&summary.results).await;
        assert_eq!(dispatch.sent, 2);

        let sent = f.notifications.sent().await;
        assert!(matches!(
            &sent[0],
            SentNotification::DriftAlert { alert, recipients, .. }
                if alert.drifts_detected == 2 && recipients[0].starts_with("owner@")
        ));
        assert!(matches!(sent[1], SentNotification::ReportEmail { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_skips_failures_and_clean_runs() {
        let f = fixture(MockReportMode::Succeed { drifts_detected: 0 });
        due_schedule(&f, AuditFrequency::Daily).await;
        let summary = f.scheduler.run_all_due().await.unwrap();
        let dispatch = f.scheduler.dispatch_run_notifications(&summary.results).await;
        assert_eq!(dispatch, NotificationDispatch::default());

        f.reports.set_mode(MockReportMode::Fail).await;
        f.clock.advance(Duration::days(2));
        let summary = f.scheduler.run_all_due().await.unwrap();
        assert_eq!(summary.failed, 1);
        let dispatch = f.scheduler.dispatch_run_notifications(&summary.results).await;
        assert_eq!(dispatch, NotificationDispatch::default());
        assert!(f.notifications.sent().await.is_empty());
    }
}
