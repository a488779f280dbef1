//! Storage traits implemented by the persistence crate and the in-memory store.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::billing::ShopBillingState;
use crate::models::catalog_rule::{CatalogRule, CatalogRulePatch, NewCatalogRule};
use crate::models::drift::{ComplianceDrift, DriftSummary, NewDrift, ResolvedBy};
use crate::models::product::ProductSnapshot;
use crate::models::scheduled_audit::{RunSuccess, ScheduleSettings, ScheduledAudit};
use crate::models::shop::Shop;

#[async_trait]
pub trait ShopRepository: Send + Sync {
    async fn find_shop(&self, shop_id: Uuid) -> Result<Option<Shop>, DomainError>;
}

/// Last scanned snapshot per product.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    async fn find_snapshot(
        &self,
        shop_id: Uuid,
        product_id: &str,
    ) -> Result<Option<ProductSnapshot>, DomainError>;

    /// Overwrites the stored snapshot for the product.
    async fn save_snapshot(
        &self,
        shop_id: Uuid,
        product_id: &str,
        snapshot: &ProductSnapshot,
        scanned_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Number of distinct products scanned for the shop.
    async fn count_snapshots(&self, shop_id: Uuid) -> Result<i64, DomainError>;
}

#[async_trait]
pub trait CatalogRuleRepository: Send + Sync {
    async fn list_rules(&self, shop_id: Uuid) -> Result<Vec<CatalogRule>, DomainError>;

    async fn list_enabled_rules(&self, shop_id: Uuid) -> Result<Vec<CatalogRule>, DomainError>;

    async fn find_rule(
        &self,
        shop_id: Uuid,
        rule_id: Uuid,
    ) -> Result<Option<CatalogRule>, DomainError>;

    /// Inserts all rules in one batch, preserving input order.
    async fn create_rules(
        &self,
        rules: &[NewCatalogRule],
    ) -> Result<Vec<CatalogRule>, DomainError>;

    async fn update_rule(
        &self,
        shop_id: Uuid,
        rule_id: Uuid,
        patch: &CatalogRulePatch,
    ) -> Result<Option<CatalogRule>, DomainError>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete_rule(&self, shop_id: Uuid, rule_id: Uuid) -> Result<bool, DomainError>;
}

#[async_trait]
pub trait DriftRepository: Send + Sync {
    /// Inserts all drifts atomically. Readers never see a partial batch.
    async fn insert_drifts(&self, drifts: &[NewDrift]) -> Result<Vec<ComplianceDrift>, DomainError>;

    /// Fingerprints of unresolved drifts for one product.
    async fn open_fingerprints(
        &self,
        shop_id: Uuid,
        product_id: &str,
    ) -> Result<HashSet<String>, DomainError>;

    /// Unresolved drifts, newest first.
    async fn list_unresolved(
        &self,
        shop_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ComplianceDrift>, DomainError>;

    /// Aggregates drifts detected at or after `since`. `window_days` is left to the caller.
    async fn summarize(
        &self,
        shop_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<DriftSummary, DomainError>;

    async fn find_drift(&self, drift_id: Uuid) -> Result<Option<ComplianceDrift>, DomainError>;

    /// Sets the resolution fields if the drift is still open.
    ///
    /// Returns `None` when the drift does not exist or was already resolved.
    async fn resolve_drift(
        &self,
        drift_id: Uuid,
        resolved_by: ResolvedBy,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<ComplianceDrift>, DomainError>;

    /// Resolves every open drift for the product as `auto`.
    async fn resolve_all_for_product(
        &self,
        shop_id: Uuid,
        product_id: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<u64, DomainError>;
}

#[async_trait]
pub trait ScheduledAuditRepository: Send + Sync {
    async fn find_schedule(&self, id: Uuid) -> Result<Option<ScheduledAudit>, DomainError>;

    async fn find_schedule_by_shop(
        &self,
        shop_id: Uuid,
    ) -> Result<Option<ScheduledAudit>, DomainError>;

    /// Enabled schedules with `next_run_at <= now`, oldest due first.
    async fn find_due_schedules(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledAudit>, DomainError>;

    /// Creates or replaces the single schedule for a shop.
    async fn upsert_schedule(
        &self,
        shop_id: Uuid,
        settings: &ScheduleSettings,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<ScheduledAudit, DomainError>;

    async fn record_run_success(&self, id: Uuid, run: &RunSuccess) -> Result<(), DomainError>;

    /// Marks the last run failed. `next_run_at` is left untouched.
    async fn record_run_failure(&self, id: Uuid, ran_at: DateTime<Utc>) -> Result<(), DomainError>;
}

#[async_trait]
pub trait BillingRepository: Send + Sync {
    /// Loads the billing row, creating a free-plan row when none exists.
    /// Fails with `NotFound` when the shop itself does not exist.
    async fn find_or_create_billing(
        &self,
        shop_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ShopBillingState, DomainError>;

    /// Zeroes the credit counter if its reset time is before `now`.
    ///
    /// Returns `None` when another caller already reset it.
    async fn reset_ai_credits(
        &self,
        shop_id: Uuid,
        now: DateTime<Utc>,
        next_reset_at: DateTime<Utc>,
    ) -> Result<Option<ShopBillingState>, DomainError>;

    /// Increments the credit counter if it is below `limit`.
    ///
    /// Returns the new count, or `None` when the ceiling was hit.
    async fn increment_ai_credits(
        &self,
        shop_id: Uuid,
        limit: i32,
    ) -> Result<Option<i32>, DomainError>;

    async fn reset_audit_count(
        &self,
        shop_id: Uuid,
        now: DateTime<Utc>,
        next_reset_at: DateTime<Utc>,
    ) -> Result<Option<ShopBillingState>, DomainError>;

    /// Increments the audit counter, bounded by `limit` when one is given.
    async fn increment_audit_count(
        &self,
        shop_id: Uuid,
        limit: Option<i32>,
    ) -> Result<Option<i32>, DomainError>;
}
