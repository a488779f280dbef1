//! In-memory implementation of every repository port.
//!
//! Used by unit tests, HTTP tests and local runs without a database. A single
//! lock guards all tables, so each call is atomic like a single SQL statement.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::repositories::{
    BillingRepository, CatalogRuleRepository, DriftRepository, ScheduledAuditRepository,
    ShopRepository, SnapshotRepository,
};
use crate::error::DomainError;
use crate::models::billing::ShopBillingState;
use crate::models::catalog_rule::{CatalogRule, CatalogRulePatch, NewCatalogRule};
use crate::models::drift::{ComplianceDrift, DriftSummary, NewDrift, ResolvedBy};
use crate::models::product::ProductSnapshot;
use crate::models::scheduled_audit::{RunStatus, RunSuccess, ScheduleSettings, ScheduledAudit};
use crate::models::shop::Shop;

#[derive(Debug, Default)]
struct Tables {
    shops: HashMap<Uuid, Shop>,
    snapshots: HashMap<(Uuid, String), ProductSnapshot>,
    rules: Vec<CatalogRule>,
    drifts: Vec<ComplianceDrift>,
    schedules: Vec<ScheduledAudit>,
    billing: HashMap<Uuid, ShopBillingState>,
}

/// Shared in-memory store. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_shop(&self, shop: Shop) {
        self.tables.lock().await.shops.insert(shop.id, shop);
    }

    /// Creates a shop with the given domain and an owner email.
    pub async fn seed_shop(&self, domain: &str) -> Shop {
        let shop = Shop {
            id: Uuid::new_v4(),
            domain: domain.to_string(),
            email: Some(format!("owner@{}", domain)),
            created_at: Utc::now(),
        };
        self.insert_shop(shop.clone()).await;
        shop
    }

    pub async fn remove_shop(&self, shop_id: Uuid) {
        self.tables.lock().await.shops.remove(&shop_id);
    }

    pub async fn put_billing(&self, state: ShopBillingState) {
        self.tables.lock().await.billing.insert(state.shop_id, state);
    }

    pub async fn billing_state(&self, shop_id: Uuid) -> Option<ShopBillingState> {
        self.tables.lock().await.billing.get(&shop_id).cloned()
    }

    /// Replaces a stored schedule wholesale.
    pub async fn put_schedule(&self, audit: ScheduledAudit) {
        let mut tables = self.tables.lock().await;
        tables.schedules.retain(|s| s.id != audit.id);
        tables.schedules.push(audit);
    }

    /// All drifts for a shop in insertion order, resolved or not.
    pub async fn all_drifts(&self, shop_id: Uuid) -> Vec<ComplianceDrift> {
        self.tables
            .lock()
            .await
            .drifts
            .iter()
            .filter(|d| d.shop_id == shop_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ShopRepository for InMemoryStore {
    async fn find_shop(&self, shop_id: Uuid) -> Result<Option<Shop>, DomainError> {
        Ok(self.tables.lock().await.shops.get(&shop_id).cloned())
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryStore {
    async fn find_snapshot(
        &self,
        shop_id: Uuid,
        product_id: &str,
    ) -> Result<Option<ProductSnapshot>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .snapshots
            .get(&(shop_id, product_id.to_string()))
            .cloned())
    }

    async fn save_snapshot(
        &self,
        shop_id: Uuid,
        product_id: &str,
        snapshot: &ProductSnapshot,
        _scanned_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.tables
            .lock()
            .await
            .snapshots
            .insert((shop_id, product_id.to_string()), snapshot.clone());
        Ok(())
    }

    async fn count_snapshots(&self, shop_id: Uuid) -> Result<i64, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables.snapshots.keys().filter(|(s, _)| *s == shop_id).count() as i64)
    }
}

#[async_trait]
impl CatalogRuleRepository for InMemoryStore {
    async fn list_rules(&self, shop_id: Uuid) -> Result<Vec<CatalogRule>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .rules
            .iter()
            .filter(|r| r.shop_id == shop_id)
            .cloned()
            .collect())
    }

    async fn list_enabled_rules(&self, shop_id: Uuid) -> Result<Vec<CatalogRule>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .rules
            .iter()
            .filter(|r| r.shop_id == shop_id && r.is_enabled)
            .cloned()
            .collect())
    }

    async fn find_rule(
        &self,
        shop_id: Uuid,
        rule_id: Uuid,
    ) -> Result<Option<CatalogRule>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .rules
            .iter()
            .find(|r| r.id == rule_id && r.shop_id == shop_id)
            .cloned())
    }

    async fn create_rules(
        &self,
        rules: &[NewCatalogRule],
    ) -> Result<Vec<CatalogRule>, DomainError> {
        let now = Utc::now();
        let created: Vec<CatalogRule> = rules
            .iter()
            .map(|r| CatalogRule {
                id: Uuid::new_v4(),
                shop_id: r.shop_id,
                name: r.name.clone(),
                description: r.description.clone(),
                condition: r.condition.clone(),
                severity: r.severity,
                is_enabled: r.is_enabled,
                applies_to_all: r.applies_to_all,
                product_filter: r.product_filter.clone(),
                created_at: now,
                updated_at: now,
            })
            .collect();
        self.tables.lock().await.rules.extend(created.iter().cloned());
        Ok(created)
    }

    async fn update_rule(
        &self,
        shop_id: Uuid,
        rule_id: Uuid,
        patch: &CatalogRulePatch,
    ) -> Result<Option<CatalogRule>, DomainError> {
        let mut tables = self.tables.lock().await;
        let Some(rule) = tables
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id && r.shop_id == shop_id)
        else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            rule.name = name.clone();
        }
        if let Some(description) = &patch.description {
            rule.description = Some(description.clone());
        }
        if let Some(condition) = &patch.condition {
            rule.condition = condition.clone();
        }
        if let Some(severity) = patch.severity {
            rule.severity = severity;
        }
        if let Some(is_enabled) = patch.is_enabled {
            rule.is_enabled = is_enabled;
        }
        if let Some(applies_to_all) = patch.applies_to_all {
            rule.applies_to_all = applies_to_all;
        }
        if let Some(filter) = &patch.product_filter {
            rule.product_filter = Some(filter.clone());
        }
        rule.updated_at = Utc::now();
        Ok(Some(rule.clone()))
    }

    async fn delete_rule(&self, shop_id: Uuid, rule_id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.tables.lock().await;
        let before = tables.rules.len();
        tables
            .rules
            .retain(|r| !(r.id == rule_id && r.shop_id == shop_id));
        Ok(tables.rules.len() != before)
    }
}

#[async_trait]
impl DriftRepository for InMemoryStore {
    async fn insert_drifts(
        &self,
        drifts: &[NewDrift],
    ) -> Result<Vec<ComplianceDrift>, DomainError> {
        let created: Vec<ComplianceDrift> = drifts
            .iter()
            .map(|d| ComplianceDrift {
                id: Uuid::new_v4(),
                shop_id: d.shop_id,
                product_id: d.product_id.clone(),
                product_title: d.product_title.clone(),
                drift_kind: d.drift_kind,
                severity: d.severity,
                previous_value: d.previous_value.clone(),
                current_value: d.current_value.clone(),
                source_rule_id: d.source_rule_id,
                fingerprint: d.fingerprint.clone(),
                is_resolved: false,
                resolved_at: None,
                resolved_by: None,
                detected_at: d.detected_at,
            })
            .collect();
        self.tables.lock().await.drifts.extend(created.iter().cloned());
        Ok(created)
    }

    async fn open_fingerprints(
        &self,
        shop_id: Uuid,
        product_id: &str,
    ) -> Result<HashSet<String>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .drifts
            .iter()
            .filter(|d| d.shop_id == shop_id && d.product_id == product_id && !d.is_resolved)
            .map(|d| d.fingerprint.clone())
            .collect())
    }

    async fn list_unresolved(
        &self,
        shop_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ComplianceDrift>, DomainError> {
        let tables = self.tables.lock().await;
        let mut open: Vec<ComplianceDrift> = tables
            .drifts
            .iter()
            .rev()
            .filter(|d| d.shop_id == shop_id && !d.is_resolved)
            .cloned()
            .collect();
        // Stable, so insertion order (newest first) breaks ties.
        open.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        open.truncate(limit.max(0) as usize);
        Ok(open)
    }

    async fn summarize(
        &self,
        shop_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<DriftSummary, DomainError> {
        let tables = self.tables.lock().await;
        let in_window = tables
            .drifts
            .iter()
            .filter(|d| d.shop_id == shop_id && d.detected_at >= since);
        Ok(DriftSummary::from_drifts(0, in_window))
    }

    async fn find_drift(&self, drift_id: Uuid) -> Result<Option<ComplianceDrift>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables.drifts.iter().find(|d| d.id == drift_id).cloned())
    }

    async fn resolve_drift(
        &self,
        drift_id: Uuid,
        resolved_by: ResolvedBy,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<ComplianceDrift>, DomainError> {
        let mut tables = self.tables.lock().await;
        let Some(drift) = tables
            .drifts
            .iter_mut()
            .find(|d| d.id == drift_id && !d.is_resolved)
        else {
            return Ok(None);
        };
        drift.is_resolved = true;
        drift.resolved_at = Some(resolved_at);
        drift.resolved_by = Some(resolved_by);
        Ok(Some(drift.clone()))
    }

    async fn resolve_all_for_product(
        &self,
        shop_id: Uuid,
        product_id: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        let mut tables = self.tables.lock().await;
        let mut resolved = 0;
        for drift in tables
            .drifts
            .iter_mut()
            .filter(|d| d.shop_id == shop_id && d.product_id == product_id && !d.is_resolved)
        {
            drift.is_resolved = true;
            drift.resolved_at = Some(resolved_at);
            drift.resolved_by = Some(ResolvedBy::Auto);
            resolved += 1;
        }
        Ok(resolved)
    }
}

#[async_trait]
impl ScheduledAuditRepository for InMemoryStore {
    async fn find_schedule(&self, id: Uuid) -> Result<Option<ScheduledAudit>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables.schedules.iter().find(|s| s.id == id).cloned())
    }

    async fn find_schedule_by_shop(
        &self,
        shop_id: Uuid,
    ) -> Result<Option<ScheduledAudit>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables.schedules.iter().find(|s| s.shop_id == shop_id).cloned())
    }

    async fn find_due_schedules(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledAudit>, DomainError> {
        let tables = self.tables.lock().await;
        let mut due: Vec<ScheduledAudit> = tables
            .schedules
            .iter()
            .filter(|s| s.is_enabled && s.next_run_at.is_some_and(|at| at <= now))
            .cloned()
            .collect();
        due.sort_by_key(|s| s.next_run_at);
        Ok(due)
    }

    async fn upsert_schedule(
        &self,
        shop_id: Uuid,
        settings: &ScheduleSettings,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<ScheduledAudit, DomainError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.schedules.iter_mut().find(|s| s.shop_id == shop_id) {
            existing.frequency = settings.frequency;
            existing.hour = settings.hour;
            existing.day_of_week = settings.day_of_week;
            existing.day_of_month = settings.day_of_month;
            existing.is_enabled = settings.is_enabled;
            existing.notification_preferences = settings.notification_preferences.clone();
            existing.next_run_at = next_run_at;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let audit = ScheduledAudit {
            id: Uuid::new_v4(),
            shop_id,
            frequency: settings.frequency,
            hour: settings.hour,
            day_of_week: settings.day_of_week,
            day_of_month: settings.day_of_month,
            is_enabled: settings.is_enabled,
            notification_preferences: settings.notification_preferences.clone(),
            last_run_at: None,
            last_run_status: None,
            last_run_product_count: None,
            last_run_drift_count: None,
            next_run_at,
            created_at: now,
            updated_at: now,
        };
        tables.schedules.push(audit.clone());
        Ok(audit)
    }

    async fn record_run_success(&self, id: Uuid, run: &RunSuccess) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        if let Some(audit) = tables.schedules.iter_mut().find(|s| s.id == id) {
            audit.last_run_at = Some(run.ran_at);
            audit.last_run_status = Some(RunStatus::Success);
            audit.last_run_product_count = Some(run.product_count);
            audit.last_run_drift_count = Some(run.drift_count);
            audit.next_run_at = Some(run.next_run_at);
            audit.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn record_run_failure(&self, id: Uuid, ran_at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        if let Some(audit) = tables.schedules.iter_mut().find(|s| s.id == id) {
            audit.last_run_at = Some(ran_at);
            audit.last_run_status = Some(RunStatus::Failed);
            audit.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl BillingRepository for InMemoryStore {
    async fn find_or_create_billing(
        &self,
        shop_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ShopBillingState, DomainError> {
        let mut tables = self.tables.lock().await;
        if let Some(state) = tables.billing.get(&shop_id) {
            return Ok(state.clone());
        }
        // Same outcome as the shop_id foreign key in SQL.
        if !tables.shops.contains_key(&shop_id) {
            return Err(DomainError::NotFound("Shop not found".to_string()));
        }
        let state = ShopBillingState::new_free(shop_id, now);
        tables.billing.insert(shop_id, state.clone());
        Ok(state)
    }

    async fn reset_ai_credits(
        &self,
        shop_id: Uuid,
        now: DateTime<Utc>,
        next_reset_at: DateTime<Utc>,
    ) -> Result<Option<ShopBillingState>, DomainError> {
        let mut tables = self.tables.lock().await;
        match tables.billing.get_mut(&shop_id) {
            Some(state) if state.ai_credits_reset_at < now => {
                state.ai_credits_used = 0;
                state.ai_credits_reset_at = next_reset_at;
                Ok(Some(state.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn increment_ai_credits(
        &self,
        shop_id: Uuid,
        limit: i32,
    ) -> Result<Option<i32>, DomainError> {
        let mut tables = self.tables.lock().await;
        match tables.billing.get_mut(&shop_id) {
            Some(state) if state.ai_credits_used < limit => {
                state.ai_credits_used += 1;
                Ok(Some(state.ai_credits_used))
            }
            _ => Ok(None),
        }
    }

    async fn reset_audit_count(
        &self,
        shop_id: Uuid,
        now: DateTime<Utc>,
        next_reset_at: DateTime<Utc>,
    ) -> Result<Option<ShopBillingState>, DomainError> {
        let mut tables = self.tables.lock().await;
        match tables.billing.get_mut(&shop_id) {
            Some(state) if state.audits_reset_at < now => {
                state.audits_this_month = 0;
                state.audits_reset_at = next_reset_at;
                Ok(Some(state.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn increment_audit_count(
        &self,
        shop_id: Uuid,
        limit: Option<i32>,
    ) -> Result<Option<i32>, DomainError> {
        let mut tables = self.tables.lock().await;
        let Some(state) = tables.billing.get_mut(&shop_id) else {
            return Ok(None);
        };
        if limit.is_some_and(|l| state.audits_this_month >= l) {
            return Ok(None);
        }
        state.audits_this_month += 1;
        Ok(Some(state.audits_this_month))
    }
}
