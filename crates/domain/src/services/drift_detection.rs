//! Drift detection: built-in regression checks plus merchant rules.
//!
//! Built-in checks compare the current snapshot against the previous one and
//! run in a fixed order. Custom rules are stateless and see only the current
//! snapshot. Everything found in one pass is written as one batch.

use std::sync::Arc;

use chrono::Duration;
use serde_json::{json, Value};
use shared::time::Clock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::catalog_rule::CatalogRule;
use crate::models::drift::{
    drift_fingerprint, ComplianceDrift, DetectionOutcome, DriftKind, DriftSummary, NewDrift,
    ResolvedBy, ScanResult,
};
use crate::models::product::{is_blank, text_len, ProductSnapshot};
use crate::models::severity::Severity;
use crate::ports::{
    CatalogClient, CatalogRuleRepository, DriftRepository, ShopRepository, SnapshotRepository,
};

pub const SEO_TITLE_MAX: usize = 60;
pub const SEO_TITLE_MIN: usize = 30;
pub const LOW_IMAGE_COUNT: usize = 3;

pub const DEFAULT_SUMMARY_DAYS: i64 = 30;
pub const MAX_SUMMARY_DAYS: i64 = 365;

/// A single problem found by a check, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftFinding {
    pub kind: DriftKind,
    pub severity: Severity,
    pub previous_value: Option<Value>,
    pub current_value: Option<Value>,
    pub source_rule_id: Option<Uuid>,
}

impl DriftFinding {
    fn builtin(
        kind: DriftKind,
        severity: Severity,
        previous: Option<Value>,
        current: Value,
    ) -> Self {
        Self {
            kind,
            severity,
            previous_value: previous,
            current_value: Some(current),
            source_rule_id: None,
        }
    }
}

fn check_seo_title(
    current: &ProductSnapshot,
    previous: Option<&ProductSnapshot>,
) -> Option<DriftFinding> {
    let prev_title = previous.map(|p| p.seo_title.as_str()).filter(|t| !is_blank(t));
    let len = text_len(&current.seo_title);

    if let Some(prev) = prev_title {
        if is_blank(&current.seo_title) {
            return Some(DriftFinding::builtin(
                DriftKind::SeoTitleRemoved,
                Severity::High,
                Some(json!(prev)),
                json!(current.seo_title),
            ));
        }
    }

    let current_value = json!({ "seoTitle": current.seo_title, "length": len });
    let previous_value = prev_title.map(|t| json!(t));
    if len > SEO_TITLE_MAX {
        Some(DriftFinding::builtin(
            DriftKind::SeoTitleTooLong,
            Severity::Medium,
            previous_value,
            current_value,
        ))
    } else if len < SEO_TITLE_MIN {
        Some(DriftFinding::builtin(
            DriftKind::SeoTitleTooShort,
            Severity::Low,
            previous_value,
            current_value,
        ))
    } else {
        None
    }
}

fn check_description(
    current: &ProductSnapshot,
    previous: Option<&ProductSnapshot>,
) -> Option<DriftFinding> {
    let previous = previous.filter(|p| !is_blank(&p.description))?;
    let prev_len = text_len(&previous.description);
    let cur_len = text_len(&current.description);

    if cur_len == 0 {
        return Some(DriftFinding::builtin(
            DriftKind::DescriptionRemoved,
            Severity::High,
            Some(json!({ "length": prev_len })),
            json!({ "length": 0 }),
        ));
    }

    // Strictly less than half: cur < prev / 2 without floating point.
    (cur_len * 2 < prev_len).then(|| {
        DriftFinding::builtin(
            DriftKind::DescriptionShortened,
            Severity::Medium,
            Some(json!({ "length": prev_len })),
            json!({ "length": cur_len }),
        )
    })
}

fn check_images(
    current: &ProductSnapshot,
    previous: Option<&ProductSnapshot>,
) -> Option<DriftFinding> {
    let prev_count = previous.map(|p| p.image_count()).unwrap_or(0);
    let cur_count = current.image_count();

    if prev_count > 0 && cur_count == 0 {
        Some(DriftFinding::builtin(
            DriftKind::ImagesRemoved,
            Severity::High,
            Some(json!({ "count": prev_count })),
            json!({ "count": 0 }),
        ))
    } else if cur_count > 0 && cur_count < LOW_IMAGE_COUNT {
        Some(DriftFinding::builtin(
            DriftKind::ImagesLowCount,
            Severity::Medium,
            previous.map(|p| json!({ "count": p.image_count() })),
            json!({ "count": cur_count, "minimum": LOW_IMAGE_COUNT }),
        ))
    } else {
        None
    }
}

fn check_alt_text(current: &ProductSnapshot) -> Option<DriftFinding> {
    let missing = current.images_missing_alt();
    (missing > 0).then(|| {
        DriftFinding::builtin(
            DriftKind::AltTextMissing,
            Severity::Medium,
            None,
            json!({ "missing": missing, "total": current.image_count() }),
        )
    })
}

fn check_removed_list(
    kind: DriftKind,
    current: &[String],
    previous: Option<&[String]>,
) -> Option<DriftFinding> {
    let previous = previous.filter(|p| !p.is_empty())?;
    current.is_empty().then(|| {
        DriftFinding::builtin(kind, Severity::Medium, Some(json!(previous)), json!([]))
    })
}

/// Runs the built-in checks in their fixed order.
pub fn evaluate_builtin_checks(
    current: &ProductSnapshot,
    previous: Option<&ProductSnapshot>,
) -> Vec<DriftFinding> {
    [
        check_seo_title(current, previous),
        check_description(current, previous),
        check_images(current, previous),
        check_alt_text(current),
        check_removed_list(
            DriftKind::TagsRemoved,
            &current.tags,
            previous.map(|p| p.tags.as_slice()),
        ),
        check_removed_list(
            DriftKind::CollectionRemoved,
            &current.collections,
            previous.map(|p| p.collections.as_slice()),
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Evaluates enabled rules that apply to the product.
pub fn evaluate_custom_rules(
    rules: &[CatalogRule],
    product_id: &str,
    current: &ProductSnapshot,
) -> Vec<DriftFinding> {
    rules
        .iter()
        .filter(|rule| rule.is_enabled && rule.applies_to(product_id, current))
        .filter_map(|rule| {
            let violation = rule.condition.evaluate(current)?;
            Some(DriftFinding {
                kind: DriftKind::CustomRuleViolated,
                severity: rule.severity,
                previous_value: None,
                current_value: Some(json!({
                    "ruleId": rule.id,
                    "ruleName": rule.name,
                    "ruleKind": rule.kind(),
                    "message": violation.message,
                    "actual": violation.actual,
                })),
                source_rule_id: Some(rule.id),
            })
        })
        .collect()
}

/// Drift detection and the drift read/resolve operations.
#[derive(Clone)]
pub struct DriftDetector {
    shops: Arc<dyn ShopRepository>,
    rules: Arc<dyn CatalogRuleRepository>,
    drifts: Arc<dyn DriftRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
    catalog: Arc<dyn CatalogClient>,
    clock: Arc<dyn Clock>,
    dedup_open_drifts: bool,
}

impl DriftDetector {
    pub fn new(
        shops: Arc<dyn ShopRepository>,
        rules: Arc<dyn CatalogRuleRepository>,
        drifts: Arc<dyn DriftRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        catalog: Arc<dyn CatalogClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shops,
            rules,
            drifts,
            snapshots,
            catalog,
            clock,
            dedup_open_drifts: false,
        }
    }

    /// Drop findings that match a drift still open for the same product.
    pub fn with_dedup(mut self, enabled: bool) -> Self {
        self.dedup_open_drifts = enabled;
        self
    }

    /// Evaluates all checks and persists the resulting drifts in one batch.
    pub async fn detect_drifts(
        &self,
        shop_id: Uuid,
        product_id: &str,
        product_title: &str,
        current: &ProductSnapshot,
        previous: Option<&ProductSnapshot>,
    ) -> Result<DetectionOutcome, DomainError> {
        let rules = self.rules.list_enabled_rules(shop_id).await?;

        let mut findings = evaluate_builtin_checks(current, previous);
        findings.extend(evaluate_custom_rules(&rules, product_id, current));

        let detected_at = self.clock.now();
        let mut new_drifts: Vec<NewDrift> = findings
            .into_iter()
            .map(|f| NewDrift {
                shop_id,
                product_id: product_id.to_string(),
                product_title: product_title.to_string(),
                fingerprint: drift_fingerprint(
                    shop_id,
                    product_id,
                    f.kind,
                    f.severity,
                    f.source_rule_id,
                ),
                drift_kind: f.kind,
                severity: f.severity,
                previous_value: f.previous_value,
                current_value: f.current_value,
                source_rule_id: f.source_rule_id,
                detected_at,
            })
            .collect();

        let mut suppressed = 0;
        if self.dedup_open_drifts && !new_drifts.is_empty() {
            let open = self.drifts.open_fingerprints(shop_id, product_id).await?;
            let before = new_drifts.len();
            new_drifts.retain(|d| !open.contains(&d.fingerprint));
            suppressed = before - new_drifts.len();
        }

        let drifts = if new_drifts.is_empty() {
            Vec::new()
        } else {
            self.drifts.insert_drifts(&new_drifts).await?
        };

        if !drifts.is_empty() {
            info!(
                shop_id = %shop_id,
                product_id = %product_id,
                drift_count = drifts.len(),
                suppressed,
                "Compliance drifts detected"
            );
        } else {
            debug!(shop_id = %shop_id, product_id = %product_id, suppressed, "No new drifts");
        }

        Ok(DetectionOutcome {
            detected: !drifts.is_empty(),
            drifts,
            suppressed,
        })
    }

    /// Fetches (unless supplied), diffs against the stored snapshot, stores the
    /// new snapshot and auto-resolves open drifts when the product scans clean.
    pub async fn scan_product(
        &self,
        shop_id: Uuid,
        product_id: &str,
        snapshot: Option<ProductSnapshot>,
    ) -> Result<ScanResult, DomainError> {
        let shop = self
            .shops
            .find_shop(shop_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Shop not found".to_string()))?;

        let current = match snapshot {
            Some(snapshot) => snapshot,
            None => self.catalog.fetch_product_snapshot(&shop, product_id).await?,
        };
        let previous = self.snapshots.find_snapshot(shop_id, product_id).await?;

        let outcome = self
            .detect_drifts(shop_id, product_id, &current.title, &current, previous.as_ref())
            .await?;

        let now = self.clock.now();
        self.snapshots
            .save_snapshot(shop_id, product_id, &current, now)
            .await?;

        let auto_resolved = if outcome.is_clean() {
            self.resolve_all_for_product(shop_id, product_id).await?
        } else {
            0
        };

        Ok(ScanResult {
            detected: outcome.detected,
            drifts: outcome.drifts,
            auto_resolved,
        })
    }

    /// Unresolved drifts, newest first. The limit is clamped to `1..=200`.
    pub async fn unresolved_drifts(
        &self,
        shop_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<ComplianceDrift>, DomainError> {
        let limit = shared::pagination::list_limit(limit);
        self.drifts.list_unresolved(shop_id, limit).await
    }

    pub async fn drift_summary(
        &self,
        shop_id: Uuid,
        window_days: Option<i64>,
    ) -> Result<DriftSummary, DomainError> {
        let days =
            shared::pagination::clamp_limit(window_days, DEFAULT_SUMMARY_DAYS, MAX_SUMMARY_DAYS);
        let since = self.clock.now() - Duration::days(days);
        let mut summary = self.drifts.summarize(shop_id, since).await?;
        summary.window_days = days;
        Ok(summary)
    }

    /// Resolves one drift. An already-resolved drift is returned unchanged.
    pub async fn resolve_drift(
        &self,
        drift_id: Uuid,
        resolved_by: ResolvedBy,
    ) -> Result<ComplianceDrift, DomainError> {
        let now = self.clock.now();
        if let Some(drift) = self.drifts.resolve_drift(drift_id, resolved_by, now).await? {
            info!(drift_id = %drift_id, resolved_by = resolved_by.as_str(), "Drift resolved");
            return Ok(drift);
        }
        self.drifts
            .find_drift(drift_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Drift not found".to_string()))
    }

    pub async fn find_drift(&self, drift_id: Uuid) -> Result<ComplianceDrift, DomainError> {
        self.drifts
            .find_drift(drift_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Drift not found".to_string()))
    }

    /// Resolves every open drift for the product as `auto`.
    pub async fn resolve_all_for_product(
        &self,
        shop_id: Uuid,
        product_id: &str,
    ) -> Result<u64, DomainError> {
        let resolved = self
            .drifts
            .resolve_all_for_product(shop_id, product_id, self.clock.now())
            .await?;
        if resolved > 0 {
            info!(
                shop_id = %shop_id,
                product_id = %product_id,
                resolved,
                "Open drifts auto-resolved"
            );
        }
        Ok(resolved)
    }
}
