//! Compliance drift domain model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::severity::Severity;

/// Category of a detected regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    SeoTitleRemoved,
    SeoTitleTooLong,
    SeoTitleTooShort,
    DescriptionRemoved,
    DescriptionShortened,
    ImagesRemoved,
    ImagesLowCount,
    AltTextMissing,
    TagsRemoved,
    CollectionRemoved,
    CustomRuleViolated,
}

impl DriftKind {
    pub const ALL: [DriftKind; 11] = [
        DriftKind::SeoTitleRemoved,
        DriftKind::SeoTitleTooLong,
        DriftKind::SeoTitleTooShort,
        DriftKind::DescriptionRemoved,
        DriftKind::DescriptionShortened,
        DriftKind::ImagesRemoved,
        DriftKind::ImagesLowCount,
        DriftKind::AltTextMissing,
        DriftKind::TagsRemoved,
        DriftKind::CollectionRemoved,
        DriftKind::CustomRuleViolated,
    ];

    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftKind::SeoTitleRemoved => "seo_title_removed",
            DriftKind::SeoTitleTooLong => "seo_title_too_long",
            DriftKind::SeoTitleTooShort => "seo_title_too_short",
            DriftKind::DescriptionRemoved => "description_removed",
            DriftKind::DescriptionShortened => "description_shortened",
            DriftKind::ImagesRemoved => "images_removed",
            DriftKind::ImagesLowCount => "images_low_count",
            DriftKind::AltTextMissing => "alt_text_missing",
            DriftKind::TagsRemoved => "tags_removed",
            DriftKind::CollectionRemoved => "collection_removed",
            DriftKind::CustomRuleViolated => "custom_rule_violated",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for DriftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who or what closed a drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedBy {
    User,
    Auto,
    Ignored,
}

impl ResolvedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedBy::User => "user",
            ResolvedBy::Auto => "auto",
            ResolvedBy::Ignored => "ignored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(ResolvedBy::User),
            "auto" => Some(ResolvedBy::Auto),
            "ignored" => Some(ResolvedBy::Ignored),
            _ => None,
        }
    }
}

/// A persisted drift record.
///
/// Only the resolution fields ever change after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceDrift {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub product_id: String,
    pub product_title: String,
    pub drift_kind: DriftKind,
    pub severity: Severity,
    pub previous_value: Option<Value>,
    pub current_value: Option<Value>,
    pub source_rule_id: Option<Uuid>,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub fingerprint: String,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<ResolvedBy>,
    pub detected_at: DateTime<Utc>,
}

/// Input for inserting a drift record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDrift {
    pub shop_id: Uuid,
    pub product_id: String,
    pub product_title: String,
    pub drift_kind: DriftKind,
    pub severity: Severity,
    pub previous_value: Option<Value>,
    pub current_value: Option<Value>,
    pub source_rule_id: Option<Uuid>,
    pub fingerprint: String,
    pub detected_at: DateTime<Utc>,
}

/// Identity of a drift for dedup purposes: shop, product, kind, severity and
/// (for custom rules) the source rule.
pub fn drift_fingerprint(
    shop_id: Uuid,
    product_id: &str,
    kind: DriftKind,
    severity: Severity,
    source_rule_id: Option<Uuid>,
) -> String {
    let shop = shop_id.to_string();
    let rule = source_rule_id.map(|id| id.to_string()).unwrap_or_default();
    shared::crypto::fingerprint(&[&shop, kind.as_str(), severity.as_str(), &rule, product_id])
}

/// Result of a detection pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionOutcome {
    pub detected: bool,
    pub drifts: Vec<ComplianceDrift>,
    /// Findings dropped because a matching drift is still open.
    pub suppressed: usize,
}

impl DetectionOutcome {
    /// No finding at all, persisted or suppressed.
    pub fn is_clean(&self) -> bool {
        self.drifts.is_empty() && self.suppressed == 0
    }
}

/// Result of a product scan (detection plus bookkeeping).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub detected: bool,
    pub drifts: Vec<ComplianceDrift>,
    /// Open drifts closed because the product scanned clean.
    pub auto_resolved: u64,
}

/// Counts of unresolved drifts by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityCounts {
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity, n: i64) {
        match severity {
            Severity::High => self.high += n,
            Severity::Medium => self.medium += n,
            Severity::Low => self.low += n,
        }
    }
}

/// Drift statistics over a time window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftSummary {
    pub window_days: i64,
    pub total: i64,
    pub unresolved: i64,
    pub resolved: i64,
    pub by_severity: SeverityCounts,
    pub by_kind: BTreeMap<DriftKind, i64>,
    pub products_affected: i64,
}

impl DriftSummary {
    /// Aggregates drifts already filtered to the window.
    pub fn from_drifts<'a>(
        window_days: i64,
        drifts: impl IntoIterator<Item = &'a ComplianceDrift>,
    ) -> Self {
        let mut summary = DriftSummary {
            window_days,
            ..Default::default()
        };
        let mut products = std::collections::BTreeSet::new();
        for drift in drifts {
            summary.total += 1;
            if drift.is_resolved {
                summary.resolved += 1;
                continue;
            }
            summary.unresolved += 1;
            summary.by_severity.add(drift.severity, 1);
            *summary.by_kind.entry(drift.drift_kind).or_insert(0) += 1;
            products.insert(drift.product_id.as_str());
        }
        summary.products_affected = products.len() as i64;
        summary
    }
}

fn default_resolved_by() -> ResolvedBy {
    ResolvedBy::User
}

/// Request payload for resolving one drift.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDriftRequest {
    #[serde(default = "default_resolved_by")]
    pub resolved_by: ResolvedBy,
}

/// Query parameters for listing unresolved drifts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDriftsQuery {
    pub limit: Option<i64>,
}

/// Query parameters for the drift summary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftSummaryQuery {
    pub days: Option<i64>,
}

/// Response for listing drifts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDriftsResponse {
    pub drifts: Vec<ComplianceDrift>,
    pub total: usize,
}

/// Response for bulk resolution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAllResponse {
    pub resolved: u64,
}
