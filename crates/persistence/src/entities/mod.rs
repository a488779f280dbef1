//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod catalog_rule;
pub mod compliance_drift;
pub mod product_snapshot;
pub mod scheduled_audit;
pub mod shop;
pub mod shop_billing;

pub use catalog_rule::CatalogRuleEntity;
pub use compliance_drift::ComplianceDriftEntity;
pub use product_snapshot::ProductSnapshotEntity;
pub use scheduled_audit::ScheduledAuditEntity;
pub use shop::ShopEntity;
pub use shop_billing::ShopBillingEntity;

use domain::models::rule_kind::RuleConfigError;
use thiserror::Error;

/// A stored row that does not map onto a domain value.
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("invalid {column} value '{value}'")]
    InvalidColumn { column: &'static str, value: String },

    #[error(transparent)]
    Rule(#[from] RuleConfigError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
