//! Domain models for Catalog Guard.

pub mod billing;
pub mod catalog_rule;
pub mod drift;
pub mod product;
pub mod rule_kind;
pub mod scheduled_audit;
pub mod severity;
pub mod shop;

pub use billing::{BillingConfig, GateDecision, Plan, PlanLimits, ShopBillingState};
pub use catalog_rule::{CatalogRule, NewCatalogRule, ProductFilter, RuleTemplate};
pub use drift::{ComplianceDrift, DriftKind, NewDrift, ResolvedBy};
pub use product::{ProductImage, ProductSnapshot};
pub use rule_kind::{RuleCondition, RuleKind};
pub use scheduled_audit::{AuditFrequency, ScheduledAudit};
pub use severity::Severity;
pub use shop::Shop;
