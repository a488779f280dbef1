//! Domain services for Catalog Guard.
//!
//! Services contain business logic that operates on domain models through
//! the repository and collaborator ports.

pub mod audit_scheduler;
pub mod billing_gate;
pub mod drift_detection;
pub mod rule_store;

pub use audit_scheduler::{initial_run_at, AuditScheduler, NotificationDispatch};
pub use billing_gate::{BillingGate, ResolvedPlan};
pub use drift_detection::{
    evaluate_builtin_checks, evaluate_custom_rules, DriftDetector, DriftFinding,
};
pub use rule_store::RuleStore;
