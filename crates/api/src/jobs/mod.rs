//! Background job scheduler and job implementations.

mod pool_metrics;
mod scheduled_audits;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use scheduled_audits::{run_scheduled_audit_pass, ScheduledAuditJob, ScheduledAuditPass};
pub use scheduler::{Job, JobFrequency, JobScheduler};
