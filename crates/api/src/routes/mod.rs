//! HTTP route handlers.

pub mod ai;
pub mod billing;
pub mod cron;
pub mod drifts;
pub mod health;
pub mod rules;
pub mod scans;
pub mod schedules;
