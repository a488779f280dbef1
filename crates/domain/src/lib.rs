//! Domain layer for the Catalog Guard backend.
//!
//! This crate contains:
//! - Domain models (product snapshots, catalog rules, drifts, schedules, billing)
//! - The rule catalog
//! - Ports: repository and collaborator traits, with in-memory adapters
//! - Core services: drift detection, audit scheduling, billing gate, rule store

pub mod error;
pub mod models;
pub mod ports;
pub mod services;

pub use error::DomainError;
