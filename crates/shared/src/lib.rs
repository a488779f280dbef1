//! Shared utilities and common types for the Catalog Guard backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Hashing utilities (drift fingerprints)
//! - Clock abstraction and calendar arithmetic
//! - Common validation logic
//! - Query limit clamping

pub mod crypto;
pub mod pagination;
pub mod time;
pub mod validation;
