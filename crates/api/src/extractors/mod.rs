//! Custom Axum extractors.

pub mod optional_json;

pub use optional_json::OptionalJson;
