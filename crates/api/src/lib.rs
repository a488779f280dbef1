//! HTTP surface of Catalog Guard: routes, middleware, collaborator clients
//! and background jobs.

pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod services;
