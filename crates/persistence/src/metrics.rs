//! Database metrics collection.
//!
//! Provides functions for recording database-related metrics.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record database query duration.
///
/// Call this function after executing a query to record its duration.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Pool occupancy at the time of sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub idle: usize,
    pub active: usize,
}

impl PoolStats {
    fn from_counts(total: usize, idle: usize) -> Self {
        Self {
            total,
            idle,
            active: total.saturating_sub(idle),
        }
    }

    /// True when every connection the pool may open is checked out.
    pub fn is_saturated(&self, max_connections: u32) -> bool {
        max_connections > 0 && self.active >= max_connections as usize
    }
}

/// Samples the pool and publishes the connection gauges.
pub fn record_pool_metrics(pool: &PgPool) -> PoolStats {
    let stats = PoolStats::from_counts(pool.size() as usize, pool.num_idle());

    gauge!("database_connections_active").set(stats.active as f64);
    gauge!("database_connections_idle").set(stats.idle as f64);
    gauge!("database_connections_total").set(stats.total as f64);
    stats
}

/// A helper to time database operations and record metrics.
///
/// Usage:
/// ```ignore
/// let timer = QueryTimer::new("find_catalog_rule");
/// let result = sqlx::query_as::<_, CatalogRuleEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: String,
    start: Instant,
}

impl QueryTimer {
    /// Create a new timer for the given query name.
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(&self.query_name, duration);
    }
}
