//! Samples the catalog store's connection pool for the Prometheus gauges.

use sqlx::PgPool;
use tracing::warn;

use super::scheduler::{Job, JobFrequency};

pub struct PoolMetricsJob {
    pool: PgPool,
    max_connections: u32,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool, max_connections: u32) -> Self {
        Self {
            pool,
            max_connections,
        }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(10)
    }

    async fn execute(&self) -> Result<(), String> {
        let stats = persistence::metrics::record_pool_metrics(&self.pool);
        if stats.is_saturated(self.max_connections) {
            warn!(
                active = stats.active,
                max = self.max_connections,
                "Database pool saturated, scans and audits may queue"
            );
        }
        Ok(())
    }
}
