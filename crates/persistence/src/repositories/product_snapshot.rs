//! Product snapshot repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use domain::error::DomainError;
use domain::models::ProductSnapshot;
use domain::ports::SnapshotRepository;

use super::decode_one;
use crate::entities::ProductSnapshotEntity;
use crate::metrics::QueryTimer;

/// Repository for the last scanned snapshot of each product.
#[derive(Clone)]
pub struct PgSnapshotRepository {
    pool: PgPool,
}

impl PgSnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    async fn find_snapshot(
        &self,
        shop_id: Uuid,
        product_id: &str,
    ) -> Result<Option<ProductSnapshot>, DomainError> {
        let timer = QueryTimer::new("find_product_snapshot");
        let result = sqlx::query_as::<_, ProductSnapshotEntity>(
            r#"
            SELECT shop_id, product_id, snapshot, scanned_at
            FROM product_snapshots
            WHERE shop_id = $1 AND product_id = $2
            "#,
        )
        .bind(shop_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result?.map(decode_one).transpose()
    }

    async fn save_snapshot(
        &self,
        shop_id: Uuid,
        product_id: &str,
        snapshot: &ProductSnapshot,
        scanned_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let timer = QueryTimer::new("save_product_snapshot");
        let result = sqlx::query(
            r#"
            INSERT INTO product_snapshots (shop_id, product_id, snapshot, scanned_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (shop_id, product_id)
            DO UPDATE SET snapshot = EXCLUDED.snapshot, scanned_at = EXCLUDED.scanned_at
            "#,
        )
        .bind(shop_id)
        .bind(product_id)
        .bind(Json(snapshot))
        .bind(scanned_at)
        .execute(&self.pool)
        .await;
        timer.record();

        result?;
        Ok(())
    }

    async fn count_snapshots(&self, shop_id: Uuid) -> Result<i64, DomainError> {
        let timer = QueryTimer::new("count_product_snapshots");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM product_snapshots WHERE shop_id = $1",
        )
        .bind(shop_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result?)
    }
}
