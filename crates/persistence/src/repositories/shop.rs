//! Shop repository for database operations.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::error::DomainError;
use domain::models::Shop;
use domain::ports::ShopRepository;

use crate::entities::ShopEntity;
use crate::metrics::QueryTimer;

/// Repository for shop lookups.
#[derive(Clone)]
pub struct PgShopRepository {
    pool: PgPool,
}

impl PgShopRepository {
    /// Creates a new PgShopRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShopRepository for PgShopRepository {
    async fn find_shop(&self, shop_id: Uuid) -> Result<Option<Shop>, DomainError> {
        let timer = QueryTimer::new("find_shop_by_id");
        let result = sqlx::query_as::<_, ShopEntity>(
            r#"
            SELECT id, domain, email, created_at
            FROM shops
            WHERE id = $1
            "#,
        )
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result?.map(Shop::from))
    }
}
