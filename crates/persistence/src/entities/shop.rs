//! Shop entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::Shop;

/// Database row mapping for the shops table.
#[derive(Debug, Clone, FromRow)]
pub struct ShopEntity {
    pub id: Uuid,
    pub domain: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ShopEntity> for Shop {
    fn from(entity: ShopEntity) -> Self {
        Self {
            id: entity.id,
            domain: entity.domain,
            email: entity.email,
            created_at: entity.created_at,
        }
    }
}
