//! Product snapshot entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::ProductSnapshot;

use super::EntityError;

/// Database row mapping for the product_snapshots table.
#[derive(Debug, Clone, FromRow)]
pub struct ProductSnapshotEntity {
    pub shop_id: Uuid,
    pub product_id: String,
    pub snapshot: serde_json::Value,
    pub scanned_at: DateTime<Utc>,
}

impl TryFrom<ProductSnapshotEntity> for ProductSnapshot {
    type Error = EntityError;

    fn try_from(entity: ProductSnapshotEntity) -> Result<Self, Self::Error> {
        Ok(serde_json::from_value(entity.snapshot)?)
    }
}
