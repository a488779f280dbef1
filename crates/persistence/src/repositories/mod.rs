//! Repository implementations for database operations.
//!
//! Each repository implements the matching port from `domain::ports`.

pub mod catalog_rule;
pub mod compliance_drift;
pub mod product_snapshot;
pub mod scheduled_audit;
pub mod shop;
pub mod shop_billing;

pub use catalog_rule::PgCatalogRuleRepository;
pub use compliance_drift::PgDriftRepository;
pub use product_snapshot::PgSnapshotRepository;
pub use scheduled_audit::PgScheduledAuditRepository;
pub use shop::PgShopRepository;
pub use shop_billing::PgBillingRepository;

use domain::error::DomainError;

use crate::entities::EntityError;

/// Converts a row that must be readable. A bad row surfaces as a decode error.
pub(crate) fn decode_one<E, T>(entity: E) -> Result<T, DomainError>
where
    T: TryFrom<E, Error = EntityError>,
{
    T::try_from(entity).map_err(|e| DomainError::Database(sqlx::Error::Decode(Box::new(e))))
}

/// Converts a list of rows, skipping and logging any that do not decode.
pub(crate) fn decode_all<E, T>(table: &'static str, entities: Vec<E>) -> Vec<T>
where
    T: TryFrom<E, Error = EntityError>,
{
    entities
        .into_iter()
        .filter_map(|entity| match T::try_from(entity) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(table, error = %e, "Skipping unreadable row");
                None
            }
        })
        .collect()
}

/// Converts a foreign-key violation into `NotFound` for the referenced row.
pub(crate) fn missing_parent(err: sqlx::Error, entity: &str) -> DomainError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
            DomainError::NotFound(format!("{} not found", entity))
        }
        _ => DomainError::Database(err),
    }
}
