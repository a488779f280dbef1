//! Compliance drift entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::drift::{ComplianceDrift, DriftKind, ResolvedBy};
use domain::models::Severity;

use super::EntityError;

/// Database row mapping for the compliance_drifts table.
#[derive(Debug, Clone, FromRow)]
pub struct ComplianceDriftEntity {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub product_id: String,
    pub product_title: String,
    pub drift_kind: String,
    pub severity: String,
    pub previous_value: Option<serde_json::Value>,
    pub current_value: Option<serde_json::Value>,
    pub source_rule_id: Option<Uuid>,
    pub fingerprint: String,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub detected_at: DateTime<Utc>,
}

impl TryFrom<ComplianceDriftEntity> for ComplianceDrift {
    type Error = EntityError;

    fn try_from(entity: ComplianceDriftEntity) -> Result<Self, Self::Error> {
        let drift_kind = DriftKind::parse(&entity.drift_kind).ok_or_else(|| {
            EntityError::InvalidColumn {
                column: "drift_kind",
                value: entity.drift_kind.clone(),
            }
        })?;
        let severity = Severity::parse(&entity.severity).ok_or_else(|| EntityError::InvalidColumn {
            column: "severity",
            value: entity.severity.clone(),
        })?;
        let resolved_by = match entity.resolved_by.as_deref() {
            None => None,
            Some(value) => Some(ResolvedBy::parse(value).ok_or_else(|| {
                EntityError::InvalidColumn {
                    column: "resolved_by",
                    value: value.to_string(),
                }
            })?),
        };

        Ok(Self {
            id: entity.id,
            shop_id: entity.shop_id,
            product_id: entity.product_id,
            product_title: entity.product_title,
            drift_kind,
            severity,
            previous_value: entity.previous_value,
            current_value: entity.current_value,
            source_rule_id: entity.source_rule_id,
            fingerprint: entity.fingerprint,
            is_resolved: entity.is_resolved,
            resolved_at: entity.resolved_at,
            resolved_by,
            detected_at: entity.detected_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_drift_entity() -> ComplianceDriftEntity {
        ComplianceDriftEntity {
            id: Uuid::new_v4(),
            shop_id: Uuid::new_v4(),
            product_id: "p-1".to_string(),
            product_title: "Linen shirt".to_string(),
            drift_kind: "images_removed".to_string(),
            severity: "high".to_string(),
            previous_value: Some(json!(5)),
            current_value: Some(json!(0)),
            source_rule_id: None,
            fingerprint: "a".repeat(64),
            is_resolved: false,
            resolved_at: None,
            resolved_by: None,
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn test_drift_entity_to_domain() {
        let entity = create_test_drift_entity();
        let drift = ComplianceDrift::try_from(entity.clone()).unwrap();
        assert_eq!(drift.id, entity.id);
        assert_eq!(drift.drift_kind, DriftKind::ImagesRemoved);
        assert_eq!(drift.severity, Severity::High);
        assert_eq!(drift.previous_value, Some(json!(5)));
        assert!(drift.resolved_by.is_none());
        assert_eq!(drift.fingerprint.len(), 64);
    }

    #[test]
    fn test_resolved_drift_entity_to_domain() {
        let mut entity = create_test_drift_entity();
        entity.is_resolved = true;
        entity.resolved_at = Some(Utc::now());
        entity.resolved_by = Some("auto".to_string());
        let drift = ComplianceDrift::try_from(entity).unwrap();
        assert_eq!(drift.resolved_by, Some(ResolvedBy::Auto));
    }

    #[test]
    fn test_drift_entity_with_unknown_kind() {
        let mut entity = create_test_drift_entity();
        entity.drift_kind = "price_changed".to_string();
        assert!(matches!(
            ComplianceDrift::try_from(entity),
            Err(EntityError::InvalidColumn { column: "drift_kind", .. })
        ));
    }
}
