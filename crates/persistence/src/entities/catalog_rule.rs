//! Catalog rule entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::catalog_rule::ProductFilter;
use domain::models::rule_kind::RuleCondition;
use domain::models::{CatalogRule, Severity};

use super::EntityError;

/// Database row mapping for the catalog_rules table.
#[derive(Debug, Clone, FromRow)]
pub struct CatalogRuleEntity {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub rule_kind: String,
    pub configuration: serde_json::Value,
    pub severity: String,
    pub is_enabled: bool,
    pub applies_to_all: bool,
    pub product_filter: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CatalogRuleEntity> for CatalogRule {
    type Error = EntityError;

    fn try_from(entity: CatalogRuleEntity) -> Result<Self, Self::Error> {
        let condition = RuleCondition::parse_str(&entity.rule_kind, &entity.configuration)?;
        let severity = Severity::parse(&entity.severity).ok_or_else(|| EntityError::InvalidColumn {
            column: "severity",
            value: entity.severity.clone(),
        })?;
        let product_filter = entity
            .product_filter
            .filter(|v| !v.is_null())
            .map(serde_json::from_value::<ProductFilter>)
            .transpose()?;

        Ok(Self {
            id: entity.id,
            shop_id: entity.shop_id,
            name: entity.name,
            description: entity.description,
            condition,
            severity,
            is_enabled: entity.is_enabled,
            applies_to_all: entity.applies_to_all,
            product_filter,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_rule_entity() -> CatalogRuleEntity {
        CatalogRuleEntity {
            id: Uuid::new_v4(),
            shop_id: Uuid::new_v4(),
            name: "Minimum images".to_string(),
            description: None,
            rule_kind: "min_images".to_string(),
            configuration: json!({"min": 3}),
            severity: "medium".to_string(),
            is_enabled: true,
            applies_to_all: false,
            product_filter: Some(json!({"tags": ["featured"]})),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_rule_entity_to_domain() {
        let entity = create_test_rule_entity();
        let rule = CatalogRule::try_from(entity.clone()).unwrap();

        assert_eq!(rule.id, entity.id);
        assert_eq!(rule.condition, RuleCondition::MinImages { min: 3 });
        assert_eq!(rule.severity, Severity::Medium);
        let filter = rule.product_filter.unwrap();
        assert_eq!(filter.tags, vec!["featured".to_string()]);
        assert!(filter.product_ids.is_empty());
    }

    #[test]
    fn test_rule_entity_with_null_filter() {
        let mut entity = create_test_rule_entity();
        entity.product_filter = Some(serde_json::Value::Null);
        let rule = CatalogRule::try_from(entity).unwrap();
        assert!(rule.product_filter.is_none());
    }

    #[test]
    fn test_rule_entity_with_unknown_kind() {
        let mut entity = create_test_rule_entity();
        entity.rule_kind = "max_variants".to_string();
        assert!(matches!(
            CatalogRule::try_from(entity),
            Err(EntityError::Rule(_))
        ));
    }

    #[test]
    fn test_rule_entity_with_bad_severity() {
        let mut entity = create_test_rule_entity();
        entity.severity = "critical".to_string();
        assert!(matches!(
            CatalogRule::try_from(entity),
            Err(EntityError::InvalidColumn { column: "severity", .. })
        ));
    }
}
