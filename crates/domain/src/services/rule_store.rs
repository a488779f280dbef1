//! Per-shop CRUD over catalog rules, plus template application.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::catalog_rule::{
    CatalogRule, CatalogRulePatch, CreateRuleRequest, NewCatalogRule, RuleTemplate,
    UpdateRuleRequest,
};
use crate::models::rule_kind::RuleCondition;
use crate::ports::CatalogRuleRepository;

#[derive(Clone)]
pub struct RuleStore {
    rules: Arc<dyn CatalogRuleRepository>,
}

impl RuleStore {
    pub fn new(rules: Arc<dyn CatalogRuleRepository>) -> Self {
        Self { rules }
    }

    pub async fn list_rules(&self, shop_id: Uuid) -> Result<Vec<CatalogRule>, DomainError> {
        self.rules.list_rules(shop_id).await
    }

    pub async fn enabled_rules(&self, shop_id: Uuid) -> Result<Vec<CatalogRule>, DomainError> {
        self.rules.list_enabled_rules(shop_id).await
    }

    pub async fn get_rule(&self, shop_id: Uuid, rule_id: Uuid) -> Result<CatalogRule, DomainError> {
        self.rules
            .find_rule(shop_id, rule_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Rule not found".to_string()))
    }

    /// Creates a rule. Name and severity default to the catalog entry for its kind.
    pub async fn create_rule(
        &self,
        shop_id: Uuid,
        request: CreateRuleRequest,
    ) -> Result<CatalogRule, DomainError> {
        let condition = RuleCondition::parse(request.rule_kind, &request.configuration)?;
        let mut new_rule = NewCatalogRule::from_catalog(shop_id, condition, request.severity);
        if let Some(name) = request.name {
            new_rule.name = name;
        }
        if request.description.is_some() {
            new_rule.description = request.description;
        }
        new_rule.is_enabled = request.is_enabled;
        new_rule.applies_to_all = request.applies_to_all;
        new_rule.product_filter = request.product_filter;

        let created = self.rules.create_rules(&[new_rule]).await?;
        let rule = created
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::Validation("Rule was not created".to_string()))?;

        info!(
            shop_id = %shop_id,
            rule_id = %rule.id,
            rule_kind = %rule.kind(),
            "Catalog rule created"
        );
        Ok(rule)
    }

    /// Applies a partial update. A new kind or configuration is re-validated;
    /// configuration alone is checked against the existing kind.
    pub async fn update_rule(
        &self,
        shop_id: Uuid,
        rule_id: Uuid,
        request: UpdateRuleRequest,
    ) -> Result<CatalogRule, DomainError> {
        let existing = self.get_rule(shop_id, rule_id).await?;

        let condition = if request.rule_kind.is_some() || request.configuration.is_some() {
            let kind = request.rule_kind.unwrap_or_else(|| existing.kind());
            let config = request
                .configuration
                .unwrap_or_else(|| existing.condition.config());
            Some(RuleCondition::parse(kind, &config)?)
        } else {
            None
        };

        let patch = CatalogRulePatch {
            name: request.name,
            description: request.description,
            condition,
            severity: request.severity,
            is_enabled: request.is_enabled,
            applies_to_all: request.applies_to_all,
            product_filter: request.product_filter,
        };

        self.rules
            .update_rule(shop_id, rule_id, &patch)
            .await?
            .ok_or_else(|| DomainError::NotFound("Rule not found".to_string()))
    }

    pub async fn toggle_rule(
        &self,
        shop_id: Uuid,
        rule_id: Uuid,
        is_enabled: bool,
    ) -> Result<CatalogRule, DomainError> {
        let patch = CatalogRulePatch {
            is_enabled: Some(is_enabled),
            ..Default::default()
        };
        self.rules
            .update_rule(shop_id, rule_id, &patch)
            .await?
            .ok_or_else(|| DomainError::NotFound("Rule not found".to_string()))
    }

    pub async fn delete_rule(&self, shop_id: Uuid, rule_id: Uuid) -> Result<(), DomainError> {
        if !self.rules.delete_rule(shop_id, rule_id).await? {
            return Err(DomainError::NotFound("Rule not found".to_string()));
        }
        info!(shop_id = %shop_id, rule_id = %rule_id, "Catalog rule deleted");
        Ok(())
    }

    /// Creates one rule per template entry in a single batch.
    pub async fn apply_template(
        &self,
        shop_id: Uuid,
        template_name: &str,
    ) -> Result<Vec<CatalogRule>, DomainError> {
        let template = RuleTemplate::find(template_name).ok_or_else(|| {
            DomainError::NotFound(format!("Template '{}' not found", template_name))
        })?;

        let new_rules: Vec<NewCatalogRule> = template
            .rules
            .into_iter()
            .map(|entry| NewCatalogRule::from_catalog(shop_id, entry.condition, entry.severity))
            .collect();

        let created = self.rules.create_rules(&new_rules).await?;
        info!(
            shop_id = %shop_id,
            template = template_name,
            rules_created = created.len(),
            "Rule template applied"
        );
        Ok(created)
    }

    pub fn list_templates(&self) -> Vec<RuleTemplate> {
        RuleTemplate::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog_rule::ProductFilter;
    use crate::models::rule_kind::RuleKind;
    use crate::models::severity::Severity;
    use crate::ports::InMemoryStore;
    use serde_json::json;

    fn store() -> RuleStore {
        RuleStore::new(Arc::new(InMemoryStore::new()))
    }

    fn create_request(kind: RuleKind, configuration: serde_json::Value) -> CreateRuleRequest {
        CreateRuleRequest {
            rule_kind: kind,
            configuration,
            name: None,
            description: None,
            severity: None,
            is_enabled: true,
            applies_to_all: true,
            product_filter: None,
        }
    }

    #[tokio::test]
    async fn test_create_rule_uses_catalog_defaults() {
        let store = store();
        let shop_id = Uuid::new_v4();
        let rule = store
            .create_rule(shop_id, create_request(RuleKind::MinImages, json!({"min": 4})))
            .await
            .unwrap();

        let definition = RuleKind::MinImages.definition();
        assert_eq!(rule.name, definition.label);
        assert_eq!(rule.severity, definition.default_severity);
        assert_eq!(rule.condition, RuleCondition::MinImages { min: 4 });
    }

    #[tokio::test]
    async fn test_create_rule_rejects_invalid_config() {
        let store = store();
        let err = store
            .create_rule(
                Uuid::new_v4(),
                create_request(RuleKind::SeoTitleLength, json!({"min": 70, "max": 60})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = store
            .create_rule(
                Uuid::new_v4(),
                create_request(RuleKind::RequiredTags, json!({"tags": []})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rule_with_overrides() {
        let store = store();
        let mut request = create_request(RuleKind::AltTextRequired, json!({}));
        request.name = Some("Alt everywhere".into());
        request.severity = Some(Severity::High);
        request.applies_to_all = false;
        request.product_filter = Some(ProductFilter {
            product_ids: vec![],
            tags: vec!["sale".into()],
        });

        let rule = store.create_rule(Uuid::new_v4(), request).await.unwrap();
        assert_eq!(rule.name, "Alt everywhere");
        assert_eq!(rule.severity, Severity::High);
        assert!(!rule.applies_to_all);
    }

    #[tokio::test]
    async fn test_update_configuration_validated_against_existing_kind() {
        let store = store();
        let shop_id = Uuid::new_v4();
        let rule = store
            .create_rule(shop_id, create_request(RuleKind::MaxImages, json!({"max": 10})))
            .await
            .unwrap();

        let bad = UpdateRuleRequest {
            configuration: Some(json!({"min": 2})),
            ..Default::default()
        };
        assert!(store.update_rule(shop_id, rule.id, bad).await.is_err());

        let good = UpdateRuleRequest {
            configuration: Some(json!({"max": 6})),
            severity: Some(Severity::Low),
            ..Default::default()
        };
        let updated = store.update_rule(shop_id, rule.id, good).await.unwrap();
        assert_eq!(updated.condition, RuleCondition::MaxImages { max: 6 });
        assert_eq!(updated.severity, Severity::Low);
        assert_eq!(updated.name, rule.name);
    }

    #[tokio::test]
    async fn test_update_kind_change_requires_matching_config() {
        let store = store();
        let shop_id = Uuid::new_v4();
        let rule = store
            .create_rule(shop_id, create_request(RuleKind::MinImages, json!({"min": 3})))
            .await
            .unwrap();

        let request = UpdateRuleRequest {
            rule_kind: Some(RuleKind::CollectionRequired),
            configuration: Some(json!({})),
            ..Default::default()
        };
        let updated = store.update_rule(shop_id, rule.id, request).await.unwrap();
        assert_eq!(updated.kind(), RuleKind::CollectionRequired);
    }

    #[tokio::test]
    async fn test_rules_are_shop_scoped() {
        let store = store();
        let shop_a = Uuid::new_v4();
        let shop_b = Uuid::new_v4();
        let rule = store
            .create_rule(shop_a, create_request(RuleKind::CollectionRequired, json!({})))
            .await
            .unwrap();

        assert!(matches!(
            store.get_rule(shop_b, rule.id).await,
            Err(DomainError::NotFound(_))
        ));
        assert!(store.delete_rule(shop_b, rule.id).await.is_err());
        assert_eq!(store.list_rules(shop_a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_and_enabled_rules() {
        let store = store();
        let shop_id = Uuid::new_v4();
        let rule = store
            .create_rule(shop_id, create_request(RuleKind::CollectionRequired, json!({})))
            .await
            .unwrap();

        let toggled = store.toggle_rule(shop_id, rule.id, false).await.unwrap();
        assert!(!toggled.is_enabled);
        assert!(store.enabled_rules(shop_id).await.unwrap().is_empty());
        assert_eq!(store.list_rules(shop_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_hard() {
        let store = store();
        let shop_id = Uuid::new_v4();
        let rule = store
            .create_rule(shop_id, create_request(RuleKind::CollectionRequired, json!({})))
            .await
            .unwrap();
        store.delete_rule(shop_id, rule.id).await.unwrap();
        assert!(store.list_rules(shop_id).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_rule(shop_id, rule.id).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_template_creates_rules_in_order() {
        let store = store();
        let shop_id = Uuid::new_v4();
        let created = store.apply_template(shop_id, "seo_essentials").await.unwrap();

        let kinds: Vec<RuleKind> = created.iter().map(|r| r.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                RuleKind::SeoTitleLength,
                RuleKind::SeoDescriptionLength,
                RuleKind::AltTextRequired
            ]
        );
        assert_eq!(created[1].severity, Severity::Low);
        assert_eq!(created[0].name, RuleKind::SeoTitleLength.definition().label);
    }

    #[tokio::test]
    async fn test_apply_unknown_template() {
        let store = store();
        let err = store.apply_template(Uuid::new_v4(), "everything").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
