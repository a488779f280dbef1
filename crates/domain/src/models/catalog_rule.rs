//! Merchant-defined catalog rules and rule templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::product::ProductSnapshot;
use super::rule_kind::{RuleCondition, RuleKind};
use super::severity::Severity;

/// Restricts a rule to a subset of products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductFilter {
    pub product_ids: Vec<String>,
    pub tags: Vec<String>,
}

impl ProductFilter {
    /// A product matches when its id is listed or it carries any listed tag.
    pub fn matches(&self, product_id: &str, snapshot: &ProductSnapshot) -> bool {
        self.product_ids.iter().any(|id| id == product_id)
            || self.tags.iter().any(|tag| snapshot.has_tag(tag))
    }
}

/// A shop-scoped rule instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRule {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub condition: RuleCondition,
    pub severity: Severity,
    pub is_enabled: bool,
    pub applies_to_all: bool,
    pub product_filter: Option<ProductFilter>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogRule {
    pub fn kind(&self) -> RuleKind {
        self.condition.kind()
    }

    /// Whether this rule is evaluated for the given product.
    ///
    /// A rule scoped to a filter with no filter set applies to nothing.
    pub fn applies_to(&self, product_id: &str, snapshot: &ProductSnapshot) -> bool {
        if self.applies_to_all {
            return true;
        }
        self.product_filter
            .as_ref()
            .map(|f| f.matches(product_id, snapshot))
            .unwrap_or(false)
    }
}

/// Input for inserting a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogRule {
    pub shop_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub condition: RuleCondition,
    pub severity: Severity,
    pub is_enabled: bool,
    pub applies_to_all: bool,
    pub product_filter: Option<ProductFilter>,
}

impl NewCatalogRule {
    /// A rule populated from the catalog defaults for its kind.
    pub fn from_catalog(
        shop_id: Uuid,
        condition: RuleCondition,
        severity: Option<Severity>,
    ) -> Self {
        let definition = condition.kind().definition();
        Self {
            shop_id,
            name: definition.label.to_string(),
            description: Some(definition.description.to_string()),
            severity: severity.unwrap_or(definition.default_severity),
            condition,
            is_enabled: true,
            applies_to_all: true,
            product_filter: None,
        }
    }
}

/// Partial update of a rule. `None` fields are preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogRulePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub condition: Option<RuleCondition>,
    pub severity: Option<Severity>,
    pub is_enabled: Option<bool>,
    pub applies_to_all: Option<bool>,
    pub product_filter: Option<ProductFilter>,
}

fn default_true() -> bool {
    true
}

fn empty_config() -> Value {
    json!({})
}

/// Request payload for creating a rule.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleRequest {
    pub rule_kind: RuleKind,

    #[serde(default = "empty_config")]
    pub configuration: Value,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub severity: Option<Severity>,

    #[serde(default = "default_true")]
    pub is_enabled: bool,

    #[serde(default = "default_true")]
    pub applies_to_all: bool,

    pub product_filter: Option<ProductFilter>,
}

/// Request payload for updating a rule (partial update).
///
/// `configuration` without `ruleKind` is validated against the existing kind.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRuleRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub rule_kind: Option<RuleKind>,

    pub configuration: Option<Value>,

    pub severity: Option<Severity>,

    pub is_enabled: Option<bool>,

    pub applies_to_all: Option<bool>,

    pub product_filter: Option<ProductFilter>,
}

/// Request payload for enabling or disabling a rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRuleRequest {
    pub is_enabled: bool,
}

/// Response payload for rule operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRuleResponse {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub rule_kind: RuleKind,
    pub configuration: Value,
    pub severity: Severity,
    pub is_enabled: bool,
    pub applies_to_all: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_filter: Option<ProductFilter>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CatalogRule> for CatalogRuleResponse {
    fn from(r: CatalogRule) -> Self {
        Self {
            id: r.id,
            shop_id: r.shop_id,
            name: r.name,
            description: r.description,
            rule_kind: r.condition.kind(),
            configuration: r.condition.config(),
            severity: r.severity,
            is_enabled: r.is_enabled,
            applies_to_all: r.applies_to_all,
            product_filter: r.product_filter,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Response for listing rules.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRulesResponse {
    pub rules: Vec<CatalogRuleResponse>,
    pub total: usize,
}

/// One rule inside a template. `severity: None` uses the catalog default.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRule {
    pub condition: RuleCondition,
    pub severity: Option<Severity>,
}

/// A named, ordered bundle of rules.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTemplate {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub rules: Vec<TemplateRule>,
}

impl RuleTemplate {
    /// All built-in templates.
    pub fn all() -> Vec<RuleTemplate> {
        vec![
            RuleTemplate {
                name: "seo_essentials",
                label: "SEO essentials",
                description: "Title and meta description lengths plus image alt text.",
                rules: vec![
                    TemplateRule {
                        condition: RuleCondition::SeoTitleLength { min: 30, max: 60 },
                        severity: None,
                    },
                    TemplateRule {
                        condition: RuleCondition::SeoDescriptionLength { min: 50, max: 160 },
                        severity: Some(Severity::Low),
                    },
                    TemplateRule {
                        condition: RuleCondition::AltTextRequired,
                        severity: None,
                    },
                ],
            },
            RuleTemplate {
                name: "rich_media",
                label: "Rich media",
                description: "At least three images, all with alt text.",
                rules: vec![
                    TemplateRule {
                        condition: RuleCondition::MinImages { min: 3 },
                        severity: None,
                    },
                    TemplateRule {
                        condition: RuleCondition::AltTextRequired,
                        severity: Some(Severity::High),
                    },
                ],
            },
            RuleTemplate {
                name: "complete_listing",
                label: "Complete listing",
                description: "Substantial descriptions, clear titles, merchandising coverage.",
                rules: vec![
                    TemplateRule {
                        condition: RuleCondition::MinDescriptionLength { min: 100 },
                        severity: None,
                    },
                    TemplateRule {
                        condition: RuleCondition::MinTitleLength { min: 10 },
                        severity: None,
                    },
                    TemplateRule {
                        condition: RuleCondition::CollectionRequired,
                        severity: Some(Severity::Low),
                    },
                    TemplateRule {
                        condition: RuleCondition::RequiredTags {
                            tags: vec!["featured".to_string()],
                        },
                        severity: Some(Severity::Low),
                    },
                ],
            },
        ]
    }

    pub fn find(name: &str) -> Option<RuleTemplate> {
        Self::all().into_iter().find(|t| t.name == name)
    }
}

/// Template listing entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTemplateResponse {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub rule_kinds: Vec<RuleKind>,
}

impl From<RuleTemplate> for RuleTemplateResponse {
    fn from(t: RuleTemplate) -> Self {
        Self {
            name: t.name,
            label: t.label,
            description: t.description,
            rule_kinds: t.rules.iter().map(|r| r.condition.kind()).collect(),
        }
    }
}
