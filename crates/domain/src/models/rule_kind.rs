//! Rule catalog: the closed set of rule kinds and their typed configuration.
//!
//! A [`RuleKind`] names a category of catalog standard. A [`RuleCondition`]
//! is a kind together with validated configuration, and knows how to evaluate
//! itself against a [`ProductSnapshot`]. Adding a kind means adding a variant
//! to both enums; the compiler then points at every match that needs an arm.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::product::{text_len, ProductSnapshot};
use super::severity::Severity;

/// Errors raised while parsing rule configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleConfigError {
    #[error("Unknown rule kind: {0}")]
    UnknownKind(String),

    #[error("Invalid configuration for {kind}: {reason}")]
    InvalidConfig { kind: RuleKind, reason: String },
}

/// Built-in rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    MinImages,
    MaxImages,
    MinDescriptionLength,
    MaxDescriptionLength,
    MinTitleLength,
    MaxTitleLength,
    SeoTitleLength,
    SeoDescriptionLength,
    RequiredTags,
    AltTextRequired,
    CollectionRequired,
}

/// Shape of a single configuration field, exposed to clients building forms.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigField {
    pub name: &'static str,
    pub field_type: &'static str,
    pub required: bool,
}

/// Catalog entry describing a rule kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    pub kind: RuleKind,
    pub label: &'static str,
    pub description: &'static str,
    pub default_severity: Severity,
    pub config_fields: Vec<ConfigField>,
}

const fn field(name: &'static str, field_type: &'static str) -> ConfigField {
    ConfigField {
        name,
        field_type,
        required: true,
    }
}

impl RuleKind {
    pub const ALL: [RuleKind; 11] = [
        RuleKind::MinImages,
        RuleKind::MaxImages,
        RuleKind::MinDescriptionLength,
        RuleKind::MaxDescriptionLength,
        RuleKind::MinTitleLength,
        RuleKind::MaxTitleLength,
        RuleKind::SeoTitleLength,
        RuleKind::SeoDescriptionLength,
        RuleKind::RequiredTags,
        RuleKind::AltTextRequired,
        RuleKind::CollectionRequired,
    ];

    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::MinImages => "min_images",
            RuleKind::MaxImages => "max_images",
            RuleKind::MinDescriptionLength => "min_description_length",
            RuleKind::MaxDescriptionLength => "max_description_length",
            RuleKind::MinTitleLength => "min_title_length",
            RuleKind::MaxTitleLength => "max_title_length",
            RuleKind::SeoTitleLength => "seo_title_length",
            RuleKind::SeoDescriptionLength => "seo_description_length",
            RuleKind::RequiredTags => "required_tags",
            RuleKind::AltTextRequired => "alt_text_required",
            RuleKind::CollectionRequired => "collection_required",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Catalog entry for this kind.
    pub fn definition(&self) -> RuleDefinition {
        let (label, description, default_severity, config_fields) = match self {
            RuleKind::MinImages => (
                "Minimum images",
                "Products must have at least the configured number of images.",
                Severity::Medium,
                vec![field("min", "integer")],
            ),
            RuleKind::MaxImages => (
                "Maximum images",
                "Products must not exceed the configured number of images.",
                Severity::Low,
                vec![field("max", "integer")],
            ),
            RuleKind::MinDescriptionLength => (
                "Minimum description length",
                "Descriptions must be at least the configured number of characters.",
                Severity::Medium,
                vec![field("min", "integer")],
            ),
            RuleKind::MaxDescriptionLength => (
                "Maximum description length",
                "Descriptions must not exceed the configured number of characters.",
                Severity::Low,
                vec![field("max", "integer")],
            ),
            RuleKind::MinTitleLength => (
                "Minimum title length",
                "Product titles must be at least the configured number of characters.",
                Severity::Medium,
                vec![field("min", "integer")],
            ),
            RuleKind::MaxTitleLength => (
                "Maximum title length",
                "Product titles must not exceed the configured number of characters.",
                Severity::Low,
                vec![field("max", "integer")],
            ),
            RuleKind::SeoTitleLength => (
                "SEO title length",
                "SEO titles must fall within the configured character range.",
                Severity::Medium,
                vec![field("min", "integer"), field("max", "integer")],
            ),
            RuleKind::SeoDescriptionLength => (
                "SEO description length",
                "SEO descriptions must fall within the configured character range.",
                Severity::Medium,
                vec![field("min", "integer"), field("max", "integer")],
            ),
            RuleKind::RequiredTags => (
                "Required tags",
                "Products must carry every configured tag.",
                Severity::Medium,
                vec![field("tags", "string[]")],
            ),
            RuleKind::AltTextRequired => (
                "Alt text required",
                "Every product image must have alt text.",
                Severity::Medium,
                Vec::new(),
            ),
            RuleKind::CollectionRequired => (
                "Collection required",
                "Products must belong to at least one collection.",
                Severity::Medium,
                Vec::new(),
            ),
        };

        RuleDefinition {
            kind: *self,
            label,
            description,
            default_severity,
            config_fields,
        }
    }

    /// The full rule catalog, in display order.
    pub fn catalog() -> Vec<RuleDefinition> {
        Self::ALL.iter().map(RuleKind::definition).collect()
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MinConfig {
    min: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaxConfig {
    max: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeConfig {
    min: u32,
    max: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TagsConfig {
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyConfig {}

/// A rule kind with validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleCondition {
    MinImages { min: u32 },
    MaxImages { max: u32 },
    MinDescriptionLength { min: u32 },
    MaxDescriptionLength { max: u32 },
    MinTitleLength { min: u32 },
    MaxTitleLength { max: u32 },
    SeoTitleLength { min: u32, max: u32 },
    SeoDescriptionLength { min: u32, max: u32 },
    RequiredTags { tags: Vec<String> },
    AltTextRequired,
    CollectionRequired,
}

/// Outcome of a failed rule evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub message: String,
    pub actual: Value,
}

fn decode<T: serde::de::DeserializeOwned>(
    kind: RuleKind,
    config: &Value,
) -> Result<T, RuleConfigError> {
    // A missing configuration is treated as an empty object.
    let config = if config.is_null() { json!({}) } else { config.clone() };
    serde_json::from_value(config).map_err(|e| RuleConfigError::InvalidConfig {
        kind,
        reason: e.to_string(),
    })
}

fn check_range(kind: RuleKind, min: u32, max: u32) -> Result<(), RuleConfigError> {
    if min > max {
        return Err(RuleConfigError::InvalidConfig {
            kind,
            reason: format!("min ({}) must not exceed max ({})", min, max),
        });
    }
    Ok(())
}

fn below(actual: usize, min: u32) -> bool {
    actual < min as usize
}

fn above(actual: usize, max: u32) -> bool {
    actual > max as usize
}

impl RuleCondition {
    /// Validates `config` against the schema for `kind`.
    pub fn parse(kind: RuleKind, config: &Value) -> Result<Self, RuleConfigError> {
        let condition = match kind {
            RuleKind::MinImages => RuleCondition::MinImages {
                min: decode::<MinConfig>(kind, config)?.min,
            },
            RuleKind::MaxImages => RuleCondition::MaxImages {
                max: decode::<MaxConfig>(kind, config)?.max,
            },
            RuleKind::MinDescriptionLength => RuleCondition::MinDescriptionLength {
                min: decode::<MinConfig>(kind, config)?.min,
            },
            RuleKind::MaxDescriptionLength => RuleCondition::MaxDescriptionLength {
                max: decode::<MaxConfig>(kind, config)?.max,
            },
            RuleKind::MinTitleLength => RuleCondition::MinTitleLength {
                min: decode::<MinConfig>(kind, config)?.min,
            },
            RuleKind::MaxTitleLength => RuleCondition::MaxTitleLength {
                max: decode::<MaxConfig>(kind, config)?.max,
            },
            RuleKind::SeoTitleLength => {
                let RangeConfig { min, max } = decode(kind, config)?;
                check_range(kind, min, max)?;
                RuleCondition::SeoTitleLength { min, max }
            }
            RuleKind::SeoDescriptionLength => {
                let RangeConfig { min, max } = decode(kind, config)?;
                check_range(kind, min, max)?;
                RuleCondition::SeoDescriptionLength { min, max }
            }
            RuleKind::RequiredTags => {
                let tags: Vec<String> = decode::<TagsConfig>(kind, config)?
                    .tags
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                if tags.is_empty() {
                    return Err(RuleConfigError::InvalidConfig {
                        kind,
                        reason: "at least one tag is required".into(),
                    });
                }
                RuleCondition::RequiredTags { tags }
            }
            RuleKind::AltTextRequired => {
                decode::<EmptyConfig>(kind, config)?;
                RuleCondition::AltTextRequired
            }
            RuleKind::CollectionRequired => {
                decode::<EmptyConfig>(kind, config)?;
                RuleCondition::CollectionRequired
            }
        };
        Ok(condition)
    }

    /// Parses a kind given as a string (as stored in the database).
    pub fn parse_str(kind: &str, config: &Value) -> Result<Self, RuleConfigError> {
        let kind = RuleKind::parse(kind)
            .ok_or_else(|| RuleConfigError::UnknownKind(kind.to_string()))?;
        Self::parse(kind, config)
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            RuleCondition::MinImages { .. } => RuleKind::MinImages,
            RuleCondition::MaxImages { .. } => RuleKind::MaxImages,
            RuleCondition::MinDescriptionLength { .. } => RuleKind::MinDescriptionLength,
            RuleCondition::MaxDescriptionLength { .. } => RuleKind::MaxDescriptionLength,
            RuleCondition::MinTitleLength { .. } => RuleKind::MinTitleLength,
            RuleCondition::MaxTitleLength { .. } => RuleKind::MaxTitleLength,
            RuleCondition::SeoTitleLength { .. } => RuleKind::SeoTitleLength,
            RuleCondition::SeoDescriptionLength { .. } => RuleKind::SeoDescriptionLength,
            RuleCondition::RequiredTags { .. } => RuleKind::RequiredTags,
            RuleCondition::AltTextRequired => RuleKind::AltTextRequired,
            RuleCondition::CollectionRequired => RuleKind::CollectionRequired,
        }
    }

    /// Configuration in its stored JSON form.
    pub fn config(&self) -> Value {
        match self {
            RuleCondition::MinImages { min }
            | RuleCondition::MinDescriptionLength { min }
            | RuleCondition::MinTitleLength { min } => json!({ "min": min }),
            RuleCondition::MaxImages { max }
            | RuleCondition::MaxDescriptionLength { max }
            | RuleCondition::MaxTitleLength { max } => json!({ "max": max }),
            RuleCondition::SeoTitleLength { min, max }
            | RuleCondition::SeoDescriptionLength { min, max } => json!({ "min": min, "max": max }),
            RuleCondition::RequiredTags { tags } => json!({ "tags": tags }),
            RuleCondition::AltTextRequired | RuleCondition::CollectionRequired => json!({}),
        }
    }

    /// Evaluates the condition against the current snapshot.
    ///
    /// Returns `None` when the product passes.
    pub fn evaluate(&self, snapshot: &ProductSnapshot) -> Option<Violation> {
        match self {
            RuleCondition::MinImages { min } => {
                let count = snapshot.image_count();
                below(count, *min).then(|| Violation {
                    message: format!("Product has {} images, minimum is {}", count, min),
                    actual: json!(count),
                })
            }
            RuleCondition::MaxImages { max } => {
                let count = snapshot.image_count();
                above(count, *max).then(|| Violation {
                    message: format!("Product has {} images, maximum is {}", count, max),
                    actual: json!(count),
                })
            }
            RuleCondition::MinDescriptionLength { min } => {
                let len = text_len(&snapshot.description);
                below(len, *min).then(|| Violation {
                    message: format!("Description is {} characters, minimum is {}", len, min),
                    actual: json!(len),
                })
            }
            RuleCondition::MaxDescriptionLength { max } => {
                let len = text_len(&snapshot.description);
                above(len, *max).then(|| Violation {
                    message: format!("Description is {} characters, maximum is {}", len, max),
                    actual: json!(len),
                })
            }
            RuleCondition::MinTitleLength { min } => {
                let len = text_len(&snapshot.title);
                below(len, *min).then(|| Violation {
                    message: format!("Title is {} characters, minimum is {}", len, min),
                    actual: json!(len),
                })
            }
            RuleCondition::MaxTitleLength { max } => {
                let len = text_len(&snapshot.title);
                above(len, *max).then(|| Violation {
                    message: format!("Title is {} characters, maximum is {}", len, max),
                    actual: json!(len),
                })
            }
            RuleCondition::SeoTitleLength { min, max } => {
                let len = text_len(&snapshot.seo_title);
                (below(len, *min) || above(len, *max)).then(|| Violation {
                    message: format!("SEO title is {} characters, expected {}-{}", len, min, max),
                    actual: json!(len),
                })
            }
            RuleCondition::SeoDescriptionLength { min, max } => {
                let len = text_len(&snapshot.seo_description);
                (below(len, *min) || above(len, *max)).then(|| Violation {
                    message: format!(
                        "SEO description is {} characters, expected {}-{}",
                        len, min, max
                    ),
                    actual: json!(len),
                })
            }
            RuleCondition::RequiredTags { tags } => {
                let missing: Vec<&String> = tags.iter().filter(|t| !snapshot.has_tag(t)).collect();
                (!missing.is_empty()).then(|| Violation {
                    message: format!(
                        "Missing required tags: {}",
                        missing.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
                    ),
                    actual: json!({ "missing": missing }),
                })
            }
            RuleCondition::AltTextRequired => {
                let missing = snapshot.images_missing_alt();
                (missing > 0).then(|| Violation {
                    message: format!(
                        "{} of {} images are missing alt text",
                        missing,
                        snapshot.image_count()
                    ),
                    actual: json!({ "missing": missing, "total": snapshot.image_count() }),
                })
            }
            RuleCondition::CollectionRequired => snapshot.collections.is_empty().then(|| Violation {
                message: "Product is not in any collection".to_string(),
                actual: json!(0),
            }),
        }
    }
}
