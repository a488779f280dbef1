//! Product snapshot supplied by the catalog collaborator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A single product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

impl ProductImage {
    /// True when the image carries non-blank alt text.
    pub fn has_alt_text(&self) -> bool {
        self.alt_text
            .as_deref()
            .map(|alt| !alt.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Point-in-time view of a product's compliance-relevant content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductSnapshot {
    pub title: String,
    pub seo_title: String,
    pub seo_description: String,
    pub description: String,
    pub images: Vec<ProductImage>,
    pub tags: Vec<String>,
    pub collections: Vec<String>,
}

/// Length of trimmed text in Unicode scalar values.
pub fn text_len(text: &str) -> usize {
    text.trim().chars().count()
}

/// True when the text is empty after trimming.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

impl ProductSnapshot {
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Number of images without usable alt text.
    pub fn images_missing_alt(&self) -> usize {
        self.images.iter().filter(|i| !i.has_alt_text()).count()
    }

    /// Case-insensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim();
        self.tags.iter().any(|t| t.trim().eq_ignore_ascii_case(wanted))
    }
}

/// Request payload for a manual product scan.
///
/// When `snapshot` is omitted the current snapshot is fetched from the catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProductRequest {
    pub snapshot: Option<ProductSnapshot>,
}

/// Product update webhook payload.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductWebhookPayload {
    pub shop_id: Uuid,
    #[validate(custom(function = "shared::validation::validate_product_id"))]
    pub product_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(alt: Option<&str>) -> ProductImage {
        ProductImage {
            url: "https://cdn.example.com/a.jpg".into(),
            alt_text: alt.map(String::from),
        }
    }

    #[test]
    fn test_text_len_counts_chars_after_trim() {
        assert_eq!(text_len("  héllo  "), 5);
        assert_eq!(text_len(""), 0);
    }

    #[test]
    fn test_images_missing_alt() {
        let snapshot = ProductSnapshot {
            images: vec![image(Some("front")), image(None), image(Some("   "))],
            ..Default::default()
        };
        assert_eq!(snapshot.images_missing_alt(), 2);
    }

    #[test]
    fn test_has_tag_case_insensitive() {
        let snapshot = ProductSnapshot {
            tags: vec!["Featured".into(), "summer".into()],
            ..Default::default()
        };
        assert!(snapshot.has_tag("featured"));
        assert!(!snapshot.has_tag("winter"));
    }

    #[test]
    fn test_snapshot_deserialization_defaults() {
        let snapshot: ProductSnapshot = serde_json::from_str(r#"{"title": "Mug"}"#).unwrap();
        assert_eq!(snapshot.title, "Mug");
        assert!(snapshot.images.is_empty());
        assert!(snapshot.seo_title.is_empty());
    }

    #[test]
    fn test_image_alt_text_camel_case() {
        let img: ProductImage =
            serde_json::from_str(r#"{"url": "https://x/y.png", "altText": "Side"}"#).unwrap();
        assert!(img.has_alt_text());
    }
}
