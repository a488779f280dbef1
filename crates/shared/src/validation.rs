//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// Shopify-style shop domains, e.g. `my-store.myshopify.com`.
    static ref SHOP_DOMAIN_RE: Regex =
        Regex::new(r"^[a-z0-9][a-z0-9-]*(\.[a-z0-9-]+)+$").expect("valid shop domain regex");
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex");
}

/// Maximum length of a catalog product identifier.
const MAX_PRODUCT_ID_LENGTH: usize = 255;

/// Validates that an hour of day is within 0..=23.
pub fn validate_hour(hour: i32) -> Result<(), ValidationError> {
    if (0..=23).contains(&hour) {
        Ok(())
    } else {
        let mut err = ValidationError::new("hour_range");
        err.message = Some("Hour must be between 0 and 23".into());
        Err(err)
    }
}

/// Validates a day of week (0 = Sunday .. 6 = Saturday).
pub fn validate_day_of_week(day: i32) -> Result<(), ValidationError> {
    if (0..=6).contains(&day) {
        Ok(())
    } else {
        let mut err = ValidationError::new("day_of_week_range");
        err.message = Some("Day of week must be between 0 (Sunday) and 6 (Saturday)".into());
        Err(err)
    }
}

/// Validates a day of month. Capped at 28 so every month has the day.
pub fn validate_day_of_month(day: i32) -> Result<(), ValidationError> {
    if (1..=28).contains(&day) {
        Ok(())
    } else {
        let mut err = ValidationError::new("day_of_month_range");
        err.message = Some("Day of month must be between 1 and 28".into());
        Err(err)
    }
}

/// Validates a shop domain.
pub fn validate_shop_domain(domain: &str) -> Result<(), ValidationError> {
    if SHOP_DOMAIN_RE.is_match(domain) {
        Ok(())
    } else {
        let mut err = ValidationError::new("shop_domain_format");
        err.message = Some("Shop domain must be a lowercase hostname".into());
        Err(err)
    }
}

/// Validates a list of notification recipient addresses.
pub fn validate_recipients(recipients: &[String]) -> Result<(), ValidationError> {
    if recipients.iter().all(|r| EMAIL_RE.is_match(r)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("recipient_format");
        err.message = Some("Every recipient must be a valid email address".into());
        Err(err)
    }
}

/// Validates a catalog product identifier (non-blank, bounded length).
pub fn validate_product_id(product_id: &str) -> Result<(), ValidationError> {
    let trimmed = product_id.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_PRODUCT_ID_LENGTH {
        let mut err = ValidationError::new("product_id_format");
        err.message = Some("Product id must be 1-255 characters".into());
        Err(err)
    } else {
        Ok(())
    }
}
