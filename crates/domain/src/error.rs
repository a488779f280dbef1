//! Domain error types.

use thiserror::Error;

use crate::models::rule_kind::RuleConfigError;

/// Errors surfaced by domain services.
///
/// Policy denials from the billing gate are not errors; they are returned
/// as [`crate::models::billing::GateDecision`] values.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Operation timed out after {0}s")]
    Timeout(u64),
}

impl From<RuleConfigError> for DomainError {
    fn from(err: RuleConfigError) -> Self {
        DomainError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rule_kind::RuleKind;

    #[test]
    fn test_domain_error_display() {
        assert_eq!(
            DomainError::NotFound("Schedule".into()).to_string(),
            "Not found: Schedule"
        );
        assert_eq!(
            DomainError::Timeout(120).to_string(),
            "Operation timed out after 120s"
        );
    }

    #[test]
    fn test_rule_config_error_maps_to_validation() {
        let err: DomainError = RuleConfigError::InvalidConfig {
            kind: RuleKind::MinImages,
            reason: "missing field `min`".into(),
        }
        .into();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
