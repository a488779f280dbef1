//! Query limit helpers.

/// Default number of rows returned by list endpoints.
pub const DEFAULT_LIMIT: i64 = 50;

/// Upper bound on rows returned by list endpoints.
pub const MAX_LIMIT: i64 = 200;

/// Clamps an optional caller-supplied limit into `1..=max`, falling back to `default`.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

/// Clamps a list limit using the crate defaults.
pub fn list_limit(limit: Option<i64>) -> i64 {
    clamp_limit(limit, DEFAULT_LIMIT, MAX_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_limit_default() {
        assert_eq!(list_limit(None), 50);
    }

    #[test]
    fn test_list_limit_clamps() {
        assert_eq!(list_limit(Some(0)), 1);
        assert_eq!(list_limit(Some(-5)), 1);
        assert_eq!(list_limit(Some(10_000)), 200);
        assert_eq!(list_limit(Some(75)), 75);
    }

    #[test]
    fn test_clamp_limit_custom_bounds() {
        assert_eq!(clamp_limit(None, 30, 365), 30);
        assert_eq!(clamp_limit(Some(400), 30, 365), 365);
    }
}
