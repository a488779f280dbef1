//! Shared-secret authentication for cron endpoints.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::Config;
use crate::error::ApiError;

/// Bearer secret expected on cron requests.
#[derive(Debug, Clone)]
pub struct CronAuth {
    expected: Option<Arc<str>>,
    production: bool,
}

impl CronAuth {
    pub fn new(secret: Option<&str>, production: bool) -> Self {
        Self {
            expected: secret
                .filter(|s| !s.is_empty())
                .map(|s| Arc::from(format!("Bearer {}", s))),
            production,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cron.secret.as_deref(), config.server.is_production())
    }
}

/// Requires `Authorization: Bearer <cron.secret>`.
///
/// Without a configured secret the endpoint is open outside production and
/// unavailable in production.
pub async fn require_cron_secret(
    State(auth): State<CronAuth>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = auth.expected.as_deref() else {
        if auth.production {
            tracing::error!("Cron secret not configured in production");
            return ApiError::ServiceUnavailable("Cron endpoint is not configured".into())
                .into_response();
        }
        tracing::warn!("Cron secret not configured, allowing unauthenticated cron request");
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if provided == Some(expected) {
        next.run(req).await
    } else {
        tracing::warn!("Rejected cron request with missing or invalid secret");
        ApiError::Unauthorized("Invalid cron secret".into()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::post, Router};
    use tower::ServiceExt;

    fn app(auth: CronAuth) -> Router {
        Router::new()
            .route("/cron", post(|| async { "ran" }))
            .layer(middleware::from_fn_with_state(auth, require_cron_secret))
    }

    async fn call(auth: CronAuth, authorization: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().method("POST").uri("/cron");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        app(auth)
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_matching_secret_allowed() {
        let auth = CronAuth::new(Some("s3cret"), true);
        assert_eq!(call(auth, Some("Bearer s3cret")).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_or_missing_secret_rejected() {
        let auth = CronAuth::new(Some("s3cret"), false);
        assert_eq!(call(auth.clone(), None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            call(auth.clone(), Some("Bearer wrong")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(call(auth, Some("s3cret")).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unconfigured_secret_open_outside_production() {
        assert_eq!(call(CronAuth::new(None, false), None).await, StatusCode::OK);
        assert_eq!(call(CronAuth::new(Some(""), false), None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unconfigured_secret_unavailable_in_production() {
        assert_eq!(
            call(CronAuth::new(None, true), Some("Bearer anything")).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
