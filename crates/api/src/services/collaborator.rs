//! Shared HTTP plumbing for the catalog, report and AI collaborators.

use std::time::{Duration, Instant};

use domain::error::DomainError;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CollaboratorConfig;

/// Errors raised while building a collaborator client.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Invalid base URL for {name}: {reason}")]
    InvalidBaseUrl { name: &'static str, reason: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// JSON-over-HTTP client for one collaborator endpoint.
#[derive(Debug, Clone)]
pub struct CollaboratorClient {
    name: &'static str,
    client: Client,
    base_url: Url,
    api_token: String,
    timeout_ms: u64,
}

impl CollaboratorClient {
    pub fn new(name: &'static str, config: &CollaboratorConfig) -> Result<Self, CollaboratorError> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|e| {
            CollaboratorError::InvalidBaseUrl {
                name,
                reason: e.to_string(),
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CollaboratorError::InvalidBaseUrl {
                name,
                reason: "URL cannot carry a path".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            name,
            client,
            base_url,
            api_token: config.api_token.clone(),
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Appends percent-encoded path segments to the base URL.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, DomainError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DomainError::Upstream(format!("{} base URL has no path", self.name)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, DomainError> {
        let url = self.url(segments)?;
        self.send(self.client.get(url)).await
    }

    pub async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, DomainError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(segments)?;
        self.send(self.client.post(url).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DomainError> {
        let request = if self.api_token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.api_token)
        };

        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DomainError::Upstream(format!(
                    "{} timed out after {}ms",
                    self.name, self.timeout_ms
                ))
            } else {
                DomainError::Upstream(format!("{} request failed: {}", self.name, e))
            }
        })?;

        let status = response.status();
        debug!(
            collaborator = self.name,
            status = %status,
            duration_ms = start.elapsed().as_millis() as u64,
            "Collaborator responded"
        );

        if status == StatusCode::NOT_FOUND {
            return Err(DomainError::NotFound(format!(
                "{} resource not found",
                self.name
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(collaborator = self.name, status = %status, "Collaborator returned an error");
            return Err(DomainError::Upstream(format!(
                "{} returned HTTP {}: {}",
                self.name, status, body
            )));
        }

        response.json::<T>().await.map_err(|e| {
            DomainError::Upstream(format!("Invalid response from {}: {}", self.name, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> CollaboratorConfig {
        CollaboratorConfig {
            base_url: base_url.to_string(),
            api_token: "token".to_string(),
            timeout_ms: 500,
        }
    }

    #[test]
    fn test_url_encodes_segments() {
        let client =
            CollaboratorClient::new("catalog", &config("https://catalog.test/api/")).unwrap();
        let url = client
            .url(&["shops", "demo.myshopify.com", "products", "gid://shopify/Product/1"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            concat!(
                "https://catalog.test/api/shops/demo.myshopify.com",
                "/products/gid:%2F%2Fshopify%2FProduct%2F1"
            )
        );
    }

    #[test]
    fn test_url_without_trailing_slash() {
        let client =
            CollaboratorClient::new("reports", &config("https://reports.test/v1")).unwrap();
        let url = client.url(&["reports"]).unwrap();
        assert_eq!(url.as_str(), "https://reports.test/v1/reports");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = CollaboratorClient::new("ai", &config("not a url")).unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidBaseUrl { name: "ai", .. }));

        let err = CollaboratorClient::new("ai", &config("mailto:ops@example.com")).unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidBaseUrl { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_collaborator_is_upstream_error() {
        let client = CollaboratorClient::new("catalog", &config("http://127.0.0.1:9")).unwrap();
        let err = client
            .get_json::<serde_json::Value>(&["health"])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
    }
}
