//! Catalog collaborator: current product content for a shop.

use async_trait::async_trait;
use domain::error::DomainError;
use domain::models::{ProductSnapshot, Shop};
use domain::ports::CatalogClient;

use super::collaborator::CollaboratorClient;

/// Fetches `GET {base}/shops/{domain}/products/{productId}`.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    http: CollaboratorClient,
}

impl HttpCatalogClient {
    pub fn new(http: CollaboratorClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch_product_snapshot(
        &self,
        shop: &Shop,
        product_id: &str,
    ) -> Result<ProductSnapshot, DomainError> {
        self.http
            .get_json(&["shops", &shop.domain, "products", product_id])
            .await
            .map_err(|e| match e {
                DomainError::NotFound(_) => DomainError::Upstream(format!(
                    "Product {} not found in catalog for {}",
                    product_id, shop.domain
                )),
                other => other,
            })
    }
}
