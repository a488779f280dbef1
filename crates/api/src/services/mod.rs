//! External service integrations.

pub mod ai;
pub mod catalog;
pub mod collaborator;
pub mod email;
pub mod reports;

use std::sync::Arc;

use domain::ports::{
    CatalogClient, MockCatalogClient, MockReportGenerator, MockTextGenerator, NotificationService,
    ReportGenerator, TextGenerator,
};
use tracing::warn;

pub use ai::HttpTextGenerator;
pub use catalog::HttpCatalogClient;
pub use collaborator::{CollaboratorClient, CollaboratorError};
pub use email::EmailService;
pub use reports::HttpReportGenerator;

use crate::config::{CollaboratorConfig, Config};

/// The outbound collaborators the services depend on.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogClient>,
    pub reports: Arc<dyn ReportGenerator>,
    pub text_generator: Arc<dyn TextGenerator>,
    pub notifications: Arc<dyn NotificationService>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Builds HTTP clients for configured endpoints. Unconfigured ones fall back to mocks.
    pub fn from_config(config: &Config) -> Result<Self, CollaboratorError> {
        let catalog: Arc<dyn CatalogClient> = match http_client("catalog", &config.catalog)? {
            Some(http) => Arc::new(HttpCatalogClient::new(http)),
            None => Arc::new(MockCatalogClient::new()),
        };
        let reports: Arc<dyn ReportGenerator> = match http_client("reports", &config.reports)? {
            Some(http) => Arc::new(HttpReportGenerator::new(http)),
            None => Arc::new(MockReportGenerator::default()),
        };
        let text_generator: Arc<dyn TextGenerator> = match http_client("ai", &config.ai)? {
            Some(http) => Arc::new(HttpTextGenerator::new(http)),
            None => Arc::new(MockTextGenerator::new()),
        };

        Ok(Self {
            catalog,
            reports,
            text_generator,
            notifications: Arc::new(EmailService::new(config.email.clone())),
        })
    }
}

fn http_client(
    name: &'static str,
    config: &CollaboratorConfig,
) -> Result<Option<CollaboratorClient>, CollaboratorError> {
    if !config.is_configured() {
        warn!(collaborator = name, "No base URL configured, using mock collaborator");
        return Ok(None);
    }
    CollaboratorClient::new(name, config).map(Some)
}
