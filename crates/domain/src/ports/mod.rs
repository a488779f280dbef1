//! Boundaries between the compliance core and the outside world.
//!
//! Repository traits are implemented by the persistence crate; collaborator
//! traits by the api crate's HTTP and email clients.

pub mod collaborators;
pub mod memory;
pub mod repositories;

pub use collaborators::{
    CatalogClient, DriftAlert, MockCatalogClient, MockNotificationService, MockReportGenerator,
    MockReportMode, MockTextGenerator, NotificationResult, NotificationService, ReportGenerator,
    SentNotification, TextGenerator,
};
pub use memory::InMemoryStore;
pub use repositories::{
    BillingRepository, CatalogRuleRepository, DriftRepository, ScheduledAuditRepository,
    ShopRepository, SnapshotRepository,
};
