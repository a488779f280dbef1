//! External collaborators: catalog data, report scoring, email and AI text.
//!
//! Each trait ships with a mock used in development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::billing::GenerateContentRequest;
use crate::models::product::ProductSnapshot;
use crate::models::scheduled_audit::{CatalogReport, ReportPeriod};
use crate::models::shop::Shop;

/// Source of current product data.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch_product_snapshot(
        &self,
        shop: &Shop,
        product_id: &str,
    ) -> Result<ProductSnapshot, DomainError>;
}

/// Checklist scoring service that produces catalog reports.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate_catalog_report(
        &self,
        shop_id: Uuid,
        period: ReportPeriod,
    ) -> Result<CatalogReport, DomainError>;
}

/// AI text-generation provider.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        shop_id: Uuid,
        request: &GenerateContentRequest,
    ) -> Result<String, DomainError>;
}

/// Drift alert email payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftAlert {
    pub drifts_detected: i32,
    pub products_audited: i32,
}

/// Result of a notification send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationResult {
    Sent,
    /// Sending failed. Callers log and move on.
    Failed(String),
    /// Nothing to send, e.g. no recipients.
    Skipped,
}

/// Outbound email delivery. Fire-and-forget from the caller's view.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_drift_alert(
        &self,
        shop: &Shop,
        recipients: &[String],
        alert: DriftAlert,
    ) -> NotificationResult;

    async fn send_report_email(
        &self,
        shop: &Shop,
        recipients: &[String],
        report_id: Uuid,
    ) -> NotificationResult;
}

/// Catalog client backed by a map of product id to snapshot.
#[derive(Debug, Clone, Default)]
pub struct MockCatalogClient {
    products: Arc<Mutex<HashMap<String, ProductSnapshot>>>,
}

impl MockCatalogClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_product(&self, product_id: &str, snapshot: ProductSnapshot) {
        self.products
            .lock()
            .await
            .insert(product_id.to_string(), snapshot);
    }
}

#[async_trait]
impl CatalogClient for MockCatalogClient {
    async fn fetch_product_snapshot(
        &self,
        shop: &Shop,
        product_id: &str,
    ) -> Result<ProductSnapshot, DomainError> {
        self.products
            .lock()
            .await
            .get(product_id)
            .cloned()
            .ok_or_else(|| {
                DomainError::Upstream(format!(
                    "Product {} not found in catalog for {}",
                    product_id, shop.domain
                ))
            })
    }
}

/// How the mock report generator behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockReportMode {
    /// Returns a report with the given drift count.
    Succeed { drifts_detected: i32 },
    Fail,
    /// Never completes.
    Hang,
}

/// Report generator with scripted behavior.
#[derive(Debug, Clone)]
pub struct MockReportGenerator {
    mode: Arc<Mutex<MockReportMode>>,
    calls: Arc<Mutex<Vec<(Uuid, ReportPeriod)>>>,
}

impl Default for MockReportGenerator {
    fn default() -> Self {
        Self::new(MockReportMode::Succeed { drifts_detected: 0 })
    }
}

impl MockReportGenerator {
    pub fn new(mode: MockReportMode) -> Self {
        Self {
            mode: Arc::new(Mutex::new(mode)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self::new(MockReportMode::Fail)
    }

    pub async fn set_mode(&self, mode: MockReportMode) {
        *self.mode.lock().await = mode;
    }

    /// Shop and period of every call made so far.
    pub async fn calls(&self) -> Vec<(Uuid, ReportPeriod)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ReportGenerator for MockReportGenerator {
    async fn generate_catalog_report(
        &self,
        shop_id: Uuid,
        period: ReportPeriod,
    ) -> Result<CatalogReport, DomainError> {
        self.calls.lock().await.push((shop_id, period));
        let mode = *self.mode.lock().await;
        match mode {
            MockReportMode::Succeed { drifts_detected } => Ok(CatalogReport {
                id: Uuid::new_v4(),
                total_products: 10,
                ready_products: 7,
                average_score: 82.5,
                drifts_detected,
            }),
            MockReportMode::Fail => Err(DomainError::Upstream(
                "Simulated report failure".to_string(),
            )),
            MockReportMode::Hang => {
                std::future::pending::<()>().await;
                Err(DomainError::Upstream("unreachable".to_string()))
            }
        }
    }
}

/// A notification recorded by [`MockNotificationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentNotification {
    DriftAlert {
        shop_id: Uuid,
        recipients: Vec<String>,
        alert: DriftAlert,
    },
    ReportEmail {
        shop_id: Uuid,
        recipients: Vec<String>,
        report_id: Uuid,
    },
}

/// Mock notification service for development and testing.
///
/// Logs notifications and records them instead of sending.
#[derive(Debug, Clone, Default)]
pub struct MockNotificationService {
    pub simulate_failure: bool,
    sent: Arc<Mutex<Vec<SentNotification>>>,
}

impl MockNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Default::default()
        }
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationService for MockNotificationService {
    async fn send_drift_alert(
        &self,
        shop: &Shop,
        recipients: &[String],
        alert: DriftAlert,
    ) -> NotificationResult {
        if recipients.is_empty() {
            return NotificationResult::Skipped;
        }
        if self.simulate_failure {
            tracing::warn!(shop_id = %shop.id, "Mock notification service simulating failure");
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            shop_id = %shop.id,
            drifts_detected = alert.drifts_detected,
            recipients = recipients.len(),
            "Mock: Would send drift alert"
        );
        self.sent.lock().await.push(SentNotification::DriftAlert {
            shop_id: shop.id,
            recipients: recipients.to_vec(),
            alert,
        });
        NotificationResult::Sent
    }

    async fn send_report_email(
        &self,
        shop: &Shop,
        recipients: &[String],
        report_id: Uuid,
    ) -> NotificationResult {
        if recipients.is_empty() {
            return NotificationResult::Skipped;
        }
        if self.simulate_failure {
            tracing::warn!(shop_id = %shop.id, "Mock notification service simulating failure");
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            shop_id = %shop.id,
            report_id = %report_id,
            "Mock: Would send report email"
        );
        self.sent.lock().await.push(SentNotification::ReportEmail {
            shop_id: shop.id,
            recipients: recipients.to_vec(),
            report_id,
        });
        NotificationResult::Sent
    }
}

/// Text generator that echoes the request or fails on demand.
#[derive(Debug, Clone, Default)]
pub struct MockTextGenerator {
    pub simulate_failure: bool,
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
        }
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(
        &self,
        _shop_id: Uuid,
        request: &GenerateContentRequest,
    ) -> Result<String, DomainError> {
        if self.simulate_failure {
            return Err(DomainError::Upstream("Simulated generation failure".to_string()));
        }
        Ok(format!("Generated {} for {}", request.field, request.product_id))
    }
}
