//! Report collaborator: runs the checklist scoring for a whole catalog.

use async_trait::async_trait;
use domain::error::DomainError;
use domain::models::scheduled_audit::{CatalogReport, ReportPeriod};
use domain::ports::ReportGenerator;
use serde::Serialize;
use uuid::Uuid;

use super::collaborator::CollaboratorClient;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequest<'a> {
    shop_id: Uuid,
    period: &'a str,
}

/// Posts to `{base}/reports` and returns the generated report summary.
#[derive(Debug, Clone)]
pub struct HttpReportGenerator {
    http: CollaboratorClient,
}

impl HttpReportGenerator {
    pub fn new(http: CollaboratorClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ReportGenerator for HttpReportGenerator {
    async fn generate_catalog_report(
        &self,
        shop_id: Uuid,
        period: ReportPeriod,
    ) -> Result<CatalogReport, DomainError> {
        let body = ReportRequest {
            shop_id,
            period: period.as_str(),
        };
        let report: CatalogReport = self.http.post_json(&["reports"], &body).await?;
        tracing::info!(
            shop_id = %shop_id,
            report_id = %report.id,
            total_products = report.total_products,
            "Catalog report generated"
        );
        Ok(report)
    }
}
