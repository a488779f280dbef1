//! Email service for drift alerts and scheduled report emails.
//!
//! Supports two providers:
//! - `console`: Logs emails to console (development)
//! - `sendgrid`: Uses SendGrid API

use std::sync::Arc;

use async_trait::async_trait;
use domain::models::Shop;
use domain::ports::{DriftAlert, NotificationResult, NotificationService};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::EmailConfig;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: Client,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send an email message.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        match self.config.provider.as_str() {
            "console" => self.send_console(message).await,
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    fn dashboard_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Builds the drift alert email.
    pub fn drift_alert_message(
        &self,
        shop: &Shop,
        recipients: &[String],
        alert: DriftAlert,
    ) -> EmailMessage {
        let url = self.dashboard_url("/drifts");
        let subject = format!(
            "{} compliance issue{} found on {}",
            alert.drifts_detected,
            if alert.drifts_detected == 1 { "" } else { "s" },
            shop.domain
        );

        let body_text = format!(
            r#"Hi,

Your scheduled catalog audit for {domain} checked {audited} products and found
{drifts} new compliance issue(s).

Review and resolve them here:

{url}

Best regards,
The Catalog Guard Team"#,
            domain = shop.domain,
            audited = alert.products_audited,
            drifts = alert.drifts_detected,
            url = url
        );

        let body_html = format!(
            r#"<!DOCTYPE html>
<html>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto,
    Helvetica, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px;
    margin: 0 auto; padding: 20px;">
    <h2 style="margin-top: 0;">Compliance issues found on {domain}</h2>
    <p>Your scheduled catalog audit checked <strong>{audited}</strong> products and found
    <strong>{drifts}</strong> new compliance issue(s).</p>
    <p><a href="{url}" style="background: #1f6feb; color: white; padding: 12px 24px;
        text-decoration: none; border-radius: 6px; display: inline-block;">Review issues</a></p>
</body>
</html>"#,
            domain = shop.domain,
            audited = alert.products_audited,
            drifts = alert.drifts_detected,
            url = url
        );

        EmailMessage {
            to: recipients.to_vec(),
            subject,
            body_text,
            body_html: Some(body_html),
        }
    }

    /// Builds the report-ready email.
    pub fn report_message(
        &self,
        shop: &Shop,
        recipients: &[String],
        report_id: Uuid,
    ) -> EmailMessage {
        let url = self.dashboard_url(&format!("/reports/{}", report_id));
        let subject = format!("Your catalog report for {} is ready", shop.domain);

        let body_text = format!(
            r#"Hi,

Your scheduled catalog report for {domain} is ready:

{url}

Best regards,
The Catalog Guard Team"#,
            domain = shop.domain,
            url = url
        );

        EmailMessage {
            to: recipients.to_vec(),
            subject,
            body_text,
            body_html: None,
        }
    }

    async fn deliver(&self, shop: &Shop, message: EmailMessage) -> NotificationResult {
        if message.to.is_empty() {
            return NotificationResult::Skipped;
        }
        if !self.config.enabled {
            debug!(
                shop_id = %shop.id,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return NotificationResult::Skipped;
        }

        match self.send(message).await {
            Ok(()) => NotificationResult::Sent,
            Err(e) => {
                error!(shop_id = %shop.id, error = %e, "Failed to send email");
                NotificationResult::Failed(e.to_string())
            }
        }
    }

    /// Console provider - logs email to console (for development).
    async fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = ?message.to,
            subject = %message.subject,
            from = %self.config.sender_email,
            from_name = %self.config.sender_name,
            "Email (console provider)"
        );
        debug!(body_text = %message.body_text, "Email body (plain text)");
        Ok(())
    }

    /// SendGrid provider - sends via SendGrid API.
    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let to: Vec<serde_json::Value> = message
            .to
            .iter()
            .map(|email| serde_json::json!({ "email": email }))
            .collect();

        let mut content = vec![serde_json::json!({
            "type": "text/plain",
            "value": message.body_text
        })];
        if let Some(html) = &message.body_html {
            content.push(serde_json::json!({
                "type": "text/html",
                "value": html
            }));
        }

        let body = serde_json::json!({
            "personalizations": [{ "to": to }],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name
            },
            "subject": message.subject,
            "content": content
        });

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(
                recipients = message.to.len(),
                subject = %message.subject,
                "Email sent via SendGrid"
            );
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

#[async_trait]
impl NotificationService for EmailService {
    async fn send_drift_alert(
        &self,
        shop: &Shop,
        recipients: &[String],
        alert: DriftAlert,
    ) -> NotificationResult {
        let message = self.drift_alert_message(shop, recipients, alert);
        self.deliver(shop, message).await
    }

    async fn send_report_email(
        &self,
        shop: &Shop,
        recipients: &[String],
        report_id: Uuid,
    ) -> NotificationResult {
        let message = self.report_message(shop, recipients, report_id);
        self.deliver(shop, message).await
    }
}
