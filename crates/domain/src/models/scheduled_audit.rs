//! Scheduled audit domain model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::shop::Shop;

/// How often a recurring audit runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl AuditFrequency {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditFrequency::Daily => "daily",
            AuditFrequency::Weekly => "weekly",
            AuditFrequency::Monthly => "monthly",
        }
    }

    /// Parses from database string representation.
    ///
    /// Unrecognized values are treated as weekly.
    pub fn parse_or_weekly(s: &str) -> Self {
        match s {
            "daily" => AuditFrequency::Daily,
            "monthly" => AuditFrequency::Monthly,
            _ => AuditFrequency::Weekly,
        }
    }

    /// Next run time after a run at `from`.
    ///
    /// Monthly advancement clamps to the end of shorter months.
    pub fn advance(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            AuditFrequency::Daily => from + Duration::days(1),
            AuditFrequency::Weekly => from + Duration::days(7),
            AuditFrequency::Monthly => shared::time::add_months(from, 1),
        }
    }

    /// Report period requested from the scoring collaborator.
    pub fn report_period(&self) -> ReportPeriod {
        match self {
            AuditFrequency::Monthly => ReportPeriod::Monthly,
            AuditFrequency::Daily | AuditFrequency::Weekly => ReportPeriod::Weekly,
        }
    }
}

/// Outcome of the last run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
    Partial,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(RunStatus::Success),
            "failed" => Some(RunStatus::Failed),
            "partial" => Some(RunStatus::Partial),
            _ => None,
        }
    }
}

/// Report period understood by the scoring collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Weekly => "weekly",
            ReportPeriod::Monthly => "monthly",
        }
    }
}

/// Which emails a schedule sends after a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPreferences {
    pub drift_alerts: bool,
    pub report_emails: bool,
    #[validate(custom(function = "validate_recipient_list"))]
    pub recipients: Vec<String>,
}

fn validate_recipient_list(recipients: &[String]) -> Result<(), validator::ValidationError> {
    shared::validation::validate_recipients(recipients)
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            drift_alerts: true,
            report_emails: false,
            recipients: Vec::new(),
        }
    }
}

/// A shop's recurring audit schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledAudit {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub frequency: AuditFrequency,
    pub hour: i32,
    pub day_of_week: Option<i32>,
    pub day_of_month: Option<i32>,
    pub is_enabled: bool,
    pub notification_preferences: NotificationPreferences,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_status: Option<RunStatus>,
    pub last_run_product_count: Option<i32>,
    pub last_run_drift_count: Option<i32>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledAudit {
    /// Whether the stored timing fields match the given settings.
    pub fn same_timing(&self, settings: &ScheduleSettings) -> bool {
        self.frequency == settings.frequency
            && self.hour == settings.hour
            && self.day_of_week == settings.day_of_week
            && self.day_of_month == settings.day_of_month
    }
}

/// Validated schedule settings, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSettings {
    pub frequency: AuditFrequency,
    pub hour: i32,
    pub day_of_week: Option<i32>,
    pub day_of_month: Option<i32>,
    pub is_enabled: bool,
    pub notification_preferences: NotificationPreferences,
}

fn default_enabled() -> bool {
    true
}

/// Request payload for creating or updating a schedule.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertScheduleRequest {
    pub frequency: AuditFrequency,

    #[validate(custom(function = "shared::validation::validate_hour"))]
    pub hour: i32,

    #[validate(custom(function = "shared::validation::validate_day_of_week"))]
    pub day_of_week: Option<i32>,

    #[validate(custom(function = "shared::validation::validate_day_of_month"))]
    pub day_of_month: Option<i32>,

    #[serde(default = "default_enabled")]
    pub is_enabled: bool,

    #[serde(default)]
    #[validate(nested)]
    pub notification_preferences: NotificationPreferences,
}

impl From<UpsertScheduleRequest> for ScheduleSettings {
    /// Keeps only the day field relevant to the frequency, defaulting it to 1
    /// (Monday for weekly, the 1st for monthly).
    fn from(r: UpsertScheduleRequest) -> Self {
        let (day_of_week, day_of_month) = match r.frequency {
            AuditFrequency::Daily => (None, None),
            AuditFrequency::Weekly => (Some(r.day_of_week.unwrap_or(1)), None),
            AuditFrequency::Monthly => (None, Some(r.day_of_month.unwrap_or(1))),
        };
        Self {
            frequency: r.frequency,
            hour: r.hour,
            day_of_week,
            day_of_month,
            is_enabled: r.is_enabled,
            notification_preferences: r.notification_preferences,
        }
    }
}

/// Successful run bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSuccess {
    pub ran_at: DateTime<Utc>,
    pub product_count: i32,
    pub drift_count: i32,
    pub next_run_at: DateTime<Utc>,
}

/// Report produced by the scoring collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogReport {
    pub id: Uuid,
    pub total_products: i32,
    pub ready_products: i32,
    pub average_score: f64,
    pub drifts_detected: i32,
}

/// A due schedule joined with its shop.
#[derive(Debug, Clone, PartialEq)]
pub struct DueAudit {
    pub audit: ScheduledAudit,
    pub shop: Shop,
}

/// Result of one scheduled run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRunResult {
    pub scheduled_audit_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_domain: Option<String>,
    pub success: bool,
    pub products_audited: i32,
    pub drifts_detected: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub notification_preferences: Option<NotificationPreferences>,
    #[serde(skip)]
    pub shop: Option<Shop>,
}

impl AuditRunResult {
    /// A failure that happened before any state was touched.
    pub fn skipped(scheduled_audit_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            scheduled_audit_id,
            shop_id: None,
            shop_domain: None,
            success: false,
            products_audited: 0,
            drifts_detected: 0,
            report_id: None,
            next_run_at: None,
            error: Some(error.into()),
            notification_preferences: None,
            shop: None,
        }
    }

    /// Recipients for follow-up emails: explicit recipients, else the shop owner.
    pub fn recipients(&self) -> Vec<String> {
        match &self.notification_preferences {
            Some(prefs) if !prefs.recipients.is_empty() => prefs.recipients.clone(),
            _ => self
                .shop
                .as_ref()
                .and_then(|shop| shop.email.clone())
                .into_iter()
                .collect(),
        }
    }
}

/// Aggregate of a run-all pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAllSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<AuditRunResult>,
}

impl RunAllSummary {
    pub fn from_results(results: Vec<AuditRunResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            processed: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}
