//! Shop identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A merchant shop. Everything in the compliance core is scoped to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: Uuid,
    /// Catalog domain, e.g. `my-store.myshopify.com`.
    pub domain: String,
    /// Owner contact address used when a schedule has no recipients.
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}
