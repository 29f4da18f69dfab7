//! Request and response DTOs for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entitlement::{EntitlementRecord, Plan};

/// Body of `POST /create-checkout-session`.
///
/// `plan` stays a string here so an unknown plan maps to a 400 with an
/// error body rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutSessionRequest {
    pub plan: String,
    pub user_id: String,
}

/// Body of `POST /stripe-portal`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSessionRequest {
    pub customer_id: String,
}

/// Response carrying a redirect URL for a created session.
#[derive(Debug, Serialize)]
pub struct SessionUrlResponse {
    pub url: String,
}

/// Response of `GET /user/:user_id/status`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusResponse {
    pub plan: Plan,
    pub active: bool,
    pub billing_customer_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<EntitlementRecord> for UserStatusResponse {
    fn from(record: EntitlementRecord) -> Self {
        Self {
            plan: record.plan,
            active: record.active,
            billing_customer_id: record.billing_customer_id,
            updated_at: record.updated_at,
        }
    }
}

/// Error body for 4xx/5xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
