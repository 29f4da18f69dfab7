//! Stripe wire types.
//!
//! The Stripe objects as they arrive in webhook payloads and API responses,
//! reduced to the fields this service reads, plus the mapping from the
//! webhook envelope to the domain [`BillingEvent`].

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::entitlement::{BillingEvent, Plan};
use crate::ports::GatewayError;

/// Metadata key carrying the application user id.
pub(crate) const METADATA_USER_ID: &str = "userId";

/// Metadata key carrying the purchased plan name.
pub(crate) const METADATA_PLAN: &str = "plan";

/// Raw webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WebhookEnvelope {
    /// Unique event identifier (evt_...).
    pub id: String,

    /// Event kind, e.g. "checkout.session.completed".
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event payload containing the affected object.
    pub data: EventData,

    /// Whether this is a live-mode event.
    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EventData {
    /// The object that triggered the event; shape depends on the kind.
    pub object: serde_json::Value,
}

/// Checkout session as delivered in `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CheckoutSessionObject {
    pub id: String,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Subscription object, both from webhooks and the fetch API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubscriptionObject {
    pub id: String,
    pub customer: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Invoice object as delivered in `invoice.payment_failed`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InvoiceObject {
    pub id: String,
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Checkout-session creation API response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CheckoutSessionResponse {
    pub id: String,
    pub url: Option<String>,
}

/// Billing-portal session creation API response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PortalSessionResponse {
    pub id: String,
    pub url: String,
}

fn metadata_user_id(metadata: &HashMap<String, String>) -> Option<String> {
    metadata.get(METADATA_USER_ID).cloned()
}

fn metadata_plan(metadata: &HashMap<String, String>) -> Option<Plan> {
    metadata.get(METADATA_PLAN).and_then(|s| Plan::parse(s))
}

/// Map a verified envelope to the domain event.
///
/// Kinds outside the handled set become `BillingEvent::Unhandled`; a payload
/// whose object does not match the expected shape for its kind is a parse
/// error, not an ignored event.
pub(crate) fn map_event(envelope: &WebhookEnvelope) -> Result<BillingEvent, GatewayError> {
    match envelope.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSessionObject =
                serde_json::from_value(envelope.data.object.clone()).map_err(|e| {
                    GatewayError::Parse(format!("invalid checkout session: {}", e))
                })?;
            tracing::debug!(
                session_id = %session.id,
                customer = session.customer.as_deref(),
                subscription = session.subscription.as_deref(),
                "mapping completed checkout session"
            );
            Ok(BillingEvent::CheckoutCompleted {
                user_id: metadata_user_id(&session.metadata),
                plan: metadata_plan(&session.metadata),
                customer_id: session.customer,
                subscription_id: session.subscription,
            })
        }

        "customer.subscription.deleted" => {
            let subscription: SubscriptionObject =
                serde_json::from_value(envelope.data.object.clone())
                    .map_err(|e| GatewayError::Parse(format!("invalid subscription: {}", e)))?;
            Ok(BillingEvent::SubscriptionCanceled {
                user_id: metadata_user_id(&subscription.metadata),
                subscription_id: subscription.id,
            })
        }

        "invoice.payment_failed" => {
            let invoice: InvoiceObject = serde_json::from_value(envelope.data.object.clone())
                .map_err(|e| GatewayError::Parse(format!("invalid invoice: {}", e)))?;
            Ok(BillingEvent::InvoicePaymentFailed {
                user_id: metadata_user_id(&invoice.metadata),
                subscription_id: invoice.subscription,
                invoice_id: invoice.id,
            })
        }

        other => Ok(BillingEvent::Unhandled {
            event_type: other.to_string(),
        }),
    }
}
