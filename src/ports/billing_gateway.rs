//! Billing gateway port.
//!
//! Thin capability wrapper over the external billing provider. Every
//! operation is a direct pass-through with no retained state: the gateway
//! verifies inbound webhooks and issues the handful of outbound calls the
//! service needs (session creation, subscription lookup, metadata update).

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entitlement::{BillingEvent, Plan};

/// Errors from billing-provider operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Webhook signature did not match the shared secret.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the accepted window.
    #[error("webhook timestamp too old")]
    TimestampExpired,

    /// Webhook timestamp is in the future beyond clock-skew tolerance.
    #[error("webhook timestamp in the future")]
    TimestampInFuture,

    /// Signature header or payload could not be parsed.
    #[error("malformed webhook: {0}")]
    Parse(String),

    /// Network-level failure reaching the provider.
    #[error("network error: {0}")]
    Network(String),

    /// The provider returned an error response.
    #[error("provider error: {0}")]
    Provider(String),
}

impl GatewayError {
    /// True for the verification failures that reject a webhook outright.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::InvalidSignature
                | GatewayError::TimestampExpired
                | GatewayError::TimestampInFuture
                | GatewayError::Parse(_)
        )
    }
}

/// A checkout session the user is redirected to for payment.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// Provider's session id.
    pub id: String,
    /// URL the customer completes checkout at.
    pub url: String,
}

/// A billing-portal session for self-serve subscription management.
#[derive(Debug, Clone)]
pub struct PortalSession {
    /// Provider's session id.
    pub id: String,
    /// URL the customer manages their subscription at.
    pub url: String,
}

/// The slice of a provider subscription the reconciler cares about.
///
/// `user_id` and `plan` are read from the subscription's metadata and are
/// only present if they were copied there at activation time.
#[derive(Debug, Clone)]
pub struct SubscriptionInfo {
    pub id: String,
    pub customer_id: Option<String>,
    pub user_id: Option<String>,
    pub plan: Option<Plan>,
}

/// Port for the external billing provider.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Verify an inbound webhook against the signing secret and translate
    /// it into a [`BillingEvent`].
    ///
    /// `payload` must be the unparsed raw request bytes; parsing before
    /// verification invalidates the signature.
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<BillingEvent, GatewayError>;

    /// Create a subscription checkout session for a paid plan, attaching
    /// `{userId, plan}` metadata so the completion event can be resolved.
    async fn create_checkout_session(
        &self,
        plan: Plan,
        user_id: &str,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Create a billing-portal session for an existing customer.
    async fn create_portal_session(
        &self,
        customer_id: &str,
    ) -> Result<PortalSession, GatewayError>;

    /// Fetch a subscription by id, including any `{userId, plan}` metadata.
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionInfo, GatewayError>;

    /// Persist `{userId, plan}` onto a subscription's metadata so later
    /// lifecycle events can recover the user without checkout context.
    async fn update_subscription_metadata(
        &self,
        subscription_id: &str,
        user_id: Option<&str>,
        plan: Option<Plan>,
    ) -> Result<(), GatewayError>;
}
