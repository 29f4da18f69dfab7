//! Stripe gateway.
//!
//! Every operation is a direct pass-through to the Stripe REST API with no
//! retained state. Secrets are held as `secrecy::SecretString`; the HTTP
//! client carries an explicit request timeout.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::PaymentConfig;
use crate::domain::entitlement::{BillingEvent, Plan};
use crate::ports::{
    BillingGateway, CheckoutSession, GatewayError, PortalSession, SubscriptionInfo,
};

use super::signature::{self, SignatureHeader};
use super::wire::{
    self, CheckoutSessionResponse, PortalSessionResponse, SubscriptionObject, WebhookEnvelope,
    METADATA_PLAN, METADATA_USER_ID,
};

/// Outbound request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Price ids for the purchasable plans.
#[derive(Debug, Clone, Default)]
pub struct PriceIds {
    pub mini: String,
    pub base: String,
    pub pro: String,
}

impl PriceIds {
    fn for_plan(&self, plan: Plan) -> Option<&str> {
        let id = match plan {
            Plan::Freemium => return None,
            Plan::Mini => &self.mini,
            Plan::Base => &self.base,
            Plan::Pro => &self.pro,
        };
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }
}

/// Stripe gateway configuration.
#[derive(Clone)]
pub struct StripeGatewayConfig {
    /// Secret API key (sk_test_... or sk_live_...).
    secret_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for the Stripe API.
    api_base_url: String,

    /// Plan → price id table for the active mode.
    price_ids: PriceIds,

    /// Redirect target after a successful checkout.
    success_url: String,

    /// Redirect target after an abandoned checkout.
    cancel_url: String,
}

impl StripeGatewayConfig {
    /// Minimal configuration; enough for webhook verification. Session
    /// creation additionally needs price ids and redirect URLs.
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            price_ids: PriceIds::default(),
            success_url: String::new(),
            cancel_url: String::new(),
        }
    }

    /// Build the full configuration from the validated payment section,
    /// using the key set for the configured mode.
    pub fn from_payment_config(payment: &PaymentConfig) -> Result<Self, crate::config::ValidationError> {
        let keys = payment.active_keys()?;
        Ok(Self {
            secret_key: SecretString::new(keys.secret_key.clone()),
            webhook_secret: SecretString::new(keys.webhook_secret.clone()),
            api_base_url: "https://api.stripe.com".to_string(),
            price_ids: PriceIds {
                mini: keys.price_mini.clone(),
                base: keys.price_base.clone(),
                pro: keys.price_pro.clone(),
            },
            success_url: payment.success_url.clone(),
            cancel_url: payment.cancel_url.clone(),
        })
    }

    /// Point the gateway at a different API host (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the plan → price id table.
    pub fn with_price_ids(mut self, price_ids: PriceIds) -> Self {
        self.price_ids = price_ids;
        self
    }

    /// Set the checkout redirect URLs.
    pub fn with_redirect_urls(
        mut self,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        self.success_url = success_url.into();
        self.cancel_url = cancel_url.into();
        self
    }
}

/// Stripe implementation of the `BillingGateway` port.
pub struct StripeGateway {
    config: StripeGatewayConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeGatewayConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("client builder accepts a static timeout");
        Self {
            config,
            http_client,
        }
    }

    fn price_id(&self, plan: Plan) -> Result<&str, GatewayError> {
        self.config
            .price_ids
            .for_plan(plan)
            .ok_or_else(|| GatewayError::Provider(format!("no price configured for plan {}", plan)))
    }

    async fn post_form(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.secret_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Self::check_status(path, response).await
    }

    async fn check_status(
        path: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GatewayError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(path, %status, error = %error_text, "Stripe API call failed");
        Err(GatewayError::Provider(format!(
            "Stripe returned {}: {}",
            status, error_text
        )))
    }

    fn parse_error(e: impl std::fmt::Display) -> GatewayError {
        GatewayError::Provider(format!("failed to parse Stripe response: {}", e))
    }
}

#[async_trait]
impl BillingGateway for StripeGateway {
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<BillingEvent, GatewayError> {
        let header = SignatureHeader::parse(signature_header)?;
        signature::verify(
            self.config.webhook_secret.expose_secret(),
            payload,
            &header,
        )?;

        let envelope: WebhookEnvelope = serde_json::from_slice(payload)
            .map_err(|e| GatewayError::Parse(format!("invalid event payload: {}", e)))?;

        let event = wire::map_event(&envelope)?;
        tracing::info!(
            event_id = %envelope.id,
            event_type = %envelope.event_type,
            livemode = envelope.livemode,
            "webhook signature verified"
        );
        Ok(event)
    }

    async fn create_checkout_session(
        &self,
        plan: Plan,
        user_id: &str,
    ) -> Result<CheckoutSession, GatewayError> {
        let price_id = self.price_id(plan)?;

        // Metadata goes on the session and on subscription_data: the
        // completion event reads the former, later lifecycle events can
        // only see the latter.
        let session_user_key = format!("metadata[{}]", METADATA_USER_ID);
        let session_plan_key = format!("metadata[{}]", METADATA_PLAN);
        let sub_user_key = format!("subscription_data[metadata][{}]", METADATA_USER_ID);
        let sub_plan_key = format!("subscription_data[metadata][{}]", METADATA_PLAN);
        let params = [
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            (
                "success_url",
                format!("{}?plan={}&success=true", self.config.success_url, plan),
            ),
            ("cancel_url", self.config.cancel_url.clone()),
            (session_user_key.as_str(), user_id.to_string()),
            (session_plan_key.as_str(), plan.to_string()),
            (sub_user_key.as_str(), user_id.to_string()),
            (sub_plan_key.as_str(), plan.to_string()),
        ];

        let response = self.post_form("/v1/checkout/sessions", &params).await?;
        let session: CheckoutSessionResponse =
            response.json().await.map_err(Self::parse_error)?;

        let url = session
            .url
            .unwrap_or_else(|| format!("https://checkout.stripe.com/c/pay/{}", session.id));

        tracing::info!(session_id = %session.id, plan = %plan, "checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
    ) -> Result<PortalSession, GatewayError> {
        let params = [
            ("customer", customer_id.to_string()),
            ("return_url", self.config.success_url.clone()),
        ];

        let response = self.post_form("/v1/billing_portal/sessions", &params).await?;
        let portal: PortalSessionResponse = response.json().await.map_err(Self::parse_error)?;

        tracing::info!(session_id = %portal.id, customer_id, "portal session created");
        Ok(PortalSession {
            id: portal.id,
            url: portal.url,
        })
    }

    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionInfo, GatewayError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.secret_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        let response = Self::check_status("/v1/subscriptions", response).await?;

        let subscription: SubscriptionObject =
            response.json().await.map_err(Self::parse_error)?;

        Ok(SubscriptionInfo {
            user_id: subscription.metadata.get(METADATA_USER_ID).cloned(),
            plan: subscription
                .metadata
                .get(METADATA_PLAN)
                .and_then(|s| Plan::parse(s)),
            id: subscription.id,
            customer_id: subscription.customer,
        })
    }

    async fn update_subscription_metadata(
        &self,
        subscription_id: &str,
        user_id: Option<&str>,
        plan: Option<Plan>,
    ) -> Result<(), GatewayError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        let user_key = format!("metadata[{}]", METADATA_USER_ID);
        let plan_key = format!("metadata[{}]", METADATA_PLAN);
        if let Some(user_id) = user_id {
            params.push((&user_key, user_id.to_string()));
        }
        if let Some(plan) = plan {
            params.push((&plan_key, plan.to_string()));
        }

        let path = format!("/v1/subscriptions/{}", subscription_id);
        self.post_form(&path, &params).await?;
        tracing::debug!(subscription_id, "subscription metadata updated");
        Ok(())
    }
}
