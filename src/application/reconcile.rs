//! Event reconciliation.
//!
//! Maps one verified [`BillingEvent`] to zero-or-one entitlement upsert,
//! with best-effort backfill of missing identifiers via the billing
//! gateway.
//!
//! ## Failure boundaries
//!
//! Gateway calls here are optional enrichment steps: each is wrapped in its
//! own failure boundary and a failure degrades the resulting record (missing
//! customer id, unresolved user) without aborting the transition for fields
//! that were resolvable. Only a store write failure surfaces as an error,
//! and the webhook endpoint still acknowledges receipt after logging it.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::entitlement::{BillingEvent, EntitlementRecord, Plan};
use crate::ports::{BillingGateway, EntitlementStore, StoreError};

/// Why an event was acknowledged without a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Checkout event lacked the `{userId, plan}` metadata pair.
    MissingMetadata,
    /// No user id could be resolved for a lifecycle event.
    UnresolvableUser,
    /// Verified event of a kind this service does not act on.
    UnhandledEvent,
}

/// Result of reconciling one event.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// A paid plan was activated for the user.
    Activated { user_id: String, plan: Plan },
    /// The user was reverted to the freemium default.
    Deactivated { user_id: String },
    /// Acknowledged, no store mutation.
    Ignored(IgnoreReason),
}

/// Errors that abort a reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Applies billing events to the entitlement store.
pub struct EventReconciler {
    store: Arc<dyn EntitlementStore>,
    gateway: Arc<dyn BillingGateway>,
}

impl EventReconciler {
    pub fn new(store: Arc<dyn EntitlementStore>, gateway: Arc<dyn BillingGateway>) -> Self {
        Self { store, gateway }
    }

    /// Apply the correct state transition for one verified event.
    ///
    /// Idempotent per event: the upsert is a whole-record overwrite, so
    /// re-delivery of the same event converges on the same record.
    pub async fn reconcile(
        &self,
        event: BillingEvent,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match event {
            BillingEvent::CheckoutCompleted {
                user_id,
                plan,
                customer_id,
                subscription_id,
            } => {
                self.apply_checkout_completed(user_id, plan, customer_id, subscription_id)
                    .await
            }
            BillingEvent::SubscriptionCanceled {
                user_id,
                subscription_id,
            } => self.apply_subscription_canceled(user_id, &subscription_id).await,
            BillingEvent::InvoicePaymentFailed {
                user_id,
                subscription_id,
                invoice_id,
            } => {
                self.apply_invoice_payment_failed(user_id, subscription_id.as_deref(), &invoice_id)
                    .await
            }
            BillingEvent::Unhandled { event_type } => {
                tracing::debug!(event_type, "acknowledged unhandled event kind");
                Ok(ReconcileOutcome::Ignored(IgnoreReason::UnhandledEvent))
            }
        }
    }

    async fn apply_checkout_completed(
        &self,
        user_id: Option<String>,
        plan: Option<Plan>,
        mut customer_id: Option<String>,
        subscription_id: Option<String>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        // Checkout sessions do not always carry the customer id; recover it
        // from the subscription when one was created.
        if customer_id.is_none() {
            if let Some(sub_id) = subscription_id.as_deref() {
                match self.gateway.fetch_subscription(sub_id).await {
                    Ok(subscription) => customer_id = subscription.customer_id,
                    Err(error) => tracing::warn!(
                        subscription_id = sub_id,
                        %error,
                        "customer id backfill failed, proceeding without it"
                    ),
                }
            }
        }

        // Copy {userId, plan} onto the subscription itself. Cancellation and
        // payment-failure events arrive on provider-originated objects that
        // only carry metadata if it was written here.
        if let Some(sub_id) = subscription_id.as_deref() {
            if user_id.is_some() || plan.is_some() {
                if let Err(error) = self
                    .gateway
                    .update_subscription_metadata(sub_id, user_id.as_deref(), plan)
                    .await
                {
                    tracing::warn!(
                        subscription_id = sub_id,
                        %error,
                        "failed to persist metadata onto subscription"
                    );
                }
            }
        }

        let (user_id, plan) = match (user_id, plan) {
            (Some(user_id), Some(plan)) if plan.is_paid() => (user_id, plan),
            (user_id, plan) => {
                tracing::warn!(
                    user_id = user_id.as_deref(),
                    plan = plan.map(|p| p.as_str()),
                    "checkout completed without usable metadata, no transition applied"
                );
                return Ok(ReconcileOutcome::Ignored(IgnoreReason::MissingMetadata));
            }
        };

        self.store
            .upsert(&user_id, EntitlementRecord::activated(plan, customer_id))
            .await?;
        tracing::info!(%user_id, plan = plan.as_str(), "entitlement activated");
        Ok(ReconcileOutcome::Activated { user_id, plan })
    }

    async fn apply_subscription_canceled(
        &self,
        user_id: Option<String>,
        subscription_id: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(user_id) = user_id else {
            tracing::warn!(
                subscription_id,
                "canceled subscription carries no userId metadata"
            );
            return Ok(ReconcileOutcome::Ignored(IgnoreReason::UnresolvableUser));
        };

        self.deactivate(user_id).await
    }

    async fn apply_invoice_payment_failed(
        &self,
        mut user_id: Option<String>,
        subscription_id: Option<&str>,
        invoice_id: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        // Invoices rarely carry metadata directly; fall back to the
        // subscription's copy written at activation time.
        if user_id.is_none() {
            if let Some(sub_id) = subscription_id {
                match self.gateway.fetch_subscription(sub_id).await {
                    Ok(subscription) => user_id = subscription.user_id,
                    Err(error) => tracing::warn!(
                        subscription_id = sub_id,
                        %error,
                        "user id backfill failed"
                    ),
                }
            }
        }

        let Some(user_id) = user_id else {
            tracing::warn!(invoice_id, "failed invoice could not be resolved to a user");
            return Ok(ReconcileOutcome::Ignored(IgnoreReason::UnresolvableUser));
        };

        tracing::info!(%user_id, invoice_id, "renewal payment failed");
        self.deactivate(user_id).await
    }

    async fn deactivate(&self, user_id: String) -> Result<ReconcileOutcome, ReconcileError> {
        self.store
            .upsert(&user_id, EntitlementRecord::freemium())
            .await?;
        tracing::info!(%user_id, "entitlement reverted to freemium");
        Ok(ReconcileOutcome::Deactivated { user_id })
    }
}
