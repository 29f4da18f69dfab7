//! Billing events.
//!
//! A `BillingEvent` is a verified notification from the billing provider,
//! already reduced to the fields the reconciler needs. The gateway adapter
//! owns the translation from the provider's wire format; the finite set of
//! variants here keeps event dispatch exhaustive at compile time.

use super::Plan;

/// A verified billing-provider notification.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    /// A checkout session finished successfully. The sole activation path.
    ///
    /// `user_id` and `plan` come from the metadata attached when the
    /// checkout session was created; either may be absent if the session
    /// was created without them.
    CheckoutCompleted {
        user_id: Option<String>,
        plan: Option<Plan>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },

    /// The subscription was canceled and has ended.
    ///
    /// `user_id` is read from the subscription's own metadata; checkout
    /// metadata is long gone by the time this fires.
    SubscriptionCanceled {
        user_id: Option<String>,
        subscription_id: String,
    },

    /// A renewal invoice failed to collect.
    InvoicePaymentFailed {
        user_id: Option<String>,
        subscription_id: Option<String>,
        invoice_id: String,
    },

    /// A verified event of a kind this service does not act on.
    Unhandled { event_type: String },
}

impl BillingEvent {
    /// The provider-side kind string, for logging.
    pub fn kind(&self) -> &str {
        match self {
            BillingEvent::CheckoutCompleted { .. } => "checkout.session.completed",
            BillingEvent::SubscriptionCanceled { .. } => "customer.subscription.deleted",
            BillingEvent::InvoicePaymentFailed { .. } => "invoice.payment_failed",
            BillingEvent::Unhandled { event_type } => event_type,
        }
    }
}
