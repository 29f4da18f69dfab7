//! Ports - interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between the
//! reconciliation core and the outside world. Adapters in `crate::adapters`
//! provide the concrete implementations.

mod billing_gateway;
mod entitlement_store;

pub use billing_gateway::{
    BillingGateway, CheckoutSession, GatewayError, PortalSession, SubscriptionInfo,
};
pub use entitlement_store::{EntitlementStore, StoreError};
