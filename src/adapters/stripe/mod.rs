//! Stripe billing-gateway adapter.
//!
//! Implements the `BillingGateway` port over the Stripe REST API, including
//! webhook signature verification (HMAC-SHA256, constant-time comparison,
//! replay window) and the outbound session/subscription calls.

mod gateway;
mod signature;
mod wire;

pub use gateway::{PriceIds, StripeGateway, StripeGatewayConfig};
