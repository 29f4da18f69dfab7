//! Paystate - payment-state synchronization service.
//!
//! Receives subscription-billing webhooks, reconciles them into durable
//! per-user entitlement records, and exposes the records through a small
//! query/command API.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
