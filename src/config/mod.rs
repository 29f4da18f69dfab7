//! Application configuration module.
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `PAYSTATE` prefix and nested values use `__` as separator.
//!
//! # Example
//!
//! ```no_run
//! use paystate::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod error;
mod payment;
mod server;
mod store;

pub use error::{ConfigError, ValidationError};
pub use payment::{BillingMode, ModeKeys, PaymentConfig};
pub use server::{Environment, ServerConfig};
pub use store::StoreConfig;

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment).
    #[serde(default)]
    pub server: ServerConfig,

    /// Payment configuration (provider mode, keys, price table).
    pub payment: PaymentConfig,

    /// Entitlement store configuration (PostgreSQL connection).
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// 1. Loads `.env` if present (for development)
    /// 2. Reads environment variables with the `PAYSTATE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `PAYSTATE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PAYSTATE__PAYMENT__MODE=live` -> `payment.mode = live`
    /// - `PAYSTATE__PAYMENT__TEST__SECRET_KEY=sk_test_...`
    /// - `PAYSTATE__STORE__URL=postgres://...`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYSTATE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    ///
    /// Missing required credentials abort startup; nothing falls back to a
    /// default secret.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.payment.validate()?;
        self.store.validate()?;
        Ok(())
    }

    /// Check if running in production environment.
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
