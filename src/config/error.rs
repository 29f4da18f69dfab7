//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("invalid port number")]
    InvalidPort,

    #[error("invalid request timeout")]
    InvalidTimeout,

    #[error("invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("invalid billing secret key format")]
    InvalidSecretKey,

    #[error("invalid webhook secret format")]
    InvalidWebhookSecret,

    #[error("missing price id for plan: {0}")]
    MissingPriceId(&'static str),

    #[error("missing redirect URL: {0}")]
    MissingRedirectUrl(&'static str),
}
