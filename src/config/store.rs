//! Store configuration.

use serde::Deserialize;

use super::error::ValidationError;

/// Entitlement store configuration (PostgreSQL).
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// PostgreSQL connection URL.
    pub url: String,

    /// Maximum pool connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl StoreConfig {
    /// Validate store configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("store.url"));
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.max_connections == 0 || self.max_connections > 100 {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        Ok(())
    }
}

fn default_max_connections() -> u32 {
    5
}
