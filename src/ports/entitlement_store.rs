//! Entitlement store port.
//!
//! Durable keyed storage of entitlement records, addressed by user id.
//! The contract is get/upsert with last-write-wins semantics: concurrent
//! writes to different keys are independent, concurrent writes to the same
//! key race with no ordering token.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entitlement::EntitlementRecord;

/// Errors from the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database operation failed.
    #[error("database error: {0}")]
    Database(String),
}

/// Port for entitlement-record persistence.
///
/// Writes are whole-record replacements; the reconciler always supplies a
/// fully-specified record, so implementations never merge field-by-field.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Fetch the record for a user, or `None` if the user has never been
    /// activated. Callers treat `None` as the default freemium record.
    async fn get(&self, user_id: &str) -> Result<Option<EntitlementRecord>, StoreError>;

    /// Insert or replace the record for a user.
    async fn upsert(&self, user_id: &str, record: EntitlementRecord) -> Result<(), StoreError>;
}
