//! In-memory implementation of the entitlement store.
//!
//! Backs the HTTP integration tests and local development without a
//! database. Not suitable for production: nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entitlement::EntitlementRecord;
use crate::ports::{EntitlementStore, StoreError};

/// Entitlement store backed by a process-local map.
#[derive(Default)]
pub struct InMemoryEntitlementStore {
    records: RwLock<HashMap<String, EntitlementRecord>>,
}

impl InMemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True if no record has been written yet.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl EntitlementStore for InMemoryEntitlementStore {
    async fn get(&self, user_id: &str) -> Result<Option<EntitlementRecord>, StoreError> {
        Ok(self.records.read().await.get(user_id).cloned())
    }

    async fn upsert(&self, user_id: &str, record: EntitlementRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(user_id.to_string(), record);
        Ok(())
    }
}
