//! PostgreSQL implementation of the entitlement store.
//!
//! One row per user id; writes are keyed upserts, so the last write wins
//! without any ordering token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entitlement::{EntitlementRecord, Plan};
use crate::ports::{EntitlementStore, StoreError};

/// PostgreSQL-backed entitlement store.
pub struct PostgresEntitlementStore {
    pool: PgPool,
}

/// Database row representation of an entitlement record.
#[derive(Debug, sqlx::FromRow)]
struct EntitlementRow {
    plan: String,
    active: bool,
    billing_customer_id: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EntitlementRow> for EntitlementRecord {
    type Error = StoreError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        let plan = Plan::parse(&row.plan)
            .ok_or_else(|| StoreError::Database(format!("invalid plan value: {}", row.plan)))?;
        Ok(EntitlementRecord {
            plan,
            active: row.active,
            billing_customer_id: row.billing_customer_id,
            updated_at: row.updated_at,
        })
    }
}

impl PostgresEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the entitlements table if it does not exist yet.
    ///
    /// Runs once at startup; the schema is small enough that a full
    /// migration harness would be overkill.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entitlements (
                user_id             TEXT PRIMARY KEY,
                plan                TEXT NOT NULL,
                active              BOOLEAN NOT NULL,
                billing_customer_id TEXT,
                updated_at          TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl EntitlementStore for PostgresEntitlementStore {
    async fn get(&self, user_id: &str) -> Result<Option<EntitlementRecord>, StoreError> {
        let row: Option<EntitlementRow> = sqlx::query_as(
            r#"
            SELECT plan, active, billing_customer_id, updated_at
            FROM entitlements
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(EntitlementRecord::try_from).transpose()
    }

    async fn upsert(&self, user_id: &str, record: EntitlementRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO entitlements (user_id, plan, active, billing_customer_id, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                plan = EXCLUDED.plan,
                active = EXCLUDED.active,
                billing_customer_id = EXCLUDED.billing_customer_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(record.plan.as_str())
        .bind(record.active)
        .bind(&record.billing_customer_id)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}
