//! Per-user entitlement records.

use chrono::{DateTime, Utc};

use super::Plan;

/// The stored plan/status tuple for one user.
///
/// Exactly one record exists per user id; an absent record is equivalent to
/// [`EntitlementRecord::freemium`]. Records are only produced through the
/// two constructors, which keeps the invariant `active == true` implies a
/// paid plan.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitlementRecord {
    /// Current plan.
    pub plan: Plan,

    /// Whether the plan is in good standing.
    pub active: bool,

    /// External billing-provider customer reference, if known.
    pub billing_customer_id: Option<String>,

    /// Wall-clock time of the last applied transition. Records reflect the
    /// most recently *processed* event, not the most recent event.
    pub updated_at: DateTime<Utc>,
}

impl EntitlementRecord {
    /// Record for a user whose checkout completed.
    ///
    /// `plan` must be a paid plan; activation of `Freemium` is not a valid
    /// transition and callers are expected to have filtered it out.
    pub fn activated(plan: Plan, billing_customer_id: Option<String>) -> Self {
        debug_assert!(plan.is_paid());
        Self {
            plan,
            active: true,
            billing_customer_id,
            updated_at: Utc::now(),
        }
    }

    /// The default record: freemium, inactive, no customer reference.
    ///
    /// Used both as the synthetic record for unknown users and as the
    /// deactivation target for cancellations and payment failures. The
    /// customer reference is always cleared on deactivation.
    pub fn freemium() -> Self {
        Self {
            plan: Plan::Freemium,
            active: false,
            billing_customer_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Field-wise equality ignoring the write timestamp.
    pub fn same_state(&self, other: &EntitlementRecord) -> bool {
        self.plan == other.plan
            && self.active == other.active
            && self.billing_customer_id == other.billing_customer_id
    }
}
