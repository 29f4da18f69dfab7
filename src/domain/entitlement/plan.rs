//! Subscription plan definitions.

use serde::{Deserialize, Serialize};

/// Subscription plan.
///
/// `Freemium` is the default, unpaid plan; the others map to a configured
/// price id at the billing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Default plan for users without an active subscription.
    Freemium,
    Mini,
    Base,
    Pro,
}

impl Plan {
    /// Returns true if this plan is purchasable (has a price id).
    pub fn is_paid(&self) -> bool {
        !matches!(self, Plan::Freemium)
    }

    /// The wire/storage form of the plan name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Freemium => "freemium",
            Plan::Mini => "mini",
            Plan::Base => "base",
            Plan::Pro => "pro",
        }
    }

    /// Parse a plan from its wire form. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Plan> {
        match s {
            "freemium" => Some(Plan::Freemium),
            "mini" => Some(Plan::Mini),
            "base" => Some(Plan::Base),
            "pro" => Some(Plan::Pro),
            _ => None,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freemium_is_not_paid() {
        assert!(!Plan::Freemium.is_paid());
    }

    #[test]
    fn purchasable_plans_are_paid() {
        assert!(Plan::Mini.is_paid());
        assert!(Plan::Base.is_paid());
        assert!(Plan::Pro.is_paid());
    }

    #[test]
    fn plan_serializes_lowercase() {
        let json = serde_json::to_string(&Plan::Pro).unwrap();
        assert_eq!(json, "\"pro\"");
    }

    #[test]
    fn plan_deserializes_from_lowercase() {
        let plan: Plan = serde_json::from_str("\"mini\"").unwrap();
        assert_eq!(plan, Plan::Mini);
    }

    #[test]
    fn parse_roundtrips_with_as_str() {
        for plan in [Plan::Freemium, Plan::Mini, Plan::Base, Plan::Pro] {
            assert_eq!(Plan::parse(plan.as_str()), Some(plan));
        }
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert_eq!(Plan::parse("gold"), None);
        assert_eq!(Plan::parse(""), None);
        assert_eq!(Plan::parse("PRO"), None);
    }
}
