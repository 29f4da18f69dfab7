//! Payment configuration.
//!
//! The billing provider is driven in either test or live mode, each with its
//! own secret key, webhook secret, and price table. The mode is selected
//! once at startup and the active key set is injected into the gateway;
//! handlers never read the process environment.

use serde::Deserialize;

use super::error::ValidationError;

/// Which provider mode the service runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BillingMode {
    #[default]
    Test,
    Live,
}

impl BillingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingMode::Test => "test",
            BillingMode::Live => "live",
        }
    }
}

impl std::fmt::Display for BillingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The key set for one mode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModeKeys {
    /// Provider secret API key (sk_...).
    pub secret_key: String,

    /// Webhook signing secret (whsec_...).
    pub webhook_secret: String,

    /// Price id for the mini plan.
    pub price_mini: String,

    /// Price id for the base plan.
    pub price_base: String,

    /// Price id for the pro plan.
    pub price_pro: String,
}

impl ModeKeys {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("payment secret_key"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("payment webhook_secret"));
        }

        // Verify key prefixes so a publishable or portal key cannot slip in.
        if !self.secret_key.starts_with("sk_") {
            return Err(ValidationError::InvalidSecretKey);
        }
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidWebhookSecret);
        }

        if self.price_mini.is_empty() {
            return Err(ValidationError::MissingPriceId("mini"));
        }
        if self.price_base.is_empty() {
            return Err(ValidationError::MissingPriceId("base"));
        }
        if self.price_pro.is_empty() {
            return Err(ValidationError::MissingPriceId("pro"));
        }

        Ok(())
    }
}

/// Payment configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Mode selector; defaults to test.
    #[serde(default)]
    pub mode: BillingMode,

    /// Test-mode key set.
    pub test: Option<ModeKeys>,

    /// Live-mode key set.
    pub live: Option<ModeKeys>,

    /// Redirect target after a successful checkout.
    #[serde(default)]
    pub success_url: String,

    /// Redirect target after an abandoned checkout.
    #[serde(default)]
    pub cancel_url: String,
}

impl PaymentConfig {
    /// The key set for the configured mode. Only the selected mode's keys
    /// are required to be present.
    pub fn active_keys(&self) -> Result<&ModeKeys, ValidationError> {
        match self.mode {
            BillingMode::Test => self
                .test
                .as_ref()
                .ok_or(ValidationError::MissingRequired("payment.test")),
            BillingMode::Live => self
                .live
                .as_ref()
                .ok_or(ValidationError::MissingRequired("payment.live")),
        }
    }

    pub fn is_live_mode(&self) -> bool {
        self.mode == BillingMode::Live
    }

    /// Validate payment configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let keys = self.active_keys()?;
        keys.validate()?;

        // A live deployment pointed at a test key (or vice versa) is a
        // misconfiguration, not a fallback.
        let expected_prefix = match self.mode {
            BillingMode::Test => "sk_test_",
            BillingMode::Live => "sk_live_",
        };
        if !keys.secret_key.starts_with(expected_prefix) {
            return Err(ValidationError::InvalidSecretKey);
        }

        if self.success_url.is_empty() {
            return Err(ValidationError::MissingRedirectUrl("success_url"));
        }
        if self.cancel_url.is_empty() {
            return Err(ValidationError::MissingRedirectUrl("cancel_url"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_keys(prefix: &str) -> ModeKeys {
        ModeKeys {
            secret_key: format!("{}abcd1234", prefix),
            webhook_secret: "whsec_xyz789".to_string(),
            price_mini: "price_mini_1".to_string(),
            price_base: "price_base_1".to_string(),
            price_pro: "price_pro_1".to_string(),
        }
    }

    fn valid_config() -> PaymentConfig {
        PaymentConfig {
            mode: BillingMode::Test,
            test: Some(valid_keys("sk_test_")),
            live: None,
            success_url: "https://app.example.com/billing".to_string(),
            cancel_url: "https://app.example.com/pricing".to_string(),
        }
    }

    #[test]
    fn valid_test_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn missing_active_mode_keys_fails() {
        let config = PaymentConfig {
            mode: BillingMode::Live,
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("payment.live"))
        ));
    }

    #[test]
    fn only_active_mode_keys_are_required() {
        // Test mode does not need the live key set.
        let config = valid_config();
        assert!(config.live.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn wrong_secret_key_prefix_fails() {
        let mut config = valid_config();
        config.test.as_mut().unwrap().secret_key = "pk_test_xxx".to_string();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidSecretKey)
        ));
    }

    #[test]
    fn live_mode_rejects_test_key() {
        let config = PaymentConfig {
            mode: BillingMode::Live,
            live: Some(valid_keys("sk_test_")),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidSecretKey)
        ));
    }

    #[test]
    fn wrong_webhook_secret_prefix_fails() {
        let mut config = valid_config();
        config.test.as_mut().unwrap().webhook_secret = "secret_xxx".to_string();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidWebhookSecret)
        ));
    }

    #[test]
    fn missing_price_id_fails() {
        let mut config = valid_config();
        config.test.as_mut().unwrap().price_base = String::new();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingPriceId("base"))
        ));
    }

    #[test]
    fn missing_redirect_urls_fail() {
        let mut config = valid_config();
        config.success_url = String::new();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRedirectUrl("success_url"))
        ));
    }

    #[test]
    fn active_keys_follows_mode() {
        let config = PaymentConfig {
            mode: BillingMode::Live,
            live: Some(valid_keys("sk_live_")),
            ..valid_config()
        };
        assert!(config.active_keys().unwrap().secret_key.starts_with("sk_live_"));
        assert!(config.is_live_mode());
    }
}
