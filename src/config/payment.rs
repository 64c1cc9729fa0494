//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::{PriceTable, DEFAULT_TOLERANCE_SECS};

/// Stripe credentials, webhook settings and the static price table.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...)
    pub stripe_secret_key: SecretString,

    /// Webhook signing secret (whsec_...)
    pub stripe_webhook_secret: SecretString,

    #[serde(default = "default_api_base_url")]
    pub stripe_api_base_url: String,

    /// Maximum age of a signed webhook timestamp
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,

    /// Trial length given to new subscriptions, zero for none
    #[serde(default)]
    pub trial_days: u32,

    pub price_standard_monthly: String,
    pub price_standard_yearly: String,
    pub price_premium_monthly: String,
    pub price_premium_yearly: String,
    pub price_extra_seat_monthly: String,
    pub price_extra_seat_yearly: String,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.stripe_secret_key.expose_secret().starts_with("sk_test_")
    }

    pub fn price_table(&self) -> PriceTable {
        PriceTable {
            standard_monthly: self.price_standard_monthly.clone(),
            standard_yearly: self.price_standard_yearly.clone(),
            premium_monthly: self.price_premium_monthly.clone(),
            premium_yearly: self.price_premium_yearly.clone(),
            extra_seat_monthly: self.price_extra_seat_monthly.clone(),
            extra_seat_yearly: self.price_extra_seat_yearly.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let key = self.stripe_secret_key.expose_secret();
        if key.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING__PAYMENT__STRIPE_SECRET_KEY"));
        }
        if !key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }

        let secret = self.stripe_webhook_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET"));
        }
        if !secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if !(1..=3600).contains(&self.signature_tolerance_secs) {
            return Err(ValidationError::InvalidSignatureTolerance);
        }

        let prices = [
            ("price_standard_monthly", &self.price_standard_monthly),
            ("price_standard_yearly", &self.price_standard_yearly),
            ("price_premium_monthly", &self.price_premium_monthly),
            ("price_premium_yearly", &self.price_premium_yearly),
            ("price_extra_seat_monthly", &self.price_extra_seat_monthly),
            ("price_extra_seat_yearly", &self.price_extra_seat_yearly),
        ];
        if let Some((name, _)) = prices.iter().find(|(_, id)| id.trim().is_empty()) {
            return Err(ValidationError::MissingPrice(name));
        }

        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_signature_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PaymentConfig {
        PaymentConfig {
            stripe_secret_key: SecretString::new("sk_test_abc".to_string()),
            stripe_webhook_secret: SecretString::new("whsec_abc".to_string()),
            stripe_api_base_url: default_api_base_url(),
            signature_tolerance_secs: 300,
            trial_days: 0,
            price_standard_monthly: "price_std_m".to_string(),
            price_standard_yearly: "price_std_y".to_string(),
            price_premium_monthly: "price_prem_m".to_string(),
            price_premium_yearly: "price_prem_y".to_string(),
            price_extra_seat_monthly: "price_seat_m".to_string(),
            price_extra_seat_yearly: "price_seat_y".to_string(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
        assert!(valid().is_test_mode());
    }

    #[test]
    fn publishable_key_is_rejected() {
        let config = PaymentConfig {
            stripe_secret_key: SecretString::new("pk_test_abc".to_string()),
            ..valid()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidStripeKey));
    }

    #[test]
    fn webhook_secret_needs_whsec_prefix() {
        let config = PaymentConfig {
            stripe_webhook_secret: SecretString::new("secret".to_string()),
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn tolerance_must_be_positive() {
        let config = PaymentConfig {
            signature_tolerance_secs: 0,
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidSignatureTolerance)
        );
    }

    #[test]
    fn blank_price_is_reported_by_name() {
        let config = PaymentConfig {
            price_extra_seat_yearly: " ".to_string(),
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingPrice("price_extra_seat_yearly"))
        );
    }

    #[test]
    fn price_table_maps_every_entry() {
        let table = valid().price_table();
        assert_eq!(table.premium_yearly, "price_prem_y");
        assert!(table.is_seat_price("price_seat_m"));
    }
}
