use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::billing::{normalize_amount, SignatureCodec, SigningScheme};

use super::ConfigError;

/// Payment gateway merchant account settings.
///
/// `outbound_secret` signs generated payment links, `inbound_secret`
/// verifies result notifications. They are distinct secrets on the gateway
/// side and must never be swapped.
#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    pub merchant_login: String,
    pub outbound_secret: SecretString,
    pub inbound_secret: SecretString,
    #[serde(default = "default_price")]
    pub price: String,
    #[serde(default = "default_subscription_days")]
    pub subscription_days: i64,
    #[serde(default = "default_test_mode")]
    pub test_mode: bool,
    #[serde(default)]
    pub signing_scheme: SigningScheme,
}

fn default_price() -> String {
    "500".to_string()
}

fn default_subscription_days() -> i64 {
    30
}

fn default_test_mode() -> bool {
    true
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.merchant_login.is_empty() {
            return Err(ConfigError::validation(
                "gateway.merchant_login must not be empty",
            ));
        }
        if self.outbound_secret.expose_secret().is_empty() {
            return Err(ConfigError::validation(
                "gateway.outbound_secret must not be empty",
            ));
        }
        if self.inbound_secret.expose_secret().is_empty() {
            return Err(ConfigError::validation(
                "gateway.inbound_secret must not be empty",
            ));
        }
        if normalize_amount(&self.price).is_err() {
            return Err(ConfigError::validation(format!(
                "gateway.price '{}' is not a valid amount",
                self.price
            )));
        }
        if self.subscription_days <= 0 {
            return Err(ConfigError::validation(
                "gateway.subscription_days must be positive",
            ));
        }
        Ok(())
    }

    /// Builds the signature codec for this merchant account.
    pub fn signature_codec(&self) -> SignatureCodec {
        SignatureCodec::new(
            self.merchant_login.clone(),
            self.outbound_secret.clone(),
            self.inbound_secret.clone(),
            self.signing_scheme,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GatewayConfig {
        GatewayConfig {
            merchant_login: "demo_shop".into(),
            outbound_secret: SecretString::new("pw_one".into()),
            inbound_secret: SecretString::new("pw_two".into()),
            price: default_price(),
            subscription_days: default_subscription_days(),
            test_mode: true,
            signing_scheme: SigningScheme::default(),
        }
    }

    #[test]
    fn complete_config_validates() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut cfg = config();
        cfg.inbound_secret = SecretString::new("".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn garbled_price_is_rejected() {
        let mut cfg = config();
        cfg.price = "five hundred".into();
        assert!(cfg.validate().is_err());
    }
}
