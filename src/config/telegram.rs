use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::telegram::DEFAULT_API_BASE;

use super::ConfigError;

#[derive(Debug, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl TelegramConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_token.expose_secret().is_empty() {
            return Err(ConfigError::validation(
                "telegram.bot_token must not be empty",
            ));
        }
        if self.api_base.is_empty() {
            return Err(ConfigError::validation(
                "telegram.api_base must not be empty",
            ));
        }
        Ok(())
    }
}
