//! Application configuration.
//!
//! Settings come from the environment with the `WISE_GUIDE` prefix and
//! `__` as the section separator, so `WISE_GUIDE__GATEWAY__MERCHANT_LOGIN`
//! lands in `gateway.merchant_login`. A `.env` file is honored in
//! development.

mod database;
mod error;
mod gateway;
mod server;
mod telegram;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use gateway::GatewayConfig;
pub use server::ServerConfig;
pub use telegram::TelegramConfig;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub telegram: TelegramConfig,
}

impl AppConfig {
    /// Loads and validates configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("WISE_GUIDE").separator("__"))
            .build()?;

        let app: AppConfig = settings.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate()?;
        self.telegram.validate()?;
        Ok(())
    }
}
