//! Application configuration
//!
//! Loaded from environment variables with the `config` and `dotenvy` crates.
//! Variables use the `STOREFRONT` prefix and `__` between nested keys:
//!
//! - `STOREFRONT__SERVER__PORT=8080` -> `server.port`
//! - `STOREFRONT__DATABASE__URL=postgres://...` -> `database.url`
//! - `STOREFRONT__DISCOUNTS__DEFAULT_USER_USAGE_LIMIT=1` -> `discounts.default_user_usage_limit`
//!
//! ```no_run
//! use storefront_discounts::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! # Ok::<(), storefront_discounts::config::ConfigError>(())
//! ```

mod database;
mod discounts;
mod error;
mod server;

pub use database::DatabaseConfig;
pub use discounts::DiscountsConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    #[serde(default)]
    pub discounts: DiscountsConfig,
}

impl AppConfig {
    /// Reads `.env` if present, then the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("STOREFRONT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation of every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.discounts.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
