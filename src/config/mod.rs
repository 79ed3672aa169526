//! Configuration loading and management.
//!
//! - [`types`]: the agent `Config`, the `Channels` variant and timeouts
//! - [`validation`]: startup checks that report every problem at once
//! - `defaults`: serde default functions

mod defaults;
mod types;
pub mod validation;

pub use types::{Channels, Config, ConfigError, SaslCredentials, TimeoutsConfig};
pub use validation::{ValidationError, validate};

impl Config {
    /// Load and validate in one step.
    pub fn load_validated<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}
