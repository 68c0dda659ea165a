//! Layered settings: defaults, then a TOML file, then `FLASHCAST_` variables.

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str, load_default_config, ENV_PREFIX};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

/// Failure to produce a usable [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file {0} does not exist")]
    FileNotFound(String),

    /// TOML or environment values did not fit the config shape.
    #[error("Invalid configuration: {0}")]
    ParseError(String),

    /// Values parsed but are out of range for an encode.
    #[error("Configuration rejected: {0}")]
    ValidationError(String),
}
