#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the Dynamic Discord UM+ plugin.
//!
//! A single [`Config`] type covers both the values handed to the bot process
//! and the ambient settings of the plugin itself (runtime download,
//! provisioning policy, logging).
//!
//! # Usage
//!
//! ```rust,no_run
//! use discordum_config::Config;
//!
//! let data_dir = std::path::Path::new("plugins/DiscordUM");
//! Config::save_default(data_dir).unwrap();
//! let config = Config::load(data_dir).unwrap();
//! println!("Reporting on: {}", config.server.name);
//! ```
//!
//! # Environment
//!
//! `DISCORDUM_BOT_TOKEN`, `DISCORDUM_CHANNEL_ID`, and `DISCORDUM_LOG_LEVEL`
//! fill the matching fields when the file leaves them empty.
//!
//! # Design
//!
//! This crate has **no dependencies on other internal discordum crates**.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_FILE_NAME, DEFAULTS_TOML};
pub use types::*;

impl Config {
    /// Load `{data_dir}/config.toml`.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is missing, malformed, or fails
    /// validation.
    pub fn load(data_dir: &std::path::Path) -> ConfigResult<Self> {
        loader::load(data_dir)
    }

    /// Write the default `config.toml` into `data_dir` if it is missing.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be written.
    pub fn save_default(data_dir: &std::path::Path) -> ConfigResult<bool> {
        loader::save_default(data_dir)
    }
}
