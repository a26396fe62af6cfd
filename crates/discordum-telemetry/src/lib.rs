//! Logging for the Dynamic Discord UM+ plugin.
//!
//! The core logs through `tracing` macros only; whichever host embeds it
//! decides where records go by installing a subscriber. This crate provides
//! the subscriber used by the console host.
//!
//! # Example
//!
//! ```rust,no_run
//! use discordum_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), discordum_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("discordum_runtime=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("Plugin enabled");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};

/// Build a [`LogConfig`] from the `[logging]` section of the plugin config.
#[cfg(feature = "config")]
#[must_use]
pub fn log_config_from(section: &discordum_config::LoggingSection) -> LogConfig {
    LogConfig {
        level: section.level.clone(),
        format: LogFormat::from_name(&section.format),
        directives: section.directives.clone(),
        ..LogConfig::default()
    }
}

#[cfg(all(test, feature = "config"))]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_from_section() {
        let section = discordum_config::LoggingSection {
            level: "warn".to_owned(),
            format: "json".to_owned(),
            directives: vec!["discordum_runtime=debug".to_owned()],
        };

        let config = log_config_from(&section);

        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directives, vec!["discordum_runtime=debug"]);
        assert!(matches!(config.target, LogTarget::Stderr));
    }
}
