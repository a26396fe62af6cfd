//! Post-parse configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_schedule(config)?;
    validate_server(config)?;
    validate_embed(config)?;
    validate_runtime(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_schedule(config: &Config) -> ConfigResult<()> {
    if config.update_interval == 0 {
        return Err(ConfigError::ValidationError {
            field: "update-interval".to_owned(),
            message: "update interval must be at least 1 second".to_owned(),
        });
    }
    Ok(())
}

fn validate_server(config: &Config) -> ConfigResult<()> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.port".to_owned(),
            message: "port must be between 1 and 65535".to_owned(),
        });
    }
    Ok(())
}

fn validate_embed(config: &Config) -> ConfigResult<()> {
    for (field, value) in [
        ("embed.online-color", &config.embed.online_color),
        ("embed.offline-color", &config.embed.offline_color),
    ] {
        if !is_hex_color(value) {
            return Err(ConfigError::ValidationError {
                field: field.to_owned(),
                message: format!("'{value}' is not a #RRGGBB color"),
            });
        }
    }
    Ok(())
}

fn validate_runtime(config: &Config) -> ConfigResult<()> {
    let r = &config.runtime;

    for (field, value) in [
        ("runtime.windows-url", &r.windows_url),
        ("runtime.linux-url", &r.linux_url),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: field.to_owned(),
                message: "download URL must not be empty".to_owned(),
            });
        }
    }

    if r.download_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "runtime.download-timeout-secs".to_owned(),
            message: "download timeout must be at least 1 second".to_owned(),
        });
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        });
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        });
    }

    Ok(())
}

/// `#RRGGBB`, as the bot parses it with `parseInt(.., 16)`.
fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
