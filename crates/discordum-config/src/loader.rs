//! Config file loading.
//!
//! `Config::load()`:
//! 1. Read `{data_dir}/config.toml` (size-capped)
//! 2. Parse into a TOML tree
//! 3. Apply env var fallbacks for unset fields
//! 4. Deserialize → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration, also written out as the template.
pub const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// File name of the configuration inside the plugin data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Write the default configuration to `{data_dir}/config.toml` unless a file
/// is already there. Returns `true` when the file was created.
///
/// # Errors
///
/// Returns a [`ConfigError::WriteError`] if the directory or file cannot be
/// created.
pub fn save_default(data_dir: &Path) -> ConfigResult<bool> {
    let path = data_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        debug!(path = %path.display(), "config file present, keeping it");
        return Ok(false);
    }

    std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::WriteError {
        path: data_dir.display().to_string(),
        source: e,
    })?;
    std::fs::write(&path, DEFAULTS_TOML).map_err(|e| ConfigError::WriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    info!(path = %path.display(), "wrote default config");
    Ok(true)
}

/// Load `{data_dir}/config.toml` with fallbacks from the process environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load(data_dir: &Path) -> ConfigResult<Config> {
    load_file_with_env(&data_dir.join(CONFIG_FILE_NAME), &collect_env_vars())
}

/// Load a config file using an explicit environment map.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file_with_env<S: ::std::hash::BuildHasher>(
    path: &Path,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    // Check file size before reading to prevent OOM.
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let config = parse_str(&content, &path.display().to_string(), env_vars)?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Parse and validate configuration text.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the text is not valid TOML, does not match
/// the schema, or fails validation.
pub fn parse_str<S: ::std::hash::BuildHasher>(
    content: &str,
    origin: &str,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let mut tree: toml::Value = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })?;

    let env_count = apply_env_fallbacks(&mut tree, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config = tree
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: origin.to_owned(),
            source: e,
        })?;

    validate::validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArgumentLayout, ServerType};

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_parse() {
        let val: toml::Value = toml::from_str(DEFAULTS_TOML).unwrap();
        let table = val.as_table().unwrap();
        assert!(table.contains_key("bot"));
        assert!(table.contains_key("server"));
        assert!(table.contains_key("runtime"));
    }

    #[test]
    fn test_defaults_deserialize_to_config() {
        let config = parse_str(DEFAULTS_TOML, "<defaults>", &no_env()).unwrap();
        let expected = Config::default();
        assert_eq!(config.update_interval, expected.update_interval);
        assert_eq!(config.server.name, expected.server.name);
        assert_eq!(config.server.server_type, ServerType::Java);
        assert_eq!(config.runtime.windows_url, expected.runtime.windows_url);
        assert_eq!(config.arguments.layout, ArgumentLayout::Extended);
        assert_eq!(config.embed.footer.text, expected.embed.footer.text);
    }

    #[test]
    fn test_save_default_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("plugins").join("DiscordUM");

        assert!(save_default(&data_dir).unwrap());
        let path = data_dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "update-interval = 5\n").unwrap();

        assert!(!save_default(&data_dir).unwrap());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "update-interval = 5\n"
        );
    }

    #[test]
    fn test_load_file_applies_env_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, DEFAULTS_TOML).unwrap();

        let env: HashMap<String, String> =
            [("DISCORDUM_BOT_TOKEN".to_owned(), "env-token".to_owned())].into();
        let config = load_file_with_env(&path, &env).unwrap();
        assert_eq!(config.bot.token, "env-token");
    }

    #[test]
    fn test_load_file_nonexistent() {
        let result = load_file_with_env(Path::new("/nonexistent/config.toml"), &no_env());
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let result = parse_str("[bot\ntoken = 1", "inline", &no_env());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let result = parse_str("[server]\nport = \"high\"", "inline", &no_env());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        let result = load_file_with_env(&file_path, &no_env());
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "Expected ValidationError for oversized config, got: {result:?}"
        );
    }
}
