//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only fill fields the config
//! file left unset or empty.

use std::collections::HashMap;
use std::ffi::OsString;

use tracing::debug;

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "DISCORDUM_BOT_TOKEN",
        field_path: "bot.token",
    },
    EnvMapping {
        var_name: "DISCORDUM_CHANNEL_ID",
        field_path: "bot.channel-id",
    },
    EnvMapping {
        var_name: "DISCORDUM_LOG_LEVEL",
        field_path: "logging.level",
    },
];

/// Apply environment variable fallbacks to string fields that are missing
/// or empty in `merged`.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let Some(val) = env_vars.get(mapping.var_name) else {
            continue;
        };
        if val.is_empty() || is_set(merged, mapping.field_path) {
            continue;
        }

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_string_field(merged, mapping.field_path, val);
        count = count.saturating_add(1);
    }

    count
}

/// Collect the process environment into a map.
///
/// Variables whose name or value is not valid Unicode are skipped; none of
/// them can feed a string config field.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    unicode_vars(std::env::vars_os())
}

/// Keep the entries of `vars` that convert to `String` on both sides.
#[must_use]
pub fn unicode_vars<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// A field counts as set when it holds a non-empty string.
fn is_set(root: &toml::Value, path: &str) -> bool {
    let mut current = root;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return false,
        }
    }
    current.as_str().is_none_or(|s| !s.is_empty())
}

fn set_string_field(root: &mut toml::Value, path: &str, value: &str) {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry((*segment).to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert((*leaf).to_owned(), toml::Value::String(value.to_owned()));
    }
}
