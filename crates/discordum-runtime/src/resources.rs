//! Files compiled into the binary and written to the data directory.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ProvisionError, ProvisionResult};
use crate::platform::BOT_SCRIPT;

/// The bot entry script.
pub const BOT_JS: &str = include_str!("../resources/bot/bot.js");

/// npm manifest naming the bot's dependencies.
pub const PACKAGE_JSON: &str = include_str!("../resources/bot/package.json");

/// Manifest file name, relative to the data directory.
pub const PACKAGE_MANIFEST: &str = "package.json";

const BUNDLED: &[(&str, &str)] = &[(BOT_SCRIPT, BOT_JS), (PACKAGE_MANIFEST, PACKAGE_JSON)];

/// Write the bundled bot files into `data_dir`, skipping any that exist.
///
/// Returns how many files were written. A user-edited `bot.js` is never
/// replaced.
///
/// # Errors
///
/// Returns [`ProvisionError::Io`] if the directory or a file cannot be
/// written.
pub fn extract_bundled(data_dir: &Path) -> ProvisionResult<usize> {
    fs::create_dir_all(data_dir).map_err(|e| ProvisionError::io(data_dir, e))?;

    let mut written: usize = 0;
    for (name, contents) in BUNDLED {
        let target = data_dir.join(name);
        if target.exists() {
            debug!(path = %target.display(), "bundled resource present, keeping it");
            continue;
        }
        fs::write(&target, contents).map_err(|e| ProvisionError::io(&target, e))?;
        info!(path = %target.display(), "extracted bundled resource");
        written = written.saturating_add(1);
    }
    Ok(written)
}
