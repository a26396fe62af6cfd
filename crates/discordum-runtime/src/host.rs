//! Seams to the embedding game-server host.
//!
//! The core needs very little from its host: where its data lives, which OS
//! it runs on, and a way to expose the `dcum` command. Logging goes through
//! whatever `tracing` subscriber the host installed.

use std::path::Path;

use discordum_config::{Config, ConfigResult};

use crate::platform::Platform;

/// The game server (or console binary) hosting the plugin.
pub trait Host {
    /// Plugin data directory. Holds `config.toml`, `bot.js`, the runtime and
    /// the installed dependencies.
    fn data_dir(&self) -> &Path;

    /// Operating system identifier as reported by the host. Classified with
    /// [`Platform::detect`].
    fn os_name(&self) -> String {
        std::env::consts::OS.to_owned()
    }

    /// Read the plugin configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`discordum_config::ConfigError`] if the file cannot be read
    /// or is invalid.
    fn read_config(&self) -> ConfigResult<Config> {
        Config::load(self.data_dir())
    }

    /// Expose a command under `name` to players and the console.
    fn register_command(&mut self, name: &str, permission: &str);
}

/// Whoever issued a command.
pub trait CommandSender {
    /// Whether the sender holds `permission`.
    fn has_permission(&self, permission: &str) -> bool;

    /// Deliver a chat reply.
    fn send_message(&self, message: &str);
}

/// Platform of `host`, classified from its reported OS name.
pub fn host_platform<H: Host + ?Sized>(host: &H) -> Platform {
    Platform::detect(&host.os_name())
}
