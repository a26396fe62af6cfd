//! Test fixtures for common types.

use std::path::Path;

use discordum_config::{Config, ServerType};
use discordum_runtime::Platform;
use discordum_runtime::platform::{DEPENDENCY_DIR, RUNTIME_DIR};

/// A fully populated configuration with recognisable values.
#[must_use]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.bot.token = "test-token".to_owned();
    config.bot.channel_id = "1234567890".to_owned();
    config.server.name = "Test Server".to_owned();
    config.server.ip = "127.0.0.1".to_owned();
    config.server.port = 25565;
    config.server.server_type = ServerType::Java;
    config.notifications.online.enabled = true;
    config.notifications.online.role_id = "42".to_owned();
    config
}

/// TOML for [`test_config`], as a user would write it.
pub const TEST_CONFIG_TOML: &str = r##"
update-interval = 30

[bot]
token = "test-token"
channel-id = "1234567890"

[server]
name = "Test Server"
ip = "127.0.0.1"
port = 25565
type = "java"

[notifications.online]
enabled = true
role-id = "42"
"##;

/// Write [`TEST_CONFIG_TOML`] as `config.toml` in `data_dir`.
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_test_config(data_dir: &Path) {
    std::fs::create_dir_all(data_dir).expect("create data dir");
    std::fs::write(data_dir.join("config.toml"), TEST_CONFIG_TOML).expect("write config.toml");
}

/// Create an installed-looking runtime and dependency tree in `data_dir`, so
/// provisioning finds everything present.
///
/// # Panics
///
/// Panics if the files cannot be created.
pub fn install_fake_runtime(data_dir: &Path, platform: Platform) {
    let executable = data_dir
        .join(RUNTIME_DIR)
        .join(platform.runtime_executable());
    if let Some(parent) = executable.parent() {
        std::fs::create_dir_all(parent).expect("create runtime dir");
    }
    std::fs::write(&executable, b"").expect("write runtime executable");
    std::fs::create_dir_all(data_dir.join(DEPENDENCY_DIR)).expect("create node_modules");
}

/// Install a test subscriber that writes through the test harness.
/// Safe to call from every test; only the first call installs.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
