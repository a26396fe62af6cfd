//! Configuration types for the Dynamic Discord UM+ plugin.
//!
//! Keys are kebab-case so an operator's existing plugin configuration maps
//! over directly. Every struct implements [`Default`] so a partial file (or
//! an empty one) still deserializes into a usable configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration, read from `config.toml` in the plugin data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Seconds between status refreshes performed by the bot.
    pub update_interval: u32,
    /// Discord bot credentials and target channel.
    pub bot: BotSection,
    /// The game server being reported on.
    pub server: ServerSection,
    /// Status embed appearance.
    pub embed: EmbedSection,
    /// Role pings on status transitions.
    pub notifications: NotificationsSection,
    /// Where the Node.js runtime is downloaded from.
    pub runtime: RuntimeSection,
    /// Policy for failed provisioning stages.
    pub provisioning: ProvisioningSection,
    /// Positional argument contract with the bot process.
    pub arguments: ArgumentsSection,
    /// Log level, format, and per-crate directives.
    pub logging: LoggingSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update_interval: 60,
            bot: BotSection::default(),
            server: ServerSection::default(),
            embed: EmbedSection::default(),
            notifications: NotificationsSection::default(),
            runtime: RuntimeSection::default(),
            provisioning: ProvisioningSection::default(),
            arguments: ArgumentsSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// BotSection
// ---------------------------------------------------------------------------

/// Discord bot token and status channel.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BotSection {
    /// Bot token from the Discord developer portal. Never serialized.
    #[serde(skip_serializing)]
    pub token: String,
    /// Channel the status embed is posted to.
    pub channel_id: String,
}

impl fmt::Debug for BotSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotSection")
            .field("has_token", &!self.token.is_empty())
            .field("channel_id", &self.channel_id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ServerSection
// ---------------------------------------------------------------------------

/// Edition of the game server, which decides how the bot pings it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    /// Java edition (TCP status ping).
    #[default]
    Java,
    /// Bedrock edition (UDP status ping).
    Bedrock,
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Java => f.write_str("java"),
            Self::Bedrock => f.write_str("bedrock"),
        }
    }
}

/// The server whose status is reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerSection {
    /// Display name shown in the embed title.
    pub name: String,
    /// Address the bot pings.
    pub ip: String,
    /// Port the bot pings.
    pub port: u16,
    /// Server edition.
    #[serde(rename = "type")]
    pub server_type: ServerType,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: "My Minecraft Server".to_owned(),
            ip: "127.0.0.1".to_owned(),
            port: 25565,
            server_type: ServerType::Java,
        }
    }
}

// ---------------------------------------------------------------------------
// EmbedSection
// ---------------------------------------------------------------------------

/// Status embed appearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EmbedSection {
    /// Embed color while the server is online (`#RRGGBB`).
    pub online_color: String,
    /// Embed color while the server is offline (`#RRGGBB`).
    pub offline_color: String,
    /// Whether to show the banner image.
    pub show_banner: bool,
    /// Banner image URL.
    pub banner_url: String,
    /// Whether to show the title thumbnail.
    pub show_title_image: bool,
    /// Title thumbnail URL.
    pub title_image_url: String,
    /// Embed footer.
    pub footer: FooterSection,
}

impl Default for EmbedSection {
    fn default() -> Self {
        Self {
            online_color: "#00FF00".to_owned(),
            offline_color: "#FF0000".to_owned(),
            show_banner: false,
            banner_url: String::new(),
            show_title_image: false,
            title_image_url: String::new(),
            footer: FooterSection::default(),
        }
    }
}

/// Embed footer text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FooterSection {
    /// Whether the footer is rendered.
    pub enabled: bool,
    /// Footer text.
    pub text: String,
}

impl Default for FooterSection {
    fn default() -> Self {
        Self {
            enabled: true,
            text: "Dynamic Discord UM+".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationsSection
// ---------------------------------------------------------------------------

/// Role pings sent when the server changes state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NotificationsSection {
    /// Ping sent when the server comes online.
    pub online: RolePing,
    /// Ping sent when the server goes offline.
    pub offline: RolePing,
}

/// A single role ping toggle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RolePing {
    /// Whether the ping is sent.
    pub enabled: bool,
    /// Role mentioned by the ping.
    pub role_id: String,
}

// ---------------------------------------------------------------------------
// RuntimeSection
// ---------------------------------------------------------------------------

/// Pinned Node.js archive for Windows x64.
pub const DEFAULT_WINDOWS_URL: &str = "https://nodejs.org/dist/v18.19.0/node-v18.19.0-win-x64.zip";

/// Pinned Node.js archive for Linux x64.
pub const DEFAULT_LINUX_URL: &str =
    "https://nodejs.org/dist/v18.19.0/node-v18.19.0-linux-x64.tar.xz";

/// Node.js runtime download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RuntimeSection {
    /// Zip archive used on Windows.
    pub windows_url: String,
    /// Tar+xz archive used on Linux.
    pub linux_url: String,
    /// Upper bound for the whole download, in seconds.
    pub download_timeout_secs: u64,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            windows_url: DEFAULT_WINDOWS_URL.to_owned(),
            linux_url: DEFAULT_LINUX_URL.to_owned(),
            download_timeout_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// ProvisioningSection
// ---------------------------------------------------------------------------

/// What enable does when a provisioning stage fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProvisioningSection {
    /// Skip launching the bot when resources, runtime, or dependencies
    /// failed to provision. Off by default: the bot is launched anyway.
    pub abort_on_failure: bool,
}

// ---------------------------------------------------------------------------
// ArgumentsSection
// ---------------------------------------------------------------------------

/// Which positional argument vector the bot expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentLayout {
    /// Thirteen arguments, ending with the update interval.
    Basic,
    /// Basic plus role pings and footer (nineteen arguments).
    #[default]
    Extended,
}

/// Argument contract settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ArgumentsSection {
    /// Layout of the positional argument vector.
    pub layout: ArgumentLayout,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["discordum_runtime=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
