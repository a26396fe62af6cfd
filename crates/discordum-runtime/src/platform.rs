//! Host platform detection and the per-platform runtime layout.

use std::fmt;
use std::path::{Path, PathBuf};

use discordum_config::RuntimeSection;

/// Runtime installation root, relative to the data directory.
pub const RUNTIME_DIR: &str = "node";

/// Dependency marker directory, relative to the data directory.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Transient download target, relative to the data directory.
pub const TEMP_ARCHIVE: &str = "node.tmp";

/// Entry script of the bot, relative to the data directory.
pub const BOT_SCRIPT: &str = "bot.js";

/// Archive format of a runtime distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.zip`
    Zip,
    /// `.tar.xz`
    TarXz,
}

/// Operating systems the plugin can provision a runtime for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Windows x64.
    Windows,
    /// Linux x64.
    Linux,
    /// Anything else; provisioning is refused.
    Unsupported,
}

impl Platform {
    /// Classify a free-form OS identifier.
    ///
    /// Case-insensitive substring match: anything containing `win` is
    /// Windows, anything containing `linux` is Linux, the rest is
    /// unsupported. Never fails.
    #[must_use]
    pub fn detect(os_name: &str) -> Self {
        let os = os_name.to_lowercase();
        if os.contains("win") {
            Self::Windows
        } else if os.contains("linux") {
            Self::Linux
        } else {
            Self::Unsupported
        }
    }

    /// The platform this binary is running on.
    #[must_use]
    pub fn current() -> Self {
        Self::detect(std::env::consts::OS)
    }

    /// Whether a runtime distribution exists for this platform.
    #[must_use]
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    /// Runtime executable relative to the runtime root.
    #[must_use]
    pub fn runtime_executable(self) -> PathBuf {
        match self {
            Self::Windows => PathBuf::from("node.exe"),
            Self::Linux | Self::Unsupported => Path::new("bin").join("node"),
        }
    }

    /// Directory holding the runtime binaries, relative to the runtime root.
    /// Prepended to the search path of the package manager.
    #[must_use]
    pub fn runtime_bin_dir(self) -> PathBuf {
        match self {
            Self::Windows => PathBuf::new(),
            Self::Linux | Self::Unsupported => PathBuf::from("bin"),
        }
    }

    /// Archive format of the platform distribution.
    #[must_use]
    pub fn archive_kind(self) -> Option<ArchiveKind> {
        match self {
            Self::Windows => Some(ArchiveKind::Zip),
            Self::Linux => Some(ArchiveKind::TarXz),
            Self::Unsupported => None,
        }
    }

    /// Download URL for the platform, taken from the `[runtime]` section.
    #[must_use]
    pub fn download_url(self, runtime: &RuntimeSection) -> Option<&str> {
        match self {
            Self::Windows => Some(runtime.windows_url.as_str()),
            Self::Linux => Some(runtime.linux_url.as_str()),
            Self::Unsupported => None,
        }
    }

    /// Separator for search-path lists.
    #[must_use]
    pub fn path_list_separator(self) -> char {
        match self {
            Self::Windows => ';',
            Self::Linux | Self::Unsupported => ':',
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => f.write_str("windows"),
            Self::Linux => f.write_str("linux"),
            Self::Unsupported => f.write_str("unsupported"),
        }
    }
}
