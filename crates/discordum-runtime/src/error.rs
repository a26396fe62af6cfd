//! Error types for provisioning and supervision.

use std::path::PathBuf;

use discordum_config::ConfigError;

use crate::platform::Platform;

/// Errors from unpacking a runtime archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The archive could not be read or decoded.
    #[error("malformed archive {path}: {message}")]
    Malformed {
        /// Archive being read.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },

    /// An entry would land outside the destination directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry path.
        path: String,
    },

    /// Archive exceeds the entry-count or size limits.
    #[error("archive too large: {message}")]
    TooLarge {
        /// Which limit was exceeded.
        message: String,
    },

    /// Writing an extracted entry failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target path on disk.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors from a provisioning stage (resources, runtime, dependencies).
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The host OS has no runtime distribution.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(Platform),

    /// Downloading the runtime archive failed.
    #[error("download of {url} failed: {message}")]
    Download {
        /// URL being fetched.
        url: String,
        /// Failure reason.
        message: String,
    },

    /// Unpacking the runtime archive failed.
    #[error("extraction failed: {0}")]
    Extract(#[from] ArchiveError),

    /// The runtime directory has no executable after flattening.
    #[error("runtime executable missing at {0}")]
    MissingExecutable(PathBuf),

    /// The package manager could not be started.
    #[error("failed to run package manager {program}: {source}")]
    Install {
        /// Program that was spawned.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error while preparing the data directory.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being touched.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for provisioning stages.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors from the bot process supervisor.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// `start` was called while a bot process is alive.
    #[error("bot process already running (pid {pid})")]
    AlreadyRunning {
        /// Process id of the live child.
        pid: u32,
    },

    /// The bot process could not be spawned.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that was spawned.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Errors surfaced by the plugin lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Configuration could not be written, read, or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The bot process could not be started.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// Provisioning failed and `abort-on-failure` is set.
    #[error("bot not launched: {failed} provisioning stage(s) failed")]
    ProvisioningFailed {
        /// Number of failed stages.
        failed: usize,
    },
}

/// Result type for plugin lifecycle operations.
pub type PluginResult<T> = Result<T, PluginError>;
