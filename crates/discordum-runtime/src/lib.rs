//! Core of the Dynamic Discord UM+ plugin.
//!
//! On enable the plugin makes sure a Node.js runtime and the bot's npm
//! dependencies are present in its data directory, then launches `bot.js`
//! as a single supervised child process:
//!
//! - [`Platform`]: host OS classification and the per-OS runtime layout
//! - [`archive`]: zip and tar.xz extraction with path-traversal guards
//! - [`RuntimeProvisioner`]: download, extract, flatten, verify
//! - [`DependencyInstaller`]: one-shot `npm install`
//! - [`build_arguments`]: the positional argument contract of `bot.js`
//! - [`Supervisor`]: start, cooperative `STOP` shutdown, reload
//! - [`DiscordUm`]: enable / disable / reload against a [`Host`]
//! - [`DcumCommand`]: the permission-gated `/dcum reload` command
//!
//! Everything here is blocking and runs on the host's lifecycle thread.
//! Network and shutdown waits are bounded by timeouts.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod archive;
pub mod args;
pub mod command;
pub mod error;
pub mod fetch;
pub mod host;
pub mod install;
pub mod platform;
pub mod plugin;
pub mod process;
pub mod provision;
pub mod resources;
pub mod supervisor;

pub use args::build_arguments;
pub use command::{CommandOutcome, DcumCommand};
pub use error::{
    ArchiveError, ArchiveResult, PluginError, PluginResult, ProvisionError, ProvisionResult,
    SupervisorError, SupervisorResult,
};
pub use fetch::{Fetcher, HttpFetcher};
pub use host::{CommandSender, Host};
pub use install::{DependencyInstaller, InstallOutcome, NpmInvocation};
pub use platform::Platform;
pub use plugin::{DiscordUm, ProvisionReport};
pub use process::{ChildExit, ChildHandle, LaunchSpec, Launcher, ProcessLauncher};
pub use provision::{RuntimeOutcome, RuntimeProvisioner};
pub use resources::extract_bundled;
pub use supervisor::{SHUTDOWN_TIMEOUT, Supervisor, SupervisorState};
