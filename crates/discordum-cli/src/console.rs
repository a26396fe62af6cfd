//! The terminal as plugin host.
//!
//! [`ConsoleHost`] stands in for a game server: it owns the data directory,
//! reports the OS, and keeps the commands the plugin registered. Lines typed
//! on stdin arrive through [`parse_line`] and are answered by
//! [`ConsoleSender`], which holds every permission like a server console.

use std::path::{Path, PathBuf};

use discordum_runtime::{CommandSender, Host};
use tracing::info;

use crate::theme::Theme;

/// Directory used when neither `--data-dir` nor `DISCORDUM_DATA_DIR` is set.
pub(crate) fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "discordum").map_or_else(
        || PathBuf::from("plugins").join("DiscordUM"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

/// Host backed by the local terminal.
#[derive(Debug)]
pub(crate) struct ConsoleHost {
    data_dir: PathBuf,
    os_name: Option<String>,
    commands: Vec<String>,
}

impl ConsoleHost {
    /// Host over `data_dir`; `os_name` overrides the detected OS.
    pub(crate) fn new(data_dir: PathBuf, os_name: Option<String>) -> Self {
        Self {
            data_dir,
            os_name,
            commands: Vec::new(),
        }
    }

    /// Whether `name` was registered by the plugin.
    pub(crate) fn has_command(&self, name: &str) -> bool {
        self.commands.iter().any(|c| c.eq_ignore_ascii_case(name))
    }
}

impl Host for ConsoleHost {
    fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn os_name(&self) -> String {
        self.os_name
            .clone()
            .unwrap_or_else(|| std::env::consts::OS.to_owned())
    }

    fn register_command(&mut self, name: &str, permission: &str) {
        info!(command = name, permission, "registered console command");
        if !self.has_command(name) {
            self.commands.push(name.to_owned());
        }
    }
}

/// The console operator. Holds every permission.
#[derive(Debug, Default)]
pub(crate) struct ConsoleSender;

impl CommandSender for ConsoleSender {
    fn has_permission(&self, _permission: &str) -> bool {
        true
    }

    fn send_message(&self, message: &str) {
        println!("{}", Theme::info(message));
    }
}

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConsoleInput<'a> {
    /// Blank line.
    Empty,
    /// `stop`: disable the plugin and exit.
    Stop,
    /// A registered-looking command: label plus arguments.
    Command { label: &'a str, args: Vec<&'a str> },
}

/// Split a console line. A leading `/` on the label is accepted, the way
/// server consoles accept player-style input.
pub(crate) fn parse_line(line: &str) -> ConsoleInput<'_> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return ConsoleInput::Empty;
    };
    let label = first.strip_prefix('/').unwrap_or(first);
    if label.eq_ignore_ascii_case("stop") {
        return ConsoleInput::Stop;
    }
    ConsoleInput::Command {
        label,
        args: words.collect(),
    }
}
