//! The `/dcum` command.

use tracing::{error, info};

use crate::host::{CommandSender, Host};
use crate::plugin::DiscordUm;

/// Reply when the sender lacks [`DcumCommand::PERMISSION`].
pub const NO_PERMISSION_MESSAGE: &str = "You do not have permission to use this command.";

/// Reply after a successful reload.
pub const RELOADED_MESSAGE: &str = "Dynamic Discord UM+ reloaded successfully.";

/// Reply for anything other than `reload`.
pub const USAGE_MESSAGE: &str = "Usage: /dcum reload";

const RELOAD: &str = "reload";

/// What a `/dcum` invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The plugin was reloaded.
    Reloaded,
    /// The reload ran but the bot did not come back up.
    ReloadFailed,
    /// The sender may not reload.
    PermissionDenied,
    /// Unknown or missing subcommand.
    Usage,
}

/// `/dcum reload`, gated on `discordum.reload`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DcumCommand;

impl DcumCommand {
    /// Command label.
    pub const NAME: &'static str = "dcum";

    /// Permission required to reload.
    pub const PERMISSION: &'static str = "discordum.reload";

    /// Run the command for `sender` and reply in chat.
    pub fn execute<H: Host>(
        plugin: &mut DiscordUm<H>,
        sender: &dyn CommandSender,
        args: &[&str],
    ) -> CommandOutcome {
        let is_reload = args
            .first()
            .is_some_and(|arg| arg.eq_ignore_ascii_case(RELOAD));
        if !is_reload {
            sender.send_message(USAGE_MESSAGE);
            return CommandOutcome::Usage;
        }

        if !sender.has_permission(Self::PERMISSION) {
            sender.send_message(NO_PERMISSION_MESSAGE);
            return CommandOutcome::PermissionDenied;
        }

        match plugin.reload() {
            Ok(report) => {
                info!(%report, "reload requested from command");
                sender.send_message(RELOADED_MESSAGE);
                CommandOutcome::Reloaded
            },
            Err(e) => {
                error!(error = %e, "reload requested from command failed");
                sender.send_message(&format!("Dynamic Discord UM+ reload failed: {e}"));
                CommandOutcome::ReloadFailed
            },
        }
    }

    /// Completions for the argument being typed.
    ///
    /// Only the first argument completes, and only to `reload` for senders
    /// allowed to use it.
    #[must_use]
    pub fn tab_complete(sender: &dyn CommandSender, args: &[&str]) -> Vec<String> {
        let [partial] = args else {
            return Vec::new();
        };
        if !sender.has_permission(Self::PERMISSION) {
            return Vec::new();
        }
        if RELOAD.starts_with(&partial.to_ascii_lowercase()) {
            vec![RELOAD.to_owned()]
        } else {
            Vec::new()
        }
    }
}
