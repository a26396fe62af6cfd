//! `discordum args`: show how the bot would be launched.

use anyhow::Result;
use colored::Colorize;
use discordum_runtime::host::host_platform;
use discordum_runtime::{Host, ProcessLauncher, Supervisor};

use crate::console::ConsoleHost;
use crate::theme::Theme;

/// Names of the positional arguments after the script, in order.
const ARGUMENT_NAMES: [&str; 19] = [
    "bot token",
    "channel id",
    "server name",
    "server address",
    "server port",
    "server type",
    "online color",
    "offline color",
    "show banner",
    "banner url",
    "show title image",
    "title image url",
    "update interval",
    "online notification",
    "online role id",
    "offline notification",
    "offline role id",
    "footer enabled",
    "footer text",
];

pub(crate) fn print_args(host: &ConsoleHost) -> Result<()> {
    let config = host.read_config()?;
    let supervisor = Supervisor::new(
        Box::new(ProcessLauncher),
        host.data_dir(),
        host_platform(host),
    );
    let spec = supervisor.launch_spec(&config);

    println!("{}", Theme::header("Bot launch command"));
    println!("  program: {}", spec.program.display());
    println!("  cwd:     {}", spec.cwd.display());
    println!();

    let mut args = spec.args.iter();
    if let Some(script) = args.next() {
        println!("  {:>2}  {:<22}{}", 0, "script".dimmed(), script);
    }
    for (i, (name, value)) in ARGUMENT_NAMES.iter().zip(args).enumerate() {
        let shown = if i == 0 { redact(value) } else { value.clone() };
        println!("  {:>2}  {:<22}{}", i.saturating_add(1), name.dimmed(), shown);
    }
    Ok(())
}

/// Mask a secret, keeping only its length visible.
fn redact(secret: &str) -> String {
    if secret.is_empty() {
        "<unset>".to_owned()
    } else {
        format!("<redacted, {} chars>", secret.chars().count())
    }
}

#[cfg(test)]
mod tests {
    use discordum_runtime::args::EXTENDED_ARG_COUNT;

    use super::*;

    #[test]
    fn test_redact_hides_token() {
        assert_eq!(redact(""), "<unset>");
        let shown = redact("MTIz.abc.def");
        assert!(!shown.contains("abc"));
        assert_eq!(shown, "<redacted, 12 chars>");
    }

    #[test]
    fn test_every_extended_argument_is_named() {
        assert_eq!(ARGUMENT_NAMES.len(), EXTENDED_ARG_COUNT);
    }
}
