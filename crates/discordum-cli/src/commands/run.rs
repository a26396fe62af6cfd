//! `discordum run`: enable the plugin and serve console commands.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use discordum_runtime::{DiscordUm, Host};
use tracing::{debug, error};

use crate::commands::provision::print_report;
use crate::console::{ConsoleHost, ConsoleInput, ConsoleSender, parse_line};
use crate::theme::Theme;

pub(crate) fn run(host: ConsoleHost) -> Result<()> {
    println!("{}", Theme::header("Dynamic Discord UM+"));
    println!(
        "  {}",
        Theme::dimmed(&format!("data dir: {}", host.data_dir().display()))
    );

    let mut plugin = DiscordUm::new(host);
    enable(&mut plugin);

    println!(
        "{}",
        Theme::dimmed("Type `dcum reload` to reload or `stop` to shut down.")
    );
    let stdin = io::stdin();
    serve(&mut plugin, stdin.lock(), &mut io::stdout())?;

    plugin.disable();
    println!("{}", Theme::success("Stopped"));
    Ok(())
}

/// Enable the plugin, printing the outcome. A failed enable leaves the
/// console running so the operator can fix the config and reload.
fn enable(plugin: &mut DiscordUm<ConsoleHost>) {
    match plugin.enable() {
        Ok(report) => {
            print_report(&report);
            println!("{}", Theme::success("Bot started"));
        },
        Err(e) => {
            error!(error = %e, "enable failed");
            println!("{}", Theme::error(&format!("Enable failed: {e}")));
        },
    }
}

/// Answer console lines from `input` until `stop` or end of input.
fn serve<R: BufRead, W: Write>(
    plugin: &mut DiscordUm<ConsoleHost>,
    input: R,
    out: &mut W,
) -> io::Result<()> {
    let sender = ConsoleSender;
    for line in input.lines() {
        let line = line?;
        match parse_line(&line) {
            ConsoleInput::Empty => {},
            ConsoleInput::Stop => return Ok(()),
            ConsoleInput::Command { label, args } if plugin.host().has_command(label) => {
                debug!(command = label, ?args, "console command");
                plugin.handle_command(&sender, &args);
            },
            ConsoleInput::Command { label, .. } => {
                writeln!(
                    out,
                    "{}",
                    Theme::warning(&format!("Unknown command `{label}`. Try `dcum reload` or `stop`."))
                )?;
            },
        }
    }
    debug!("console input closed");
    Ok(())
}
