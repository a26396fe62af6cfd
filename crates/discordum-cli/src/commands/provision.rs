//! `discordum provision`: prepare the data directory without starting the bot.

use anyhow::{Result, bail};
use discordum_runtime::{DiscordUm, Host, InstallOutcome, ProvisionReport, RuntimeOutcome};

use crate::console::ConsoleHost;
use crate::theme::Theme;

pub(crate) fn run_provision(host: ConsoleHost) -> Result<()> {
    println!("{}", Theme::header("Dynamic Discord UM+ provisioning"));
    println!(
        "  {}",
        Theme::dimmed(&format!("data dir: {}", host.data_dir().display()))
    );

    let plugin = DiscordUm::new(host);
    println!("  {}", Theme::dimmed(&format!("platform: {}", plugin.platform())));
    println!();

    let report = plugin.provision()?;
    print_report(&report);

    let failed = report.failures();
    if failed > 0 {
        bail!("{failed} provisioning stage(s) failed");
    }
    Ok(())
}

/// One line per provisioning stage.
pub(crate) fn print_report(report: &ProvisionReport) {
    for line in report_lines(report) {
        println!("  {line}");
    }
}

fn report_lines(report: &ProvisionReport) -> Vec<String> {
    let resources = match &report.resources {
        Ok(0) => Theme::success("bot files present"),
        Ok(n) => Theme::success(&format!("bot files written ({n})")),
        Err(e) => Theme::error(&format!("bot files: {e}")),
    };
    let runtime = match &report.runtime {
        Ok(RuntimeOutcome::AlreadyPresent) => Theme::success("Node.js present"),
        Ok(RuntimeOutcome::Installed) => Theme::success("Node.js installed"),
        Err(e) => Theme::error(&format!("Node.js: {e}")),
    };
    let dependencies = match &report.dependencies {
        Ok(InstallOutcome::AlreadyPresent) => Theme::success("dependencies present"),
        Ok(InstallOutcome::Ran { status }) if status.success() => {
            Theme::success("dependencies installed")
        },
        Ok(InstallOutcome::Ran { status }) => {
            Theme::warning(&format!("npm install finished with {status}"))
        },
        Err(e) => Theme::error(&format!("dependencies: {e}")),
    };
    vec![resources, runtime, dependencies]
}
