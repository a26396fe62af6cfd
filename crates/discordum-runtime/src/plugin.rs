//! Plugin lifecycle: enable, disable, reload.
//!
//! Provisioning runs synchronously inside enable and reload. Each stage is
//! attempted and its outcome kept in a [`ProvisionReport`]; whether the bot
//! is launched after a failed stage depends on
//! `provisioning.abort-on-failure`.

use std::fmt;
use std::time::Duration;

use discordum_config::Config;
use tracing::{error, info, warn};

use crate::command::{CommandOutcome, DcumCommand};
use crate::error::{PluginError, PluginResult, ProvisionResult};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::host::{CommandSender, Host, host_platform};
use crate::install::{DependencyInstaller, InstallOutcome};
use crate::platform::{Platform, RUNTIME_DIR};
use crate::process::{Launcher, ProcessLauncher};
use crate::provision::{RuntimeOutcome, RuntimeProvisioner};
use crate::resources;
use crate::supervisor::{Supervisor, SupervisorState};

/// Outcome of every provisioning stage of one enable or reload pass.
#[derive(Debug)]
pub struct ProvisionReport {
    /// Bundled files written (count of new files).
    pub resources: ProvisionResult<usize>,
    /// Runtime presence or installation.
    pub runtime: ProvisionResult<RuntimeOutcome>,
    /// Dependency presence or installation.
    pub dependencies: ProvisionResult<InstallOutcome>,
}

impl ProvisionReport {
    /// Number of stages that returned an error.
    #[must_use]
    pub fn failures(&self) -> usize {
        [
            self.resources.is_err(),
            self.runtime.is_err(),
            self.dependencies.is_err(),
        ]
        .into_iter()
        .filter(|failed| *failed)
        .count()
    }

    /// Whether every stage succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures() == 0
    }
}

impl fmt::Display for ProvisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn stage<T: fmt::Debug>(r: &ProvisionResult<T>) -> String {
            match r {
                Ok(v) => format!("{v:?}"),
                Err(e) => format!("failed ({e})"),
            }
        }
        write!(
            f,
            "resources: {}, runtime: {}, dependencies: {}",
            stage(&self.resources),
            stage(&self.runtime),
            stage(&self.dependencies)
        )
    }
}

/// The Dynamic Discord UM+ plugin bound to a host.
#[derive(Debug)]
pub struct DiscordUm<H: Host> {
    host: H,
    platform: Platform,
    supervisor: Supervisor,
    fetcher: Option<Box<dyn Fetcher>>,
    installer: DependencyInstaller,
    command_registered: bool,
}

impl<H: Host> DiscordUm<H> {
    /// Plugin using real processes and HTTP downloads.
    pub fn new(host: H) -> Self {
        Self::with_launcher(host, Box::new(ProcessLauncher))
    }

    /// Plugin spawning the bot through `launcher`.
    pub fn with_launcher(host: H, launcher: Box<dyn Launcher>) -> Self {
        let platform = host_platform(&host);
        let supervisor = Supervisor::new(launcher, host.data_dir(), platform);
        Self {
            host,
            platform,
            supervisor,
            fetcher: None,
            installer: DependencyInstaller::new(),
            command_registered: false,
        }
    }

    /// Download runtime archives through `fetcher` instead of HTTP.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replace the dependency installer.
    #[must_use]
    pub fn with_installer(mut self, installer: DependencyInstaller) -> Self {
        self.installer = installer;
        self
    }

    /// Override how long the bot gets to stop before it is killed.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.supervisor = self.supervisor.with_shutdown_timeout(timeout);
        self
    }

    /// The host this plugin is bound to.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Platform detected from the host.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// State of the bot process.
    pub fn bot_state(&mut self) -> SupervisorState {
        self.supervisor.state()
    }

    /// Bring the plugin up: write default files, provision, start the bot,
    /// and register `/dcum`. The command is registered even when an earlier
    /// step fails.
    ///
    /// # Errors
    ///
    /// - [`PluginError::Config`] if the configuration cannot be written,
    ///   read, or validated
    /// - [`PluginError::ProvisioningFailed`] if a stage failed and
    ///   `abort-on-failure` is set
    /// - [`PluginError::Supervisor`] if the bot cannot be spawned
    pub fn enable(&mut self) -> PluginResult<ProvisionReport> {
        let started = self
            .prepare()
            .and_then(|(config, report)| self.launch(&config, &report).map(|()| report));
        // Registered even on failure so the operator can fix things and reload.
        self.register_command();
        let report = started?;

        info!(platform = %self.platform, "Dynamic Discord UM+ enabled");
        Ok(report)
    }

    /// Write default files and run every provisioning stage without
    /// launching the bot.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Config`] if the configuration cannot be
    /// written, read, or validated. Stage failures are reported in the
    /// returned [`ProvisionReport`].
    pub fn provision(&self) -> PluginResult<ProvisionReport> {
        self.prepare().map(|(_, report)| report)
    }

    /// Stop the bot. Blocks for at most the shutdown timeout.
    pub fn disable(&mut self) {
        self.supervisor.stop();
        info!("Dynamic Discord UM+ disabled");
    }

    /// Stop the bot, re-read the configuration, re-check provisioning, and
    /// start the bot again.
    ///
    /// # Errors
    ///
    /// Same as [`DiscordUm::enable`]. The old bot is stopped in every case.
    pub fn reload(&mut self) -> PluginResult<ProvisionReport> {
        info!("reloading Dynamic Discord UM+");
        self.supervisor.stop();

        let config = self.host.read_config()?;
        let report = self.run_stages(&config);
        self.launch(&config, &report)?;

        info!("Dynamic Discord UM+ reloaded");
        Ok(report)
    }

    /// Dispatch a `/dcum` invocation from `sender`.
    pub fn handle_command(
        &mut self,
        sender: &dyn CommandSender,
        args: &[&str],
    ) -> CommandOutcome {
        DcumCommand::execute(self, sender, args)
    }

    fn prepare(&self) -> PluginResult<(Config, ProvisionReport)> {
        Config::save_default(self.host.data_dir())?;
        let config = self.host.read_config()?;
        let report = self.run_stages(&config);
        Ok((config, report))
    }

    /// Run every provisioning stage, logging each failure.
    fn run_stages(&self, config: &Config) -> ProvisionReport {
        let data_dir = self.host.data_dir();

        let resources = resources::extract_bundled(data_dir);
        if let Err(e) = &resources {
            error!(error = %e, "failed to extract bundled bot files");
        }

        let runtime = self.ensure_runtime(config);
        if let Err(e) = &runtime {
            error!(error = %e, "failed to provision Node.js");
        }

        let dependencies =
            self.installer
                .ensure_dependencies(data_dir, self.platform, &data_dir.join(RUNTIME_DIR));
        if let Err(e) = &dependencies {
            error!(error = %e, "failed to install bot dependencies");
        }

        ProvisionReport {
            resources,
            runtime,
            dependencies,
        }
    }

    fn ensure_runtime(&self, config: &Config) -> ProvisionResult<RuntimeOutcome> {
        let data_dir = self.host.data_dir();
        if let Some(fetcher) = &self.fetcher {
            return RuntimeProvisioner::new(fetcher.as_ref(), &config.runtime)
                .ensure_runtime(data_dir, self.platform);
        }
        let http = HttpFetcher::new(Duration::from_secs(config.runtime.download_timeout_secs))?;
        RuntimeProvisioner::new(&http, &config.runtime).ensure_runtime(data_dir, self.platform)
    }

    fn launch(&mut self, config: &Config, report: &ProvisionReport) -> PluginResult<()> {
        let failed = report.failures();
        if failed > 0 {
            if config.provisioning.abort_on_failure {
                error!(failed, "provisioning incomplete, not starting the bot");
                return Err(PluginError::ProvisioningFailed { failed });
            }
            warn!(failed, "provisioning incomplete, starting the bot anyway");
        }
        self.supervisor.start(config)?;
        Ok(())
    }

    fn register_command(&mut self) {
        if self.command_registered {
            return;
        }
        self.host
            .register_command(DcumCommand::NAME, DcumCommand::PERMISSION);
        self.command_registered = true;
    }
}
