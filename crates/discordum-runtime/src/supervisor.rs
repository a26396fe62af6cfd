//! Single-owner supervision of the bot process.
//!
//! At most one child is alive per supervisor. Stopping is cooperative first:
//! the child is sent `STOP\n` on stdin and given [`SHUTDOWN_TIMEOUT`] to exit
//! before it is killed. [`Supervisor::reload`] observes the old child's end
//! before the new one is spawned.

use std::path::{Path, PathBuf};
use std::time::Duration;

use discordum_config::Config;
use tracing::{debug, error, info, warn};

use crate::args::build_arguments;
use crate::error::{SupervisorError, SupervisorResult};
use crate::platform::{BOT_SCRIPT, Platform, RUNTIME_DIR};
use crate::process::{ChildHandle, LaunchSpec, Launcher};

/// Line written to the child's stdin to request a clean exit.
pub const SHUTDOWN_SIGNAL: &[u8] = b"STOP\n";

/// How long a child gets to honour [`SHUTDOWN_SIGNAL`] before it is killed.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Observable state of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No child process.
    Stopped,
    /// A child process is alive.
    Running {
        /// Its process id.
        pid: u32,
    },
}

/// Owns the bot child process.
#[derive(Debug)]
pub struct Supervisor {
    launcher: Box<dyn Launcher>,
    data_dir: PathBuf,
    platform: Platform,
    shutdown_timeout: Duration,
    child: Option<Box<dyn ChildHandle>>,
}

impl Supervisor {
    /// Supervisor launching the bot from `data_dir` for `platform`.
    #[must_use]
    pub fn new(launcher: Box<dyn Launcher>, data_dir: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            launcher,
            data_dir: data_dir.into(),
            platform,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
            child: None,
        }
    }

    /// Override the shutdown grace period.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Grace period between `STOP` and a forced kill.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Data directory the bot runs in.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Current state. A child that exited on its own is dropped here.
    pub fn state(&mut self) -> SupervisorState {
        self.reap_exited();
        match &self.child {
            Some(child) => SupervisorState::Running { pid: child.id() },
            None => SupervisorState::Stopped,
        }
    }

    /// Whether a child process is alive.
    pub fn is_running(&mut self) -> bool {
        matches!(self.state(), SupervisorState::Running { .. })
    }

    /// The command line `start` would use for `config`.
    #[must_use]
    pub fn launch_spec(&self, config: &Config) -> LaunchSpec {
        let runtime = self
            .data_dir
            .join(RUNTIME_DIR)
            .join(self.platform.runtime_executable());
        let mut args = Vec::with_capacity(20);
        args.push(BOT_SCRIPT.to_owned());
        args.extend(build_arguments(config));
        LaunchSpec {
            program: runtime,
            args,
            cwd: self.data_dir.clone(),
        }
    }

    /// Launch the bot with arguments derived from `config`.
    ///
    /// # Errors
    ///
    /// - [`SupervisorError::AlreadyRunning`] if a child is alive
    /// - [`SupervisorError::Launch`] if the runtime cannot be spawned
    pub fn start(&mut self, config: &Config) -> SupervisorResult<u32> {
        if let SupervisorState::Running { pid } = self.state() {
            return Err(SupervisorError::AlreadyRunning { pid });
        }

        let spec = self.launch_spec(config);
        let child = self.launcher.launch(&spec).map_err(|source| {
            error!(program = %spec.program.display(), error = %source, "failed to start Discord bot");
            SupervisorError::Launch {
                program: spec.program.clone(),
                source,
            }
        })?;

        let pid = child.id();
        info!(pid, "Discord bot started");
        self.child = Some(child);
        Ok(pid)
    }

    /// Stop the bot, if running.
    ///
    /// Sends [`SHUTDOWN_SIGNAL`] and waits up to the shutdown timeout; a
    /// child that cannot be signalled or does not exit in time is killed.
    /// The handle is released in every case. Does nothing when stopped.
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();

        match child.try_wait() {
            Ok(Some(exit)) => {
                debug!(pid, %exit, "bot process had already exited");
                return;
            },
            Ok(None) => {},
            Err(e) => warn!(pid, error = %e, "could not query bot process state"),
        }

        info!(pid, "stopping Discord bot");
        if let Err(e) = child.send(SHUTDOWN_SIGNAL) {
            warn!(pid, error = %e, "could not send STOP to bot process, killing it");
            force_kill(child.as_mut(), pid);
            return;
        }

        match child.wait_timeout(self.shutdown_timeout) {
            Ok(Some(exit)) => info!(pid, %exit, "Discord bot stopped cleanly"),
            Ok(None) => {
                warn!(
                    pid,
                    timeout_secs = self.shutdown_timeout.as_secs_f64(),
                    "bot did not stop in time, killing it"
                );
                force_kill(child.as_mut(), pid);
            },
            Err(e) => {
                warn!(pid, error = %e, "waiting for bot process failed, killing it");
                force_kill(child.as_mut(), pid);
            },
        }
    }

    /// Stop the running bot, then start a new one from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Launch`] if the new child cannot be spawned;
    /// the old one is gone either way.
    pub fn reload(&mut self, config: &Config) -> SupervisorResult<u32> {
        self.stop();
        self.start(config)
    }

    fn reap_exited(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        if let Ok(Some(exit)) = child.try_wait() {
            warn!(pid = child.id(), %exit, "Discord bot exited on its own");
            self.child = None;
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn force_kill(child: &mut dyn ChildHandle, pid: u32) {
    if let Err(e) = child.kill() {
        error!(pid, error = %e, "failed to kill bot process");
    }
}
