//! Child process launching.
//!
//! The supervisor never touches `std::process` directly. It asks a
//! [`Launcher`] for a [`ChildHandle`], which lets tests substitute scripted
//! children that record when they started, what they were sent, and whether
//! they were killed.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

/// Everything needed to spawn the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Runtime executable.
    pub program: PathBuf,
    /// Script followed by its positional arguments.
    pub args: Vec<String>,
    /// Working directory of the child.
    pub cwd: PathBuf,
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    /// Exit code, or `None` when the child was terminated by a signal.
    pub code: Option<i32>,
}

impl ChildExit {
    /// Exit with status code `code`.
    #[must_use]
    pub fn code(code: i32) -> Self {
        Self { code: Some(code) }
    }
}

impl From<ExitStatus> for ChildExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// A running child process owned by the supervisor.
pub trait ChildHandle: Send {
    /// OS process id.
    fn id(&self) -> u32;

    /// Write `data` to the child's stdin and flush it.
    ///
    /// # Errors
    ///
    /// Fails if stdin is closed or the pipe is broken.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Non-blocking exit check.
    ///
    /// # Errors
    ///
    /// Fails if the OS cannot report the process state.
    fn try_wait(&mut self) -> io::Result<Option<ChildExit>>;

    /// Block until the child exits or `timeout` elapses; `None` on timeout.
    ///
    /// # Errors
    ///
    /// Fails if the OS cannot report the process state.
    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ChildExit>>;

    /// Forcefully terminate the child and reap it.
    ///
    /// # Errors
    ///
    /// Fails if the signal cannot be delivered.
    fn kill(&mut self) -> io::Result<()>;
}

impl fmt::Debug for dyn ChildHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildHandle").field("pid", &self.id()).finish()
    }
}

/// Spawns children for the supervisor.
pub trait Launcher: Send {
    /// Start a child described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns the spawn error unchanged.
    fn launch(&self, spec: &LaunchSpec) -> io::Result<Box<dyn ChildHandle>>;
}

impl fmt::Debug for dyn Launcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Launcher")
    }
}

/// [`Launcher`] backed by [`std::process::Command`].
///
/// stdin is piped for the shutdown handshake; stdout and stderr go to the
/// console of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, spec: &LaunchSpec) -> io::Result<Box<dyn ChildHandle>> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdin = child.stdin.take();
        Ok(Box::new(OsChild { child, stdin }))
    }
}

struct OsChild {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl ChildHandle for OsChild {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin not captured"))?;
        stdin.write_all(data)?;
        stdin.flush()
    }

    fn try_wait(&mut self) -> io::Result<Option<ChildExit>> {
        Ok(self.child.try_wait()?.map(ChildExit::from))
    }

    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ChildExit>> {
        Ok(ChildExt::wait_timeout(&mut self.child, timeout)?.map(ChildExit::from))
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.child.kill() {
            Ok(()) => {},
            // Already exited; reaping below still applies.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {},
            Err(e) => return Err(e),
        }
        self.child.wait().map(|_| ())
    }
}
