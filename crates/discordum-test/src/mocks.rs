//! Mock implementations for testing.
//!
//! Every mock keeps its state behind `Arc<Mutex<_>>` and is `Clone`, so a
//! test can hand one clone to the code under test (boxed, by value) and keep
//! another to inspect afterwards.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use discordum_runtime::{
    ChildExit, ChildHandle, CommandSender, Fetcher, Host, LaunchSpec, Launcher, ProvisionError,
    ProvisionResult,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Host / sender
// ---------------------------------------------------------------------------

/// A command registration seen by [`MockHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCommand {
    /// Command label.
    pub name: String,
    /// Permission the host was told to check.
    pub permission: String,
}

/// Mock implementation of [`Host`] rooted at a scratch directory.
#[derive(Debug, Clone)]
pub struct MockHost {
    data_dir: PathBuf,
    os_name: String,
    commands: Arc<Mutex<Vec<RegisteredCommand>>>,
}

impl MockHost {
    /// Host reporting `linux` with its data in `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            os_name: "linux".to_owned(),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Report `os_name` instead of `linux`.
    #[must_use]
    pub fn with_os_name(mut self, os_name: impl Into<String>) -> Self {
        self.os_name = os_name.into();
        self
    }

    /// Commands registered so far.
    #[must_use]
    pub fn registered_commands(&self) -> Vec<RegisteredCommand> {
        lock(&self.commands).clone()
    }
}

impl Host for MockHost {
    fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn os_name(&self) -> String {
        self.os_name.clone()
    }

    fn register_command(&mut self, name: &str, permission: &str) {
        lock(&self.commands).push(RegisteredCommand {
            name: name.to_owned(),
            permission: permission.to_owned(),
        });
    }
}

/// Mock [`CommandSender`] with a fixed permission set that records replies.
#[derive(Debug, Clone, Default)]
pub struct MockSender {
    permissions: Vec<String>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl MockSender {
    /// Sender without permissions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `permission`.
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Replies received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }
}

impl CommandSender for MockSender {
    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    fn send_message(&self, message: &str) {
        lock(&self.messages).push(message.to_owned());
    }
}

// ---------------------------------------------------------------------------
// Launcher / children
// ---------------------------------------------------------------------------

/// How a [`MockChild`] behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildScript {
    /// Exits with code 0 as soon as `STOP\n` arrives on stdin.
    #[default]
    Cooperative,
    /// Ignores stdin; only a kill ends it.
    Stubborn,
    /// Writing to stdin fails with a broken pipe.
    BrokenStdin,
    /// Ignores stdin and fails to be killed.
    Unkillable,
    /// Already exited with this code when first polled.
    Exited(i32),
}

/// What happened to one mock child.
#[derive(Debug, Clone)]
pub struct ChildRecord {
    /// Fake process id.
    pub pid: u32,
    /// Launch parameters.
    pub spec: LaunchSpec,
    /// Behaviour it was scripted with.
    pub script: ChildScript,
    /// When it was launched.
    pub started_at: Instant,
    /// When it exited or was killed.
    pub ended_at: Option<Instant>,
    /// Everything written to its stdin.
    pub stdin: Vec<u8>,
    /// Number of kill requests.
    pub kills: usize,
    /// How it ended.
    pub exit: Option<ChildExit>,
}

impl ChildRecord {
    fn finish(&mut self, exit: ChildExit) {
        if self.exit.is_none() {
            self.exit = Some(exit);
            self.ended_at = Some(Instant::now());
        }
    }
}

#[derive(Debug)]
struct LauncherState {
    scripts: VecDeque<ChildScript>,
    default_script: ChildScript,
    fail_launch: bool,
    next_pid: u32,
    children: Vec<Arc<Mutex<ChildRecord>>>,
}

/// Mock [`Launcher`] producing scripted [`MockChild`]ren.
#[derive(Debug, Clone)]
pub struct MockLauncher {
    state: Arc<Mutex<LauncherState>>,
}

impl Default for MockLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLauncher {
    /// Launcher whose children are [`ChildScript::Cooperative`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LauncherState {
                scripts: VecDeque::new(),
                default_script: ChildScript::Cooperative,
                fail_launch: false,
                next_pid: 4000,
                children: Vec::new(),
            })),
        }
    }

    /// Script for children once the queued scripts run out.
    #[must_use]
    pub fn with_default_script(self, script: ChildScript) -> Self {
        lock(&self.state).default_script = script;
        self
    }

    /// Queue a script for the next launched child.
    #[must_use]
    pub fn with_script(self, script: ChildScript) -> Self {
        lock(&self.state).scripts.push_back(script);
        self
    }

    /// Make every launch fail with `NotFound` until reset.
    pub fn set_fail_launch(&self, fail: bool) {
        lock(&self.state).fail_launch = fail;
    }

    /// Snapshot of every child launched so far, in launch order.
    #[must_use]
    pub fn children(&self) -> Vec<ChildRecord> {
        lock(&self.state)
            .children
            .iter()
            .map(|c| lock(c).clone())
            .collect()
    }

    /// Number of launches.
    #[must_use]
    pub fn launch_count(&self) -> usize {
        lock(&self.state).children.len()
    }
}

impl Launcher for MockLauncher {
    fn launch(&self, spec: &LaunchSpec) -> io::Result<Box<dyn ChildHandle>> {
        let mut state = lock(&self.state);
        if state.fail_launch {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", spec.program.display()),
            ));
        }

        let script = state.scripts.pop_front().unwrap_or(state.default_script);
        let pid = state.next_pid;
        state.next_pid = pid.saturating_add(1);

        let mut record = ChildRecord {
            pid,
            spec: spec.clone(),
            script,
            started_at: Instant::now(),
            ended_at: None,
            stdin: Vec::new(),
            kills: 0,
            exit: None,
        };
        if let ChildScript::Exited(code) = script {
            record.finish(ChildExit::code(code));
        }

        let record = Arc::new(Mutex::new(record));
        state.children.push(Arc::clone(&record));
        Ok(Box::new(MockChild { record }))
    }
}

/// Handle to a scripted child created by [`MockLauncher`].
#[derive(Debug)]
pub struct MockChild {
    record: Arc<Mutex<ChildRecord>>,
}

impl ChildHandle for MockChild {
    fn id(&self) -> u32 {
        lock(&self.record).pid
    }

    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let mut record = lock(&self.record);
        if record.script == ChildScript::BrokenStdin || record.exit.is_some() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin closed"));
        }
        record.stdin.extend_from_slice(data);
        if record.script == ChildScript::Cooperative
            && record.stdin.windows(5).any(|w| w == b"STOP\n")
        {
            record.finish(ChildExit::code(0));
        }
        Ok(())
    }

    fn try_wait(&mut self) -> io::Result<Option<ChildExit>> {
        Ok(lock(&self.record).exit)
    }

    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ChildExit>> {
        if let Some(exit) = lock(&self.record).exit {
            return Ok(Some(exit));
        }
        std::thread::sleep(timeout);
        Ok(lock(&self.record).exit)
    }

    fn kill(&mut self) -> io::Result<()> {
        let mut record = lock(&self.record);
        record.kills = record.kills.saturating_add(1);
        if record.script == ChildScript::Unkillable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "operation not permitted",
            ));
        }
        record.finish(ChildExit { code: None });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct FetcherState {
    body: Option<Vec<u8>>,
    urls: Vec<String>,
}

/// Mock [`Fetcher`] serving a fixed body, or failing when it has none.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    state: Arc<Mutex<FetcherState>>,
}

impl MockFetcher {
    /// Fetcher answering every URL with `body`.
    #[must_use]
    pub fn serving(body: Vec<u8>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FetcherState {
                body: Some(body),
                urls: Vec::new(),
            })),
        }
    }

    /// Fetcher failing every request.
    #[must_use]
    pub fn failing() -> Self {
        Self::default()
    }

    /// URLs requested so far.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        lock(&self.state).urls.clone()
    }

    /// Number of requests.
    #[must_use]
    pub fn calls(&self) -> usize {
        lock(&self.state).urls.len()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> ProvisionResult<u64> {
        let mut state = lock(&self.state);
        state.urls.push(url.to_owned());
        let Some(body) = &state.body else {
            return Err(ProvisionError::Download {
                url: url.to_owned(),
                message: "connection refused".to_owned(),
            });
        };
        std::fs::write(dest, body).map_err(|e| ProvisionError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
        Ok(body.len() as u64)
    }
}
