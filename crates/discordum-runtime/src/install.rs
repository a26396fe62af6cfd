//! npm dependency installation.
//!
//! Runs `npm install` once, with the provisioned runtime first on the search
//! path. The presence of `node_modules/` is the only record that it ran.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info, warn};

use crate::error::{ProvisionError, ProvisionResult};
use crate::platform::{DEPENDENCY_DIR, Platform};

/// Search-path variable name used when the environment has none.
const DEFAULT_PATH_KEY: &str = "PATH";

/// npm entry script, relative to the runtime root on non-Windows platforms.
const NPM_CLI: &str = "lib/node_modules/npm/bin/npm-cli.js";

/// What [`DependencyInstaller::ensure_dependencies`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// `node_modules/` already existed.
    AlreadyPresent,
    /// npm ran to completion with this status. A non-zero exit is logged but
    /// not treated as a failure.
    Ran {
        /// Exit status of the npm process.
        status: ExitStatus,
    },
}

/// A fully resolved npm command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmInvocation {
    /// Program to spawn.
    pub program: PathBuf,
    /// Arguments, ending in `install`.
    pub args: Vec<OsString>,
    /// Working directory (the data directory).
    pub cwd: PathBuf,
    /// Search-path variable name as found in the environment.
    pub path_key: OsString,
    /// Search-path value with the runtime bin directory prepended.
    pub path_value: OsString,
}

impl NpmInvocation {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .env(&self.path_key, &self.path_value)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }
}

/// Installs the bot's npm dependencies into the data directory.
#[derive(Debug, Clone, Default)]
pub struct DependencyInstaller {
    env: Option<HashMap<OsString, OsString>>,
}

impl DependencyInstaller {
    /// Installer reading the search path from the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installer reading the search path from `env` instead of the process
    /// environment.
    #[must_use]
    pub fn with_env<K, V>(env: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            env: Some(env.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// Run `npm install` in `data_dir` unless `node_modules/` exists.
    ///
    /// Blocks until npm exits; its output goes straight to the console.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Install`] if npm cannot be spawned.
    pub fn ensure_dependencies(
        &self,
        data_dir: &Path,
        platform: Platform,
        runtime_dir: &Path,
    ) -> ProvisionResult<InstallOutcome> {
        let marker = data_dir.join(DEPENDENCY_DIR);
        if marker.exists() {
            debug!(path = %marker.display(), "dependencies present");
            return Ok(InstallOutcome::AlreadyPresent);
        }

        let invocation = match &self.env {
            Some(env) => build_invocation(data_dir, runtime_dir, platform, env),
            None => build_invocation(
                data_dir,
                runtime_dir,
                platform,
                &std::env::vars_os().collect::<HashMap<_, _>>(),
            ),
        };

        info!(
            program = %invocation.program.display(),
            cwd = %invocation.cwd.display(),
            "installing bot dependencies"
        );
        let status = invocation
            .command()
            .status()
            .map_err(|source| ProvisionError::Install {
                program: invocation.program.clone(),
                source,
            })?;

        if status.success() {
            info!(%status, "npm install finished");
        } else {
            warn!(%status, "npm install exited with a failure status");
        }
        Ok(InstallOutcome::Ran { status })
    }
}

/// Resolve the npm command line for `platform`.
///
/// Windows runs `npm.cmd` from the runtime root; everywhere else the runtime
/// executes npm's entry script directly. The runtime bin directory is
/// prepended to the search path, whose variable is looked up
/// case-insensitively (`Path` on Windows). Names and values need not be
/// valid Unicode.
#[must_use]
pub fn build_invocation<S: ::std::hash::BuildHasher>(
    data_dir: &Path,
    runtime_dir: &Path,
    platform: Platform,
    env: &HashMap<OsString, OsString, S>,
) -> NpmInvocation {
    let (program, mut args) = match platform {
        Platform::Windows => (runtime_dir.join("npm.cmd"), Vec::new()),
        Platform::Linux | Platform::Unsupported => (
            runtime_dir.join(platform.runtime_executable()),
            vec![runtime_dir.join(NPM_CLI).into_os_string()],
        ),
    };
    args.push(OsString::from("install"));

    let path_key = env
        .keys()
        .find(|k| k.eq_ignore_ascii_case(DEFAULT_PATH_KEY))
        .cloned()
        .unwrap_or_else(|| OsString::from(DEFAULT_PATH_KEY));
    let relative_bin = platform.runtime_bin_dir();
    let bin_dir = if relative_bin.as_os_str().is_empty() {
        runtime_dir.to_path_buf()
    } else {
        runtime_dir.join(relative_bin)
    };
    let path_value = prepend_search_path(
        &bin_dir,
        env.get(&path_key).map(OsString::as_os_str),
        platform.path_list_separator(),
    );

    NpmInvocation {
        program,
        args,
        cwd: data_dir.to_path_buf(),
        path_key,
        path_value,
    }
}

/// `dir` followed by `existing`, joined with `separator`. An empty or
/// missing `existing` yields `dir` alone.
#[must_use]
pub fn prepend_search_path(dir: &Path, existing: Option<&OsStr>, separator: char) -> OsString {
    let mut value = dir.as_os_str().to_os_string();
    if let Some(rest) = existing.filter(|s| !s.is_empty()) {
        value.push(separator.to_string());
        value.push(rest);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<OsString, OsString> {
        pairs
            .iter()
            .map(|(k, v)| (OsString::from(*k), OsString::from(*v)))
            .collect()
    }

    #[test]
    #[cfg(unix)]
    fn linux_invocation_runs_npm_cli_through_node() {
        let data = Path::new("/srv/plugins/DiscordUM");
        let runtime = data.join("node");
        let inv = build_invocation(
            data,
            &runtime,
            Platform::Linux,
            &env(&[("PATH", "/usr/bin:/bin")]),
        );

        assert_eq!(inv.program, runtime.join("bin/node"));
        assert_eq!(
            inv.args,
            vec![
                runtime.join("lib/node_modules/npm/bin/npm-cli.js").into_os_string(),
                OsString::from("install"),
            ]
        );
        assert_eq!(inv.cwd, data);
        assert_eq!(inv.path_key, OsStr::new("PATH"));
        assert_eq!(
            inv.path_value,
            OsString::from("/srv/plugins/DiscordUM/node/bin:/usr/bin:/bin")
        );
    }

    #[test]
    fn windows_invocation_uses_npm_cmd_and_path_key_case() {
        let data = Path::new("data");
        let runtime = data.join("node");
        let inv = build_invocation(
            data,
            &runtime,
            Platform::Windows,
            &env(&[("Path", r"C:\Windows"), ("TEMP", r"C:\Temp")]),
        );

        assert_eq!(inv.program, runtime.join("npm.cmd"));
        assert_eq!(inv.args, vec![OsString::from("install")]);
        assert_eq!(inv.path_key, OsStr::new("Path"));

        let mut expected = runtime.into_os_string();
        expected.push(r";C:\Windows");
        assert_eq!(inv.path_value, expected);
    }

    #[test]
    #[cfg(unix)]
    fn missing_path_defaults_to_path_key() {
        let inv = build_invocation(
            Path::new("d"),
            Path::new("d/node"),
            Platform::Linux,
            &env(&[("HOME", "/root")]),
        );
        assert_eq!(inv.path_key, OsStr::new("PATH"));
        assert_eq!(inv.path_value, Path::new("d/node/bin").as_os_str());
    }

    #[test]
    #[cfg(unix)]
    fn non_unicode_environment_still_gets_runtime_prepended() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let env: HashMap<OsString, OsString> = [
            (OsString::from("BADVAR"), OsString::from_vec(vec![0xff])),
            (OsString::from("Path"), OsString::from_vec(b"/opt/\xffbin:/usr/bin".to_vec())),
        ]
        .into_iter()
        .collect();

        let inv = build_invocation(Path::new("d"), Path::new("d/node"), Platform::Linux, &env);

        assert_eq!(inv.path_key, OsStr::new("Path"));
        assert_eq!(inv.path_value.as_bytes(), b"d/node/bin:/opt/\xffbin:/usr/bin");
    }

    #[test]
    #[cfg(unix)]
    fn installer_runs_with_non_unicode_variables() {
        use std::os::unix::ffi::OsStringExt;

        let tmp = tempfile::tempdir().unwrap();
        let runtime = tmp.path().join("node");
        fake_node(&runtime, "#!/bin/sh\nmkdir node_modules\n");

        let outcome = DependencyInstaller::with_env([
            (OsString::from("BADVAR"), OsString::from_vec(vec![0xff, 0xfe])),
            (OsString::from("PATH"), OsString::from("/usr/bin:/bin")),
        ])
        .ensure_dependencies(tmp.path(), Platform::Linux, &runtime)
        .unwrap();

        assert!(matches!(outcome, InstallOutcome::Ran { status } if status.success()));
        assert!(tmp.path().join("node_modules").is_dir());
    }

    #[test]
    fn prepend_joins_with_separator() {
        assert_eq!(
            prepend_search_path(Path::new("/opt/node/bin"), Some(OsStr::new("/usr/bin")), ':'),
            OsString::from("/opt/node/bin:/usr/bin")
        );
        assert_eq!(
            prepend_search_path(Path::new("/opt/node/bin"), Some(OsStr::new("")), ':'),
            OsString::from("/opt/node/bin")
        );
        assert_eq!(
            prepend_search_path(Path::new("/opt/node/bin"), None, ':'),
            OsString::from("/opt/node/bin")
        );
    }

    #[test]
    fn existing_node_modules_skips_npm() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("node_modules")).unwrap();

        let outcome = DependencyInstaller::new()
            .ensure_dependencies(tmp.path(), Platform::Linux, &tmp.path().join("node"))
            .unwrap();
        assert_eq!(outcome, InstallOutcome::AlreadyPresent);
    }

    #[test]
    fn missing_runtime_is_install_error() {
        let tmp = tempfile::tempdir().unwrap();

        let err = DependencyInstaller::with_env([("PATH", "/usr/bin")])
            .ensure_dependencies(tmp.path(), Platform::Linux, &tmp.path().join("node"))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Install { .. }), "{err}");
    }

    #[cfg(unix)]
    fn fake_node(runtime: &Path, script: &str) {
        use std::os::unix::fs::PermissionsExt;

        let bin = runtime.join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let node = bin.join("node");
        std::fs::write(&node, script).unwrap();
        std::fs::set_permissions(&node, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn runs_in_data_dir_with_runtime_on_path() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path();
        let runtime = data.join("node");
        fake_node(
            &runtime,
            "#!/bin/sh\n[ \"$2\" = install ] || exit 3\nmkdir node_modules\necho \"$PATH\" > node_modules/path.txt\n",
        );

        let outcome = DependencyInstaller::with_env([("PATH", "/usr/bin:/bin")])
            .ensure_dependencies(data, Platform::Linux, &runtime)
            .unwrap();

        let InstallOutcome::Ran { status } = outcome else {
            panic!("expected npm to run, got {outcome:?}");
        };
        assert!(status.success());
        let path = std::fs::read_to_string(data.join("node_modules/path.txt")).unwrap();
        assert!(path.trim().starts_with(&runtime.join("bin").display().to_string()));
        assert!(path.trim().ends_with(":/usr/bin:/bin"));
    }

    #[test]
    #[cfg(unix)]
    fn failing_npm_is_reported_not_raised() {
        let tmp = tempfile::tempdir().unwrap();
        let runtime = tmp.path().join("node");
        fake_node(&runtime, "#!/bin/sh\nexit 7\n");

        let outcome = DependencyInstaller::with_env([("PATH", "/usr/bin:/bin")])
            .ensure_dependencies(tmp.path(), Platform::Linux, &runtime)
            .unwrap();

        let InstallOutcome::Ran { status } = outcome else {
            panic!("expected npm to run, got {outcome:?}");
        };
        assert_eq!(status.code(), Some(7));
    }
}
