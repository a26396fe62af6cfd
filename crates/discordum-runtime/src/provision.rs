//! Node.js runtime provisioning.
//!
//! The runtime lives in `{data_dir}/node/`. Presence of the platform
//! executable is re-checked on every pass, so deleting the directory by hand
//! triggers a fresh download on the next enable or reload.

use std::fs;
use std::path::{Path, PathBuf};

use discordum_config::RuntimeSection;
use tracing::{debug, error, info, warn};

use crate::archive;
use crate::error::{ProvisionError, ProvisionResult};
use crate::fetch::Fetcher;
use crate::platform::{ArchiveKind, Platform, RUNTIME_DIR, TEMP_ARCHIVE};

/// Name the wrapper directory is moved to while its contents are lifted.
const FLATTEN_STAGING: &str = ".flatten-staging";

/// What [`RuntimeProvisioner::ensure_runtime`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeOutcome {
    /// The executable was already in place; nothing was fetched.
    AlreadyPresent,
    /// The runtime was downloaded and unpacked.
    Installed,
}

/// Downloads and unpacks the runtime when it is missing.
pub struct RuntimeProvisioner<'a> {
    fetcher: &'a dyn Fetcher,
    sources: &'a RuntimeSection,
}

impl<'a> RuntimeProvisioner<'a> {
    /// Provisioner fetching through `fetcher` from the URLs in `sources`.
    #[must_use]
    pub fn new(fetcher: &'a dyn Fetcher, sources: &'a RuntimeSection) -> Self {
        Self { fetcher, sources }
    }

    /// Make sure `{data_dir}/node/` holds a runtime for `platform`.
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::UnsupportedPlatform`] when no distribution exists
    /// - [`ProvisionError::Download`] when the archive cannot be fetched
    /// - [`ProvisionError::Extract`] when the archive cannot be unpacked
    /// - [`ProvisionError::MissingExecutable`] when the unpacked tree has no
    ///   executable at the expected place
    pub fn ensure_runtime(
        &self,
        data_dir: &Path,
        platform: Platform,
    ) -> ProvisionResult<RuntimeOutcome> {
        let runtime_dir = data_dir.join(RUNTIME_DIR);
        let executable = runtime_dir.join(platform.runtime_executable());
        if executable.exists() {
            debug!(path = %executable.display(), "Node.js runtime present");
            return Ok(RuntimeOutcome::AlreadyPresent);
        }

        let (Some(url), Some(kind)) = (
            platform.download_url(self.sources),
            platform.archive_kind(),
        ) else {
            error!(%platform, "unsupported operating system, cannot provision Node.js");
            return Err(ProvisionError::UnsupportedPlatform(platform));
        };

        fs::create_dir_all(data_dir).map_err(|e| ProvisionError::io(data_dir, e))?;
        let temp = data_dir.join(TEMP_ARCHIVE);

        info!(%platform, url, "Node.js not found, downloading");
        if let Err(e) = self.fetcher.fetch(url, &temp) {
            remove_temp(&temp);
            return Err(e);
        }

        let unpacked = reset_dir(&runtime_dir).and_then(|()| {
            info!(path = %runtime_dir.display(), "extracting Node.js");
            let entries = match kind {
                ArchiveKind::Zip => archive::unpack_zip(&temp, &runtime_dir)?,
                ArchiveKind::TarXz => archive::unpack_tar_xz(&temp, &runtime_dir)?,
            };
            Ok(entries)
        });
        remove_temp(&temp);
        let entries = unpacked?;

        flatten(&runtime_dir)?;

        if !executable.exists() {
            error!(path = %executable.display(), "Node.js executable missing after extraction");
            return Err(ProvisionError::MissingExecutable(executable));
        }

        info!(entries, path = %runtime_dir.display(), "Node.js installed");
        Ok(RuntimeOutcome::Installed)
    }
}

/// Lift the contents of the first subdirectory of `dir` one level up.
///
/// Distribution archives wrap everything in a versioned directory
/// (`node-v18.19.0-linux-x64/`). The first subdirectory by name is taken as
/// the wrapper; its entries are moved into `dir` and the emptied wrapper is
/// removed. Entries colliding with a name already in `dir` stay behind in
/// the wrapper, which keeps its original name. Returns `false` when `dir` has
/// no subdirectory.
///
/// # Errors
///
/// Returns [`ProvisionError::Io`] when `dir` cannot be listed or the wrapper
/// cannot be moved.
pub fn flatten(dir: &Path) -> ProvisionResult<bool> {
    let Some(wrapper) = first_subdirectory(dir)? else {
        debug!(path = %dir.display(), "nothing to flatten");
        return Ok(false);
    };

    // Move the wrapper aside first so an entry sharing its name can land.
    let staging = dir.join(FLATTEN_STAGING);
    if staging.exists() {
        warn!(path = %staging.display(), "removing stale flatten staging directory");
        fs::remove_dir_all(&staging).map_err(|e| ProvisionError::io(&staging, e))?;
    }
    fs::rename(&wrapper, &staging).map_err(|e| ProvisionError::io(&wrapper, e))?;

    let entries = fs::read_dir(&staging).map_err(|e| ProvisionError::io(&staging, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ProvisionError::io(&staging, e))?;
        let target = dir.join(entry.file_name());
        if target.exists() {
            warn!(path = %target.display(), "flatten target exists, leaving entry in place");
            continue;
        }
        fs::rename(entry.path(), &target).map_err(|e| ProvisionError::io(entry.path(), e))?;
    }

    if let Err(e) = fs::remove_dir(&staging) {
        restore_wrapper(&staging, &wrapper, &e);
    }
    debug!(wrapper = %wrapper.display(), "flattened runtime directory");
    Ok(true)
}

/// Put the leftovers of a partial flatten back under the wrapper's own name.
/// They stay under the staging name only when that name is taken.
fn restore_wrapper(staging: &Path, wrapper: &Path, cause: &std::io::Error) {
    if wrapper.symlink_metadata().is_err() && fs::rename(staging, wrapper).is_ok() {
        warn!(
            wrapper = %wrapper.display(),
            error = %cause,
            "wrapper not empty after flatten, kept the colliding entries in it"
        );
    } else {
        warn!(
            wrapper = %wrapper.display(),
            path = %staging.display(),
            error = %cause,
            "wrapper not empty after flatten, colliding entries left in staging"
        );
    }
}

fn first_subdirectory(dir: &Path) -> ProvisionResult<Option<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| ProvisionError::io(dir, e))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ProvisionError::io(dir, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| ProvisionError::io(entry.path(), e))?
            .is_dir();
        if is_dir && entry.file_name() != FLATTEN_STAGING {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs.into_iter().next())
}

/// Remove a partial runtime directory and recreate it empty.
fn reset_dir(dir: &Path) -> ProvisionResult<()> {
    if dir.exists() {
        warn!(path = %dir.display(), "removing incomplete runtime directory");
        fs::remove_dir_all(dir).map_err(|e| ProvisionError::io(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| ProvisionError::io(dir, e))
}

fn remove_temp(temp: &Path) {
    match fs::remove_file(temp) {
        Ok(()) => debug!(path = %temp.display(), "removed temporary archive"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
        Err(e) => warn!(path = %temp.display(), error = %e, "failed to remove temporary archive"),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use discordum_test::archives::{TarEntry, write_tar_xz, write_zip};

    use super::*;

    /// Serves a prepared archive and counts calls.
    struct ArchiveFetcher {
        archive: PathBuf,
        calls: Cell<usize>,
    }

    impl ArchiveFetcher {
        fn new(archive: PathBuf) -> Self {
            Self {
                archive,
                calls: Cell::new(0),
            }
        }
    }

    impl Fetcher for ArchiveFetcher {
        fn fetch(&self, _url: &str, dest: &Path) -> ProvisionResult<u64> {
            self.calls.set(self.calls.get().saturating_add(1));
            fs::copy(&self.archive, dest).map_err(|e| ProvisionError::io(dest, e))
        }
    }

    struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        fn fetch(&self, url: &str, dest: &Path) -> ProvisionResult<u64> {
            fs::write(dest, b"partial").unwrap();
            Err(ProvisionError::Download {
                url: url.to_owned(),
                message: "connection reset".into(),
            })
        }
    }

    fn linux_archive(dir: &Path) -> PathBuf {
        let archive = dir.join("fixture.tar.xz");
        write_tar_xz(
            &archive,
            &[
                TarEntry::file("node-v18.19.0-linux-x64/bin/node", b"\x7fELF", 0o755),
                TarEntry::file(
                    "node-v18.19.0-linux-x64/lib/node_modules/npm/bin/npm-cli.js",
                    b"//",
                    0o644,
                ),
                TarEntry::file("node-v18.19.0-linux-x64/LICENSE", b"MIT", 0o644),
            ],
        );
        archive
    }

    #[test]
    fn installs_and_flattens_linux_runtime() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ArchiveFetcher::new(linux_archive(tmp.path()));
        let sources = RuntimeSection::default();
        let data = tmp.path().join("data");

        let outcome = RuntimeProvisioner::new(&fetcher, &sources)
            .ensure_runtime(&data, Platform::Linux)
            .unwrap();

        assert_eq!(outcome, RuntimeOutcome::Installed);
        assert!(data.join("node/bin/node").is_file());
        assert!(data.join("node/lib/node_modules/npm/bin/npm-cli.js").is_file());
        assert!(data.join("node/LICENSE").is_file());
        assert!(!data.join("node/node-v18.19.0-linux-x64").exists());
        assert!(!data.join(TEMP_ARCHIVE).exists());
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ArchiveFetcher::new(linux_archive(tmp.path()));
        let sources = RuntimeSection::default();
        let provisioner = RuntimeProvisioner::new(&fetcher, &sources);
        let data = tmp.path().join("data");

        provisioner.ensure_runtime(&data, Platform::Linux).unwrap();
        let second = provisioner.ensure_runtime(&data, Platform::Linux).unwrap();

        assert_eq!(second, RuntimeOutcome::AlreadyPresent);
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn deleted_runtime_is_reinstalled() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ArchiveFetcher::new(linux_archive(tmp.path()));
        let sources = RuntimeSection::default();
        let provisioner = RuntimeProvisioner::new(&fetcher, &sources);
        let data = tmp.path().join("data");

        provisioner.ensure_runtime(&data, Platform::Linux).unwrap();
        fs::remove_dir_all(data.join("node")).unwrap();
        let again = provisioner.ensure_runtime(&data, Platform::Linux).unwrap();

        assert_eq!(again, RuntimeOutcome::Installed);
        assert_eq!(fetcher.calls.get(), 2);
    }

    #[test]
    fn installs_windows_runtime_from_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("fixture.zip");
        write_zip(
            &archive,
            &[
                ("node-v18.19.0-win-x64/node.exe", b"MZ".as_slice()),
                ("node-v18.19.0-win-x64/npm.cmd", b"@echo off".as_slice()),
            ],
        );
        let fetcher = ArchiveFetcher::new(archive);
        let sources = RuntimeSection::default();
        let data = tmp.path().join("data");

        let outcome = RuntimeProvisioner::new(&fetcher, &sources)
            .ensure_runtime(&data, Platform::Windows)
            .unwrap();

        assert_eq!(outcome, RuntimeOutcome::Installed);
        assert!(data.join("node/node.exe").is_file());
        assert!(data.join("node/npm.cmd").is_file());
    }

    #[test]
    fn unsupported_platform_fetches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ArchiveFetcher::new(tmp.path().join("unused"));
        let sources = RuntimeSection::default();

        let err = RuntimeProvisioner::new(&fetcher, &sources)
            .ensure_runtime(tmp.path(), Platform::Unsupported)
            .unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::UnsupportedPlatform(Platform::Unsupported)
        ));
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn failed_download_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let sources = RuntimeSection::default();

        let err = RuntimeProvisioner::new(&FailingFetcher, &sources)
            .ensure_runtime(tmp.path(), Platform::Linux)
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Download { .. }));
        assert!(!tmp.path().join(TEMP_ARCHIVE).exists());
        assert!(!tmp.path().join("node").exists());
    }

    #[test]
    fn corrupt_archive_is_extract_error_and_temp_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let garbage = tmp.path().join("garbage");
        fs::write(&garbage, b"not an archive").unwrap();
        let fetcher = ArchiveFetcher::new(garbage);
        let sources = RuntimeSection::default();
        let data = tmp.path().join("data");

        let err = RuntimeProvisioner::new(&fetcher, &sources)
            .ensure_runtime(&data, Platform::Linux)
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Extract(_)), "{err}");
        assert!(!data.join(TEMP_ARCHIVE).exists());
    }

    #[test]
    fn archive_without_executable_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("fixture.tar.xz");
        write_tar_xz(
            &archive,
            &[TarEntry::file("node-v18/README.md", b"readme", 0o644)],
        );
        let fetcher = ArchiveFetcher::new(archive);
        let sources = RuntimeSection::default();
        let data = tmp.path().join("data");

        let err = RuntimeProvisioner::new(&fetcher, &sources)
            .ensure_runtime(&data, Platform::Linux)
            .unwrap_err();

        assert!(matches!(err, ProvisionError::MissingExecutable(_)));
    }

    #[test]
    fn stale_partial_install_is_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ArchiveFetcher::new(linux_archive(tmp.path()));
        let sources = RuntimeSection::default();
        let data = tmp.path().join("data");
        fs::create_dir_all(data.join("node/aaa-leftover")).unwrap();
        fs::write(data.join(TEMP_ARCHIVE), b"stale").unwrap();

        RuntimeProvisioner::new(&fetcher, &sources)
            .ensure_runtime(&data, Platform::Linux)
            .unwrap();

        assert!(!data.join("node/aaa-leftover").exists());
        assert!(data.join("node/bin/node").is_file());
    }

    #[test]
    fn flatten_lifts_first_subdirectory_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::create_dir_all(dir.join("b-wrapper/bin")).unwrap();
        fs::write(dir.join("b-wrapper/bin/node"), b"x").unwrap();
        fs::create_dir_all(dir.join("a-first/inner")).unwrap();

        assert!(flatten(dir).unwrap());

        assert!(dir.join("inner").is_dir());
        assert!(!dir.join("a-first").exists());
        assert!(dir.join("b-wrapper/bin/node").is_file());
    }

    #[test]
    fn flatten_handles_child_named_like_wrapper() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::create_dir_all(dir.join("node/node")).unwrap();
        fs::write(dir.join("node/node/marker"), b"x").unwrap();

        assert!(flatten(dir).unwrap());

        assert!(dir.join("node/marker").is_file());
        assert!(!dir.join(FLATTEN_STAGING).exists());
    }

    #[test]
    fn flatten_collision_keeps_leftovers_under_wrapper_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::create_dir_all(dir.join("node-v18/bin")).unwrap();
        fs::write(dir.join("node-v18/bin/node"), b"x").unwrap();
        fs::write(dir.join("node-v18/LICENSE"), b"wrapped").unwrap();
        fs::write(dir.join("LICENSE"), b"outer").unwrap();

        assert!(flatten(dir).unwrap());

        assert!(dir.join("bin/node").is_file());
        assert_eq!(fs::read(dir.join("LICENSE")).unwrap(), b"outer");
        assert_eq!(fs::read(dir.join("node-v18/LICENSE")).unwrap(), b"wrapped");
        assert!(!dir.join(FLATTEN_STAGING).exists());
    }

    #[test]
    fn flatten_never_picks_staging_leftovers() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::create_dir_all(dir.join(FLATTEN_STAGING).join("stale")).unwrap();
        fs::create_dir_all(dir.join("node-v18/bin")).unwrap();

        assert!(flatten(dir).unwrap());

        assert!(dir.join("bin").is_dir());
        assert!(!dir.join("stale").exists());
        assert!(!dir.join(FLATTEN_STAGING).exists());
    }

    #[test]
    fn flatten_without_subdirectory_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("node.exe"), b"MZ").unwrap();

        assert!(!flatten(tmp.path()).unwrap());
        assert!(tmp.path().join("node.exe").is_file());
    }
}
