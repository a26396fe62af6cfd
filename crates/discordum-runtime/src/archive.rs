//! Runtime archive extraction.
//!
//! Node.js ships as a `.zip` on Windows and a `.tar.xz` on Linux. Both are
//! unpacked under a destination directory while guarding against:
//! - Path traversal (`../` components, absolute paths)
//! - Symbolic links pointing outside the destination, and writes through
//!   links extracted earlier
//! - Excessive entry counts and decompression bombs
//!
//! Tar extraction carries the owner-execute bit of each entry over to the
//! written file; `bin/node` is not invocable without it.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use xz2::read::XzDecoder;

use crate::error::{ArchiveError, ArchiveResult};

/// Maximum number of entries allowed in an archive.
const MAX_ENTRY_COUNT: usize = 50_000;

/// Maximum total extracted size (2 GB).
const MAX_EXTRACTED_SIZE: u64 = 2_000_000_000;

/// Owner-execute permission bit.
const OWNER_EXEC: u32 = 0o100;

/// Expand every entry of a zip archive under `dest`, preserving relative
/// paths. Returns the number of entries written.
///
/// # Errors
///
/// Returns [`ArchiveError::Malformed`] when the archive cannot be read,
/// [`ArchiveError::PathTraversal`] for entries escaping `dest`, and
/// [`ArchiveError::Write`] when the filesystem refuses a write.
pub fn unpack_zip(archive: &Path, dest: &Path) -> ArchiveResult<usize> {
    let file = File::open(archive).map_err(|e| malformed(archive, e))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| malformed(archive, e))?;

    if zip.len() > MAX_ENTRY_COUNT {
        return Err(ArchiveError::TooLarge {
            message: format!("{} entries exceeds the limit of {MAX_ENTRY_COUNT}", zip.len()),
        });
    }

    let root = canonical_root(dest)?;
    let mut total_size: u64 = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| malformed(archive, e))?;

        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            return Err(ArchiveError::PathTraversal {
                path: entry.name().to_owned(),
            });
        };

        total_size = total_size.saturating_add(entry.size());
        check_total_size(total_size)?;

        let target = root.join(&relative);
        if entry.is_dir() {
            ensure_within(&root, &target)?;
            create_dir(&target)?;
            continue;
        }

        prepare_file_target(&root, &target)?;
        let mut out = File::create(&target).map_err(|e| write_err(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| write_err(&target, e))?;
        drop(out);
        apply_unix_mode(&target, entry.unix_mode()).map_err(|e| write_err(&target, e))?;
    }

    debug!(archive = %archive.display(), entries = zip.len(), "unpacked zip archive");
    Ok(zip.len())
}

/// Decompress an XZ stream, read it as tar, and expand it under `dest`.
/// Returns the number of entries written.
///
/// Directory entries become directories; file entries become new files whose
/// owner-execute bit is set exactly when the entry mode carries `0o100`.
///
/// # Errors
///
/// Returns [`ArchiveError::Malformed`] on decompression or tar framing
/// errors, [`ArchiveError::PathTraversal`] for entries escaping `dest`, and
/// [`ArchiveError::TooLarge`] when the limits are exceeded.
pub fn unpack_tar_xz(archive: &Path, dest: &Path) -> ArchiveResult<usize> {
    let file = File::open(archive).map_err(|e| malformed(archive, e))?;
    let written = unpack_tar(XzDecoder::new(BufReader::new(file)), archive, dest)?;
    debug!(archive = %archive.display(), entries = written, "unpacked tar.xz archive");
    Ok(written)
}

fn unpack_tar<R: Read>(reader: R, origin: &Path, dest: &Path) -> ArchiveResult<usize> {
    let mut archive = tar::Archive::new(reader);
    let root = canonical_root(dest)?;

    let mut entry_count = 0usize;
    let mut written = 0usize;
    let mut total_size: u64 = 0;

    for entry_result in archive.entries().map_err(|e| malformed(origin, e))? {
        let mut entry = entry_result.map_err(|e| malformed(origin, e))?;

        entry_count = entry_count.saturating_add(1);
        if entry_count > MAX_ENTRY_COUNT {
            return Err(ArchiveError::TooLarge {
                message: format!("archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"),
            });
        }

        let header = entry.header();
        let entry_type = header.entry_type();
        let mode = header.mode().map_err(|e| malformed(origin, e))?;
        total_size = total_size.saturating_add(header.size().map_err(|e| malformed(origin, e))?);
        check_total_size(total_size)?;

        let relative = entry.path().map_err(|e| malformed(origin, e))?.into_owned();
        validate_entry_path(&relative)?;
        let target = root.join(&relative);

        match entry_type {
            tar::EntryType::Directory => {
                ensure_within(&root, &target)?;
                create_dir(&target)?;
            },
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                prepare_file_target(&root, &target)?;
                let mut out = File::create(&target).map_err(|e| write_err(&target, e))?;
                io::copy(&mut entry, &mut out).map_err(|e| write_err(&target, e))?;
                drop(out);
                set_owner_executable(&target, mode & OWNER_EXEC != 0)
                    .map_err(|e| write_err(&target, e))?;
            },
            tar::EntryType::Symlink => {
                let link = entry
                    .link_name()
                    .map_err(|e| malformed(origin, e))?
                    .map(std::borrow::Cow::into_owned)
                    .unwrap_or_default();
                let parent = target.parent().unwrap_or(root.as_path());
                ensure_within(&root, parent)?;
                create_dir(parent)?;
                let parent = parent.canonicalize().map_err(|e| write_err(parent, e))?;
                validate_link_target(&root, &parent, &relative, &link)?;
                create_symlink(&link, &target)?;
            },
            other => {
                warn!(
                    entry = %relative.display(),
                    entry_type = ?other,
                    "skipping unsupported archive entry"
                );
                continue;
            },
        }
        written = written.saturating_add(1);
    }

    Ok(written)
}

/// Validate that an entry path has no traversal components or absolute paths.
fn validate_entry_path(path: &Path) -> ArchiveResult<()> {
    let escapes = path.is_absolute()
        || path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::Prefix(_) | Component::RootDir
            )
        });
    if escapes {
        return Err(ArchiveError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// A symlink target must be relative, may climb only with leading `..`
/// components, and resolved from the link's canonical directory must stay
/// inside `root`.
///
/// Later components only descend, through names that are either real
/// directories or links that passed this same check.
fn validate_link_target(
    root: &Path,
    canonical_parent: &Path,
    entry: &Path,
    link: &Path,
) -> ArchiveResult<()> {
    let reject = || ArchiveError::PathTraversal {
        path: format!("{} -> {}", entry.display(), link.display()),
    };

    let mut resolved = canonical_parent.to_path_buf();
    let mut descended = false;
    for component in link.components() {
        match component {
            Component::Normal(name) => {
                resolved.push(name);
                descended = true;
            },
            Component::CurDir => {},
            Component::ParentDir if !descended => {
                if !resolved.pop() {
                    return Err(reject());
                }
            },
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(reject());
            },
        }
    }

    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(reject())
    }
}

/// Create `dest` and return its canonical form. Every containment check
/// compares against this path.
fn canonical_root(dest: &Path) -> ArchiveResult<PathBuf> {
    create_dir(dest)?;
    dest.canonicalize().map_err(|e| write_err(dest, e))
}

/// Reject `path` when its deepest existing ancestor resolves outside
/// `root`. Links extracted earlier are followed, so a chain of individually
/// harmless links cannot carry a later write out of the tree.
fn ensure_within(root: &Path, path: &Path) -> ArchiveResult<()> {
    let Some(existing) = path.ancestors().find(|a| a.symlink_metadata().is_ok()) else {
        return Err(escape(path));
    };
    match existing.canonicalize() {
        Ok(resolved) if resolved.starts_with(root) => Ok(()),
        _ => Err(escape(path)),
    }
}

/// Make room for a regular file at `target`: check and create its parent,
/// and drop a link already sitting at that name instead of writing through
/// it.
fn prepare_file_target(root: &Path, target: &Path) -> ArchiveResult<()> {
    let parent = target.parent().unwrap_or(root);
    ensure_within(root, parent)?;
    create_dir(parent)?;
    if target
        .symlink_metadata()
        .is_ok_and(|m| m.file_type().is_symlink())
    {
        std::fs::remove_file(target).map_err(|e| write_err(target, e))?;
    }
    Ok(())
}

fn escape(path: &Path) -> ArchiveError {
    ArchiveError::PathTraversal {
        path: path.display().to_string(),
    }
}

fn check_total_size(total: u64) -> ArchiveResult<()> {
    if total > MAX_EXTRACTED_SIZE {
        return Err(ArchiveError::TooLarge {
            message: format!("archive exceeds maximum extracted size ({MAX_EXTRACTED_SIZE} bytes)"),
        });
    }
    Ok(())
}

fn create_dir(path: &Path) -> ArchiveResult<()> {
    std::fs::create_dir_all(path).map_err(|e| write_err(path, e))
}

#[cfg(unix)]
fn set_owner_executable(path: &Path, executable: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)?.permissions();
    let mode = if executable {
        perms.mode() | OWNER_EXEC
    } else {
        perms.mode() & !OWNER_EXEC
    };
    perms.set_mode(mode);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn set_owner_executable(_path: &Path, _executable: bool) -> io::Result<()> {
    Ok(())
}

/// Zip entries written on Unix carry their permission bits in the external
/// attributes; apply them when present.
#[cfg(unix)]
fn apply_unix_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode {
        Some(mode) => {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o777))
        },
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_unix_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn create_symlink(link: &Path, target: &Path) -> ArchiveResult<()> {
    if target.symlink_metadata().is_ok() {
        std::fs::remove_file(target).map_err(|e| write_err(target, e))?;
    }
    std::os::unix::fs::symlink(link, target).map_err(|e| write_err(target, e))
}

#[cfg(not(unix))]
fn create_symlink(link: &Path, target: &Path) -> ArchiveResult<()> {
    warn!(
        link = %target.display(),
        points_to = %link.display(),
        "symbolic links are not extracted on this platform"
    );
    Ok(())
}

fn malformed(path: &Path, e: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn write_err(path: &Path, source: io::Error) -> ArchiveError {
    ArchiveError::Write {
        path: PathBuf::from(path),
        source,
    }
}
