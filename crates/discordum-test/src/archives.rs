//! Builders for runtime distribution archives.
//!
//! Helpers panic on failure; they are meant for test setup only.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use xz2::write::XzEncoder;

/// One entry of a tar archive built by [`write_tar_xz`].
#[derive(Debug, Clone)]
pub enum TarEntry {
    /// Regular file with contents and permission bits.
    File {
        /// Path inside the archive.
        path: String,
        /// File contents.
        data: Vec<u8>,
        /// Unix mode, e.g. `0o755`.
        mode: u32,
    },
    /// Directory.
    Dir {
        /// Path inside the archive.
        path: String,
    },
    /// Symbolic link.
    Symlink {
        /// Path inside the archive.
        path: String,
        /// Link target, stored verbatim.
        target: String,
    },
}

impl TarEntry {
    /// Regular file entry.
    #[must_use]
    pub fn file(path: &str, data: &[u8], mode: u32) -> Self {
        Self::File {
            path: path.to_owned(),
            data: data.to_vec(),
            mode,
        }
    }

    /// Directory entry.
    #[must_use]
    pub fn dir(path: &str) -> Self {
        Self::Dir {
            path: path.to_owned(),
        }
    }

    /// Symbolic link entry.
    #[must_use]
    pub fn symlink(path: &str, target: &str) -> Self {
        Self::Symlink {
            path: path.to_owned(),
            target: target.to_owned(),
        }
    }
}

/// Build an xz-compressed tar archive in memory.
///
/// # Panics
///
/// Panics if an entry path is rejected by the `tar` crate.
#[must_use]
pub fn tar_xz_bytes(entries: &[TarEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        match entry {
            TarEntry::File { path, data, mode } => {
                header.set_path(path).expect("tar path");
                header.set_size(data.len() as u64);
                header.set_mode(*mode);
                header.set_entry_type(tar::EntryType::Regular);
                header.set_cksum();
                builder.append(&header, data.as_slice()).expect("tar append");
            },
            TarEntry::Dir { path } => {
                header.set_path(path).expect("tar path");
                header.set_size(0);
                header.set_mode(0o755);
                header.set_entry_type(tar::EntryType::Directory);
                header.set_cksum();
                builder.append(&header, std::io::empty()).expect("tar append");
            },
            TarEntry::Symlink { path, target } => {
                header.set_path(path).expect("tar path");
                header.set_size(0);
                header.set_mode(0o777);
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_link_name(target).expect("tar link name");
                header.set_cksum();
                builder.append(&header, std::io::empty()).expect("tar append");
            },
        }
    }
    let tar_data = builder.into_inner().expect("tar finish");
    xz(&tar_data)
}

/// Write an xz-compressed tar archive to `dest`.
///
/// # Panics
///
/// Panics if the archive cannot be built or written.
pub fn write_tar_xz(dest: &Path, entries: &[TarEntry]) {
    std::fs::write(dest, tar_xz_bytes(entries)).expect("write tar.xz");
}

/// Build a single-file xz tar with raw path bytes, bypassing the `tar`
/// crate's path validation. Used to feed hostile names to the extractor.
#[must_use]
pub fn raw_tar_xz(path_bytes: &[u8], data: &[u8]) -> Vec<u8> {
    let mut header = [0u8; 512];

    // name (0..100)
    let len = path_bytes.len().min(100);
    header[..len].copy_from_slice(&path_bytes[..len]);
    // mode (100..108)
    header[100..108].copy_from_slice(b"0000644\0");
    // size (124..136), octal
    let size = format!("{:011o}\0", data.len());
    header[124..136].copy_from_slice(size.as_bytes());
    // typeflag: regular file
    header[156] = b'0';

    // Checksum is computed with its own field set to spaces.
    header[148..156].copy_from_slice(b"        ");
    let cksum: u32 = header.iter().map(|&b| u32::from(b)).sum();
    let cksum = format!("{cksum:06o}\0 ");
    header[148..156].copy_from_slice(cksum.as_bytes());

    let mut tar_data = Vec::with_capacity(2048);
    tar_data.extend_from_slice(&header);
    tar_data.extend_from_slice(data);
    let padding = (512 - (data.len() % 512)) % 512;
    tar_data.extend(std::iter::repeat_n(0u8, padding));
    tar_data.extend(std::iter::repeat_n(0u8, 1024));

    xz(&tar_data)
}

/// Write a deflated zip archive with the given file entries to `dest`.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn write_zip(dest: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(dest).expect("create zip");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o755);
    for (name, data) in entries {
        zip.start_file(*name, options).expect("zip entry");
        zip.write_all(data).expect("zip write");
    }
    zip.finish().expect("zip finish");
}

/// A minimal Linux runtime layout wrapped in a versioned directory, the way
/// official distributions ship.
#[must_use]
pub fn linux_runtime_entries() -> Vec<TarEntry> {
    vec![
        TarEntry::file("node-v18.19.0-linux-x64/bin/node", b"\x7fELF", 0o755),
        TarEntry::file(
            "node-v18.19.0-linux-x64/lib/node_modules/npm/bin/npm-cli.js",
            b"// npm",
            0o644,
        ),
        TarEntry::file("node-v18.19.0-linux-x64/LICENSE", b"MIT", 0o644),
    ]
}

fn xz(data: &[u8]) -> Vec<u8> {
    let mut encoder = XzEncoder::new(Vec::new(), 1);
    encoder.write_all(data).expect("xz write");
    encoder.finish().expect("xz finish")
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn tar_xz_bytes_decode_with_tar_crate() {
        let bytes = tar_xz_bytes(&linux_runtime_entries());
        let mut archive = tar::Archive::new(xz2::read::XzDecoder::new(bytes.as_slice()));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names[0].ends_with("bin/node"));
    }

    #[test]
    fn raw_header_keeps_hostile_name() {
        let bytes = raw_tar_xz(b"../escape", b"x");
        let mut archive = tar::Archive::new(xz2::read::XzDecoder::new(bytes.as_slice()));
        let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
        assert_eq!(&*entry.path_bytes(), b"../escape");
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        assert_eq!(body, "x");
    }
}
