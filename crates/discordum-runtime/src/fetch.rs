//! Runtime archive download.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{ProvisionError, ProvisionResult};

/// Largest archive accepted from the network (200 MB).
const MAX_DOWNLOAD_SIZE: u64 = 200 * 1024 * 1024;

/// Downloads a URL into a local file.
///
/// The provisioner only talks to the network through this trait so a test
/// can count or script downloads.
pub trait Fetcher {
    /// Write the body of `url` to `dest`, replacing any existing file.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Download`] on any network, status, or size
    /// failure and [`ProvisionError::Io`] when `dest` cannot be written.
    fn fetch(&self, url: &str, dest: &Path) -> ProvisionResult<u64>;
}

impl std::fmt::Debug for dyn Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Fetcher")
    }
}

/// Blocking HTTP(S) fetcher with a whole-request timeout.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    max_size: u64,
}

impl HttpFetcher {
    /// Build a fetcher whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Download`] if the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration) -> ProvisionResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("discordum/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(timeout)
            .build()
            .map_err(|e| ProvisionError::Download {
                url: String::new(),
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            max_size: MAX_DOWNLOAD_SIZE,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> ProvisionResult<u64> {
        let download_err = |message: String| ProvisionError::Download {
            url: url.to_owned(),
            message,
        };

        info!(url, "downloading runtime archive");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| download_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_err(format!("server returned {}", response.status())));
        }

        if let Some(len) = response.content_length()
            && len > self.max_size
        {
            return Err(download_err(format!(
                "archive is {len} bytes (limit: {} bytes)",
                self.max_size
            )));
        }

        let mut out = File::create(dest).map_err(|e| ProvisionError::io(dest, e))?;
        let written = copy_with_limit(response, &mut out, self.max_size).map_err(|e| {
            if e.kind() == io::ErrorKind::FileTooLarge {
                download_err(e.to_string())
            } else {
                download_err(format!("transfer interrupted: {e}"))
            }
        })?;
        out.flush().map_err(|e| ProvisionError::io(dest, e))?;

        debug!(url, bytes = written, path = %dest.display(), "download complete");
        Ok(written)
    }
}

/// Copy `reader` into `writer`, failing once more than `limit` bytes arrive.
fn copy_with_limit<R: Read, W: Write>(reader: R, writer: &mut W, limit: u64) -> io::Result<u64> {
    let mut limited = reader.take(limit.saturating_add(1));
    let written = io::copy(&mut limited, writer)?;
    if written > limit {
        return Err(io::Error::new(
            io::ErrorKind::FileTooLarge,
            format!("archive exceeds {limit} bytes"),
        ));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_within_limit() {
        let mut out = Vec::new();
        let n = copy_with_limit(&b"hello"[..], &mut out, 5).unwrap();
        assert_eq!(n, 5);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn copy_over_limit_fails() {
        let mut out = Vec::new();
        let err = copy_with_limit(&b"hello world"[..], &mut out, 5).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::FileTooLarge);
    }

    #[test]
    fn unreachable_host_is_download_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:9/node.tar.xz", &tmp.path().join("node.tmp"))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Download { .. }), "{err}");
    }
}
