//! Download and integrity verification of artifacts.
//!
//! Locations are either local (`file:`) or remote (`http:`/`https:`). Both
//! are streamed in fixed-size chunks into the destination file, and the
//! progress sink is notified after every chunk.

use std::fs::File;
use std::io::{Read, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::Duration;

use overlay_registry::{local_path, Artifact, ContentHash, Layout};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{MaterializeError, Result};

/// User agent sent with every remote request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Bytes read per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Download settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// `User-Agent` header for remote requests.
    pub user_agent: String,
    /// Read buffer size in bytes.
    pub chunk_size: usize,
    /// Whole-request timeout in seconds. The HTTP client default applies when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout_secs: None,
        }
    }
}

/// Receives download progress.
///
/// Called after every chunk with the artifact name, bytes written so far
/// and the declared total size (0 when unknown).
pub trait ProgressSink {
    fn report(&self, name: &str, downloaded: u64, total: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, u64, u64),
{
    fn report(&self, name: &str, downloaded: u64, total: u64) {
        self(name, downloaded, total)
    }
}

/// A progress sink that ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _name: &str, _downloaded: u64, _total: u64) {}
}

/// Streams artifacts from their locations onto local disk.
pub struct Fetcher {
    client: reqwest::blocking::Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Create a fetcher with the given settings.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(MaterializeError::HttpClient)?;
        Ok(Fetcher { client, config })
    }

    /// Download `location` into `dest`, replacing any existing file.
    ///
    /// `total` is the declared size passed to the progress sink; when it is
    /// 0 the remote content length is used if known. Returns the number of
    /// bytes written.
    pub fn fetch(
        &self,
        location: &Url,
        dest: &Path,
        total: u64,
        progress: &dyn ProgressSink,
    ) -> Result<u64> {
        if local_path(location).is_some_and(|src| src == dest) {
            tracing::debug!("{} is already in place", dest.display());
            return Ok(std::fs::metadata(dest)?.len());
        }

        remove_stale(dest);

        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::debug!("Downloading {} from {}", name, location);

        let (mut reader, length) = self.open(location)?;
        let total = if total > 0 { total } else { length.unwrap_or(0) };

        let mut out = File::create(dest)?;
        let mut buffer = vec![0u8; self.config.chunk_size.max(1)];
        let mut written: u64 = 0;
        let mut sink_failed = false;
        loop {
            let n = reader.read(&mut buffer).map_err(|e| read_error(location, e))?;
            if n == 0 {
                break;
            }
            out.write_all(&buffer[..n])?;
            written += n as u64;
            if !sink_failed {
                let reported = catch_unwind(AssertUnwindSafe(|| progress.report(&name, written, total)));
                if reported.is_err() {
                    tracing::warn!("Progress reporter failed while downloading {}; ignoring it", name);
                    sink_failed = true;
                }
            }
        }
        out.flush()?;
        Ok(written)
    }

    /// Check the cached copy of `artifact` and download it on mismatch.
    ///
    /// Returns whether the cached copy matches the declared hash afterwards.
    /// A persistent mismatch is reported as `false`, never retried.
    pub fn verify(
        &self,
        layout: &Layout,
        artifact: &Artifact,
        progress: &dyn ProgressSink,
    ) -> Result<bool> {
        let cached = layout.cached_artifact(&artifact.name);
        let current = ContentHash::of_file_if_exists(&cached)?;
        if current.is_some_and(|h| h.matches(&artifact.hash)) {
            tracing::debug!("Hash for {} up to date", artifact.name);
            return Ok(true);
        }

        std::fs::create_dir_all(layout.repository_dir())?;
        self.fetch(&artifact.location()?, &cached, artifact.size, progress)?;

        let fetched = ContentHash::of_file(&cached)?;
        let valid = fetched.matches(&artifact.hash);
        if !valid {
            tracing::warn!(
                "Hash mismatch for {}: expected {}, got {}",
                artifact.name,
                artifact.hash,
                fetched
            );
        }
        Ok(valid)
    }

    fn open(&self, location: &Url) -> Result<(Box<dyn Read>, Option<u64>)> {
        match location.scheme() {
            "file" => {
                let path = local_path(location).ok_or_else(|| MaterializeError::UnnamedLocation {
                    location: location.to_string(),
                })?;
                let file = File::open(&path)?;
                let length = file.metadata()?.len();
                Ok((Box::new(file), Some(length)))
            }
            "http" | "https" => {
                let http_err = |source| MaterializeError::Http {
                    location: location.to_string(),
                    source,
                };
                let response = self
                    .client
                    .get(location.clone())
                    .send()
                    .and_then(|r| r.error_for_status())
                    .map_err(http_err)?;
                let length = response.content_length();
                Ok((Box::new(response), length))
            }
            other => Err(MaterializeError::UnsupportedScheme {
                scheme: other.to_string(),
                location: location.to_string(),
            }),
        }
    }
}

/// Delete a file that is about to be replaced.
///
/// Failure is logged, not returned. Returns whether a file was removed.
pub fn remove_stale(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Deleted old artifact {}", path.display());
            true
        }
        Err(e) => {
            tracing::warn!("Unable to delete old artifact {}: {}", path.display(), e);
            false
        }
    }
}

/// Last path segment of a location, used to name downloaded files.
pub fn location_file_name(location: &Url) -> Result<String> {
    let name = match local_path(location) {
        Some(path) => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
        None => location
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
    };
    name.filter(|n| !n.is_empty())
        .ok_or_else(|| MaterializeError::UnnamedLocation {
            location: location.to_string(),
        })
}

fn read_error(location: &Url, e: std::io::Error) -> MaterializeError {
    tracing::debug!("Read from {} failed: {}", location, e);
    MaterializeError::Io(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use overlay_registry::file_url;

    fn fetcher(chunk_size: usize) -> Fetcher {
        Fetcher::new(FetchConfig {
            chunk_size,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn fetch_local_file_reports_every_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src-1.0.jar");
        std::fs::write(&src, vec![7u8; 10]).unwrap();
        let dest = dir.path().join("dest.jar");
        std::fs::write(&dest, b"stale").unwrap();

        let calls = RefCell::new(Vec::new());
        let sink = |name: &str, done: u64, total: u64| {
            calls.borrow_mut().push((name.to_string(), done, total));
        };
        let written = fetcher(4)
            .fetch(&file_url(&src).unwrap(), &dest, 10, &sink)
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(std::fs::read(&dest).unwrap(), vec![7u8; 10]);
        let calls = calls.into_inner();
        assert_eq!(
            calls,
            vec![
                ("dest.jar".to_string(), 4, 10),
                ("dest.jar".to_string(), 8, 10),
                ("dest.jar".to_string(), 10, 10),
            ]
        );
    }

    #[test]
    fn unknown_total_uses_source_length() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.jar");
        std::fs::write(&src, b"abc").unwrap();
        let last = RefCell::new(0);
        let sink = |_: &str, _: u64, total: u64| *last.borrow_mut() = total;
        fetcher(DEFAULT_CHUNK_SIZE)
            .fetch(&file_url(&src).unwrap(), &dir.path().join("b.jar"), 0, &sink)
            .unwrap();
        assert_eq!(*last.borrow(), 3);
    }

    #[test]
    fn panicking_progress_sink_does_not_fail_download() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.jar");
        std::fs::write(&src, vec![1u8; 32]).unwrap();
        let sink = |_: &str, _: u64, _: u64| panic!("reporter crashed");
        let dest = dir.path().join("b.jar");
        let written = fetcher(8)
            .fetch(&file_url(&src).unwrap(), &dest, 32, &sink)
            .unwrap();
        assert_eq!(written, 32);
        assert_eq!(std::fs::read(&dest).unwrap().len(), 32);
    }

    #[test]
    fn missing_source_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let src = file_url(&dir.path().join("absent.jar")).unwrap();
        let result = fetcher(8).fetch(&src, &dir.path().join("b.jar"), 0, &NoProgress);
        assert!(matches!(result, Err(MaterializeError::Io(_))));
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let location = Url::parse("ftp://example.net/a.jar").unwrap();
        let result = fetcher(8).fetch(&location, &dir.path().join("a.jar"), 0, &NoProgress);
        assert!(matches!(result, Err(MaterializeError::UnsupportedScheme { .. })));
    }

    #[test]
    fn verify_refreshes_stale_cache() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().join("base"));
        let upstream = dir.path().join("client-1.0.0.jar");
        std::fs::write(&upstream, b"fresh").unwrap();
        std::fs::create_dir_all(layout.repository_dir()).unwrap();
        std::fs::write(layout.cached_artifact("client-1.0.0.jar"), b"stale").unwrap();

        let artifact = Artifact {
            name: "client-1.0.0.jar".to_string(),
            path: file_url(&upstream).unwrap().to_string(),
            hash: ContentHash::compute(b"fresh").0,
            size: 5,
            extra: Default::default(),
        };
        let f = fetcher(DEFAULT_CHUNK_SIZE);
        assert!(f.verify(&layout, &artifact, &NoProgress).unwrap());
        assert_eq!(
            std::fs::read(layout.cached_artifact("client-1.0.0.jar")).unwrap(),
            b"fresh"
        );

        // Second pass finds the cache current and does not touch the source.
        std::fs::remove_file(&upstream).unwrap();
        assert!(f.verify(&layout, &artifact, &NoProgress).unwrap());
    }

    #[test]
    fn verify_reports_persistent_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().join("base"));
        let upstream = dir.path().join("lib-2.jar");
        std::fs::write(&upstream, b"corrupted").unwrap();
        let artifact = Artifact {
            name: "lib-2.jar".to_string(),
            path: file_url(&upstream).unwrap().to_string(),
            hash: ContentHash::compute(b"expected").0,
            size: 0,
            extra: Default::default(),
        };
        assert!(!fetcher(64).verify(&layout, &artifact, &NoProgress).unwrap());
    }

    #[test]
    fn file_names_from_locations() {
        let remote = Url::parse("https://repo.example.net/net/client/client-1.2.jar").unwrap();
        assert_eq!(location_file_name(&remote).unwrap(), "client-1.2.jar");
        let local = Url::parse("file:///tmp/a%20b.jar").unwrap();
        assert_eq!(location_file_name(&local).unwrap(), "a b.jar");
        let bare = Url::parse("https://repo.example.net/").unwrap();
        assert!(location_file_name(&bare).is_err());
    }

    #[test]
    fn remove_stale_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_stale(&dir.path().join("nothing.jar")));
        let path = dir.path().join("old.jar");
        std::fs::write(&path, b"x").unwrap();
        assert!(remove_stale(&path));
        assert!(!path.exists());
    }
}
