//! Lookup configuration with environment overrides.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::{info, warn};

use crate::client::DEFAULT_TIMEOUT;
use crate::dns::DEFAULT_DNS_TIMEOUT;
use crate::snapshot::SnapshotSource;

/// Canonical hosted snapshot, regenerated daily.
pub const DEFAULT_SNAPSHOT_URL: &str =
    "https://raw.githubusercontent.com/mongodb-js/mongodb-cloud-info/main/cidrs.json";

/// Default cap on a downloaded snapshot (64 MiB).
pub const DEFAULT_MAX_SNAPSHOT_SIZE: usize = 64 * 1024 * 1024;

pub const ENV_SNAPSHOT_URL: &str = "CLOUD_INFO_SNAPSHOT_URL";
pub const ENV_SNAPSHOT_FILE: &str = "CLOUD_INFO_SNAPSHOT_FILE";
pub const ENV_FETCH_TIMEOUT_MS: &str = "CLOUD_INFO_FETCH_TIMEOUT_MS";
pub const ENV_DNS_TIMEOUT_MS: &str = "CLOUD_INFO_DNS_TIMEOUT_MS";
pub const ENV_MAX_SNAPSHOT_SIZE: &str = "CLOUD_INFO_MAX_SNAPSHOT_SIZE";

/// Where range data comes from and how long network calls may take.
///
/// ```
/// use std::time::Duration;
///
/// let config = cloud_info::Config::default()
///     .with_snapshot_file("/var/lib/cloud-info/cidrs.json")
///     .with_fetch_timeout(Duration::from_secs(3));
///
/// assert_eq!(config.sources().len(), 2);
/// ```
///
/// A snapshot compiled into the program can serve as the last resort:
///
/// ```ignore
/// let config = cloud_info::Config::from_env()
///     .with_bundled_snapshot(include_bytes!("../data/cidrs.json"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    snapshot_url: Option<String>,
    snapshot_file: Option<PathBuf>,
    fetch_timeout: Duration,
    dns_timeout: Duration,
    max_snapshot_size: Option<usize>,
    bundled_snapshot: Option<&'static [u8]>,
}

impl Default for Config {
    /// Defaults only; the environment is not consulted.
    fn default() -> Self {
        Self {
            snapshot_url: Some(DEFAULT_SNAPSHOT_URL.to_string()),
            snapshot_file: None,
            fetch_timeout: DEFAULT_TIMEOUT,
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            max_snapshot_size: Some(DEFAULT_MAX_SNAPSHOT_SIZE),
            bundled_snapshot: None,
        }
    }
}

impl Config {
    /// Defaults overridden by any `CLOUD_INFO_*` environment variables that
    /// are set.
    ///
    /// - `CLOUD_INFO_SNAPSHOT_URL` (empty disables the remote snapshot)
    /// - `CLOUD_INFO_SNAPSHOT_FILE`
    /// - `CLOUD_INFO_FETCH_TIMEOUT_MS`
    /// - `CLOUD_INFO_DNS_TIMEOUT_MS`
    /// - `CLOUD_INFO_MAX_SNAPSHOT_SIZE` (bytes)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let snapshot_url = match lookup(ENV_SNAPSHOT_URL) {
            Some(url) if url.trim().is_empty() => {
                info!("{ENV_SNAPSHOT_URL} is empty; remote snapshot disabled");
                None
            }
            Some(url) => {
                info!("Using {ENV_SNAPSHOT_URL}: {url}");
                Some(url)
            }
            None => default.snapshot_url,
        };
        let snapshot_file = lookup(ENV_SNAPSHOT_FILE)
            .filter(|file| !file.is_empty())
            .map(PathBuf::from)
            .or(default.snapshot_file);

        let fetch_timeout_ms =
            parse_var(&lookup, ENV_FETCH_TIMEOUT_MS, millis(default.fetch_timeout));
        let dns_timeout_ms = parse_var(&lookup, ENV_DNS_TIMEOUT_MS, millis(default.dns_timeout));
        let max_snapshot_size = default
            .max_snapshot_size
            .map(|max_size| parse_var(&lookup, ENV_MAX_SNAPSHOT_SIZE, max_size));

        Self {
            snapshot_url,
            snapshot_file,
            fetch_timeout: Duration::from_millis(fetch_timeout_ms),
            dns_timeout: Duration::from_millis(dns_timeout_ms),
            max_snapshot_size,
            bundled_snapshot: default.bundled_snapshot,
        }
    }

    /*-------------------------------------------------------------------------
      Setters
    -------------------------------------------------------------------------*/

    /// Set the remote snapshot URL.
    pub fn with_snapshot_url(mut self, url: impl Into<String>) -> Self {
        self.snapshot_url = Some(url.into());
        self
    }

    /// Never fetch a remote snapshot.
    pub fn without_snapshot_url(mut self) -> Self {
        self.snapshot_url = None;
        self
    }

    /// Set a local snapshot file, tried after the remote snapshot.
    pub fn with_snapshot_file(mut self, path: impl AsRef<Path>) -> Self {
        self.snapshot_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }

    /// Set the maximum accepted snapshot download size in bytes.
    pub fn with_max_snapshot_size(mut self, max_size: usize) -> Self {
        self.max_snapshot_size = Some(max_size);
        self
    }

    /// Set a snapshot shipped with the program, tried after every other
    /// source.
    pub fn with_bundled_snapshot(mut self, snapshot: &'static [u8]) -> Self {
        self.bundled_snapshot = Some(snapshot);
        self
    }

    /*-------------------------------------------------------------------------
      Getters
    -------------------------------------------------------------------------*/

    pub fn snapshot_url(&self) -> Option<&str> {
        self.snapshot_url.as_deref()
    }

    pub fn snapshot_file(&self) -> Option<&Path> {
        self.snapshot_file.as_deref()
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn dns_timeout(&self) -> Duration {
        self.dns_timeout
    }

    pub fn max_snapshot_size(&self) -> Option<usize> {
        self.max_snapshot_size
    }

    pub fn bundled_snapshot(&self) -> Option<&'static [u8]> {
        self.bundled_snapshot
    }

    /// Snapshot sources in the order they are tried: remote, file, bundled.
    pub fn sources(&self) -> Vec<SnapshotSource> {
        self.snapshot_url
            .iter()
            .map(|url| SnapshotSource::Url(url.clone()))
            .chain(
                self.snapshot_file
                    .iter()
                    .map(|path| SnapshotSource::File(path.clone())),
            )
            .chain(self.bundled_snapshot.map(SnapshotSource::Static))
            .collect()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(name)
        .and_then(|value| {
            value
                .parse::<T>()
                .inspect(|_| info!("Using {}: {}", name, value))
                .inspect_err(|_| warn!("Invalid {}: {}", name, value))
                .ok()
        })
        .unwrap_or(default)
}
