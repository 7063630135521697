//! Check whether a hostname or IP address belongs to the published address
//! space of AWS, GCP, or Azure.
//!
//! Range data comes from a snapshot document holding every provider's IPv4
//! and IPv6 CIDR blocks. The snapshot is loaded once per process on first use
//! and shared by all queries afterwards.
//!
//! # Features
//!
//! - Independent `isAws`/`isGcp`/`isAzure` answers for a host or address
//! - IPv4 and IPv6, matched strictly by family
//! - Single-flight snapshot loading with retry after failure
//! - Remote snapshot with a local file or bundled bytes as fallback
//! - Adapters for each provider's native feed format
//!
//! # Example
//!
//! ```ignore
//! #[tokio::main]
//! async fn main() -> Result<(), cloud_info::CloudInfoError> {
//!     let result = cloud_info::get_cloud_info(Some("13.64.151.161")).await?;
//!     assert!(result.is_azure);
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CLOUD_INFO_SNAPSHOT_URL` | hosted `cidrs.json` (empty disables) |
//! | `CLOUD_INFO_SNAPSHOT_FILE` | none |
//! | `CLOUD_INFO_FETCH_TIMEOUT_MS` | 5000 |
//! | `CLOUD_INFO_DNS_TIMEOUT_MS` | 5000 |
//! | `CLOUD_INFO_MAX_SNAPSHOT_SIZE` | 64 MiB |

use std::sync::OnceLock;

mod address;
mod client;
mod config;
mod dns;
mod error;
mod membership;
mod provider;
mod resolver;
mod store;

pub mod providers;
pub mod snapshot;

pub use address::{parse_address, parse_cidr, Address, CidrRange, Family};
pub use client::FetchClient;
pub use config::Config;
pub use dns::DnsResolver;
pub use error::{CloudInfoError, Result};
pub use membership::{contains, RangeIndex};
pub use provider::CloudProvider;
pub use resolver::{CloudInfo, LoadState};
pub use snapshot::{SnapshotLoader, SnapshotSource};
pub use store::{CloudInfoResult, ProviderRanges, RangeStore};

static DEFAULT: OnceLock<CloudInfo> = OnceLock::new();

/// Create the process-wide [`CloudInfo`] from an explicit configuration.
///
/// Must run before the first [`get_cloud_info`] call. This is how a program
/// ships its own snapshot as a fallback:
///
/// ```ignore
/// let config = cloud_info::Config::from_env()
///     .with_bundled_snapshot(include_bytes!("../data/cidrs.json"));
/// cloud_info::init_cloud_info(&config)?;
/// ```
///
/// # Errors
///
/// `AlreadyInitialized` if the process-wide instance already exists.
pub fn init_cloud_info(config: &Config) -> Result<&'static CloudInfo> {
    let cloud_info = CloudInfo::from_config(config)?;
    DEFAULT
        .set(cloud_info)
        .map_err(|_| CloudInfoError::AlreadyInitialized)?;
    default_cloud_info()
}

/// Process-wide [`CloudInfo`], configured from the environment unless
/// [`init_cloud_info`] ran first.
pub fn default_cloud_info() -> Result<&'static CloudInfo> {
    if let Some(cloud_info) = DEFAULT.get() {
        return Ok(cloud_info);
    }
    let cloud_info = CloudInfo::from_config(&Config::from_env())?;
    Ok(DEFAULT.get_or_init(|| cloud_info))
}

/// Look up `host` using the process-wide [`CloudInfo`].
///
/// An absent or empty host returns all-false immediately.
pub async fn get_cloud_info(host: Option<&str>) -> Result<CloudInfoResult> {
    if host.map_or(true, str::is_empty) {
        return Ok(CloudInfoResult::default());
    }
    default_cloud_info()?.query(host).await
}
