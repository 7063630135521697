//! Snapshot documents: a point-in-time capture of every provider's ranges.
//!
//! The document maps each provider key to `{"v4": [...], "v6": [...]}`, where
//! every entry is `[address, prefix_length]` and `address` is raw bytes: 4
//! octets for IPv4, 16 bytes for IPv6. IPv6 entries written as 8 16-bit
//! groups are accepted on input.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::address::{Address, CidrRange, Family};
use crate::client::FetchClient;
use crate::config::Config;
use crate::error::{CloudInfoError, Result};
use crate::provider::CloudProvider;
use crate::store::{ProviderRanges, RangeStore};

type RawEntry = (Vec<u16>, u8);

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawRanges {
    v4: Vec<RawEntry>,
    v6: Vec<RawEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RawSnapshot {
    aws: RawRanges,
    gcp: RawRanges,
    azure: RawRanges,
}

impl RawRanges {
    fn from_ranges(ranges: &ProviderRanges) -> Self {
        let encode = |range: &CidrRange| -> RawEntry {
            let octets = range.base().octets().iter().map(|&b| u16::from(b)).collect();
            (octets, range.prefix_len())
        };
        Self {
            v4: ranges.v4().iter().map(encode).collect(),
            v6: ranges.v6().iter().map(encode).collect(),
        }
    }

    fn into_ranges(self, provider: CloudProvider) -> Result<ProviderRanges> {
        let mut ranges = ProviderRanges::new();
        for (family, entries) in [(Family::Ipv4, self.v4), (Family::Ipv6, self.v6)] {
            for (index, (address, prefix_len)) in entries.into_iter().enumerate() {
                let range = decode_entry(family, &address, prefix_len).map_err(|reason| {
                    CloudInfoError::InvalidSnapshot(format!(
                        "{}.{}[{}]: {}",
                        provider.key(),
                        list_name(family),
                        index,
                        reason
                    ))
                })?;
                ranges.push(range);
            }
        }
        Ok(ranges)
    }
}

fn list_name(family: Family) -> &'static str {
    match family {
        Family::Ipv4 => "v4",
        Family::Ipv6 => "v6",
    }
}

fn decode_entry(
    family: Family,
    address: &[u16],
    prefix_len: u8,
) -> std::result::Result<CidrRange, String> {
    let address = decode_address(family, address)?;
    CidrRange::new(address, prefix_len)
        .map_err(|_| format!("prefix length {} out of range for {}", prefix_len, family))
}

fn decode_address(family: Family, parts: &[u16]) -> std::result::Result<Address, String> {
    let octets = |parts: &[u16]| -> std::result::Result<Vec<u8>, String> {
        parts
            .iter()
            .map(|&part| {
                u8::try_from(part).map_err(|_| format!("byte value {} out of range", part))
            })
            .collect()
    };

    match (family, parts.len()) {
        (Family::Ipv4, 4) | (Family::Ipv6, 16) => {
            Address::from_bytes(&octets(parts)?).map_err(|err| err.to_string())
        }
        (Family::Ipv6, 8) => {
            let bytes: Vec<u8> = parts.iter().flat_map(|group| group.to_be_bytes()).collect();
            Address::from_bytes(&bytes).map_err(|err| err.to_string())
        }
        (Family::Ipv4, n) => Err(format!("expected 4 octets, found {}", n)),
        (Family::Ipv6, n) => Err(format!("expected 16 bytes or 8 groups, found {}", n)),
    }
}

/// Decode a snapshot document into a [`RangeStore`].
pub fn decode(bytes: &[u8]) -> Result<RangeStore> {
    let raw: RawSnapshot = serde_json::from_slice(bytes)?;
    Ok(RangeStore::new(
        raw.aws.into_ranges(CloudProvider::Aws)?,
        raw.gcp.into_ranges(CloudProvider::Gcp)?,
        raw.azure.into_ranges(CloudProvider::Azure)?,
    ))
}

/// Encode a [`RangeStore`] as a snapshot document, preserving range order.
pub fn encode(store: &RangeStore) -> Result<Vec<u8>> {
    let raw = RawSnapshot {
        aws: RawRanges::from_ranges(store.ranges(CloudProvider::Aws)),
        gcp: RawRanges::from_ranges(store.ranges(CloudProvider::Gcp)),
        azure: RawRanges::from_ranges(store.ranges(CloudProvider::Azure)),
    };
    Ok(serde_json::to_vec(&raw)?)
}

/// Where a snapshot document can be loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Fetched over HTTP(S) with the loader's timeout.
    Url(String),
    /// Read from the local filesystem.
    File(PathBuf),
    /// Bundled with the program, e.g. via `include_bytes!`.
    Static(&'static [u8]),
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotSource::Url(url) => write!(f, "{}", url),
            SnapshotSource::File(path) => write!(f, "{}", path.display()),
            SnapshotSource::Static(bytes) => write!(f, "bundled snapshot ({} bytes)", bytes.len()),
        }
    }
}

/// Loads a [`RangeStore`] from the first snapshot source that works.
#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    client: FetchClient,
    sources: Vec<SnapshotSource>,
    max_size: Option<usize>,
}

impl SnapshotLoader {
    pub fn new(client: FetchClient, sources: Vec<SnapshotSource>) -> Self {
        Self {
            client,
            sources,
            max_size: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = FetchClient::new(config.fetch_timeout())?;
        let loader = Self::new(client, config.sources());
        Ok(match config.max_snapshot_size() {
            Some(max_size) => loader.with_max_size(max_size),
            None => loader,
        })
    }

    /// Set the maximum size limit for downloaded snapshots.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Append a source tried after the existing ones.
    pub fn with_fallback(mut self, source: SnapshotSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(&self) -> &[SnapshotSource] {
        &self.sources
    }

    /// Try each source in order and return the first store that decodes.
    ///
    /// # Errors
    ///
    /// Returns `CloudInfoError::SnapshotUnavailable` wrapping the last
    /// failure when no source succeeds.
    pub async fn load(&self) -> Result<RangeStore> {
        let mut last_error = CloudInfoError::NoSnapshotSource;

        for source in &self.sources {
            match self.load_from(source).await {
                Ok(store) => {
                    info!("Loaded {} ranges from {}", store.len(), source);
                    return Ok(store);
                }
                Err(err) => {
                    warn!("Unable to load snapshot from {}: {}", source, err);
                    last_error = err;
                }
            }
        }

        Err(CloudInfoError::SnapshotUnavailable(Arc::new(last_error)))
    }

    /// Load and decode a single source.
    pub async fn load_from(&self, source: &SnapshotSource) -> Result<RangeStore> {
        debug!("Loading snapshot from {}", source);
        let bytes: Cow<'static, [u8]> = match source {
            SnapshotSource::Url(url) => Cow::Owned(self.client.fetch(url, self.max_size).await?),
            SnapshotSource::File(path) => Cow::Owned(tokio::fs::read(path).await?),
            SnapshotSource::Static(bytes) => Cow::Borrowed(*bytes),
        };
        decode(&bytes)
    }
}
