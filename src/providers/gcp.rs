//! Google Cloud adapter.
//!
//! Google publishes its ranges either as a bare list of CIDR strings or as a
//! `cloud.json`/`goog.json` document whose entries carry an `ipv4Prefix` or
//! an `ipv6Prefix`. Neither form tags the family, so it is taken from the
//! parsed address.

use serde::Deserialize;

use crate::error::Result;
use crate::store::ProviderRanges;

#[derive(Debug, Deserialize)]
struct GcpIpRanges {
    prefixes: Vec<GcpPrefix>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GcpPrefix {
    V4 {
        #[serde(rename = "ipv4Prefix")]
        ipv4_prefix: String,
    },
    V6 {
        #[serde(rename = "ipv6Prefix")]
        ipv6_prefix: String,
    },
}

impl GcpPrefix {
    fn cidr(&self) -> &str {
        match self {
            GcpPrefix::V4 { ipv4_prefix } => ipv4_prefix,
            GcpPrefix::V6 { ipv6_prefix } => ipv6_prefix,
        }
    }
}

/// Parse a `cloud.json`/`goog.json` document.
pub fn parse(json: &[u8]) -> Result<ProviderRanges> {
    let document: GcpIpRanges = serde_json::from_slice(json)?;
    ProviderRanges::from_cidrs(document.prefixes.iter().map(GcpPrefix::cidr))
}

/// Classify a bare list of CIDR strings.
pub fn from_cidrs<I, S>(cidrs: I) -> Result<ProviderRanges>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ProviderRanges::from_cidrs(cidrs)
}
