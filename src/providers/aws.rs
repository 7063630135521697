//! AWS `ip-ranges.json` adapter.

use serde::Deserialize;

use crate::address::{parse_cidr, Family};
use crate::error::{CloudInfoError, Result};
use crate::store::ProviderRanges;

#[derive(Debug, Deserialize)]
struct AwsIpRanges {
    prefixes: Vec<IpPrefix>,
    ipv6_prefixes: Vec<Ipv6Prefix>,
}

#[derive(Debug, Deserialize)]
struct IpPrefix {
    ip_prefix: String,
}

#[derive(Debug, Deserialize)]
struct Ipv6Prefix {
    ipv6_prefix: String,
}

/// Parse an AWS `ip-ranges.json` document.
///
/// `prefixes[].ip_prefix` must be IPv4 and `ipv6_prefixes[].ipv6_prefix` must
/// be IPv6; a prefix in the wrong list is rejected.
pub fn parse(json: &[u8]) -> Result<ProviderRanges> {
    let document: AwsIpRanges = serde_json::from_slice(json)?;

    let v4 = document.prefixes.iter().map(|p| (p.ip_prefix.as_str(), Family::Ipv4));
    let v6 = document
        .ipv6_prefixes
        .iter()
        .map(|p| (p.ipv6_prefix.as_str(), Family::Ipv6));

    let mut ranges = ProviderRanges::new();
    for (cidr, family) in v4.chain(v6) {
        let range = parse_cidr(cidr)?;
        if range.family() != family {
            return Err(CloudInfoError::InvalidCidr(format!(
                "{} listed as {}",
                cidr, family
            )));
        }
        ranges.push(range);
    }
    Ok(ranges)
}
