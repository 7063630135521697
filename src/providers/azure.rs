//! Azure `ServiceTags_Public_*.json` adapter.

use serde::Deserialize;

use crate::error::Result;
use crate::store::ProviderRanges;

#[derive(Debug, Deserialize)]
struct ServiceTags {
    values: Vec<ServiceTag>,
}

#[derive(Debug, Deserialize)]
struct ServiceTag {
    properties: ServiceTagProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceTagProperties {
    address_prefixes: Vec<String>,
}

/// Parse a service tags document.
///
/// Every tag's `addressPrefixes` mixes IPv4 and IPv6; prefixes shared by
/// several tags are kept once per tag.
pub fn parse(json: &[u8]) -> Result<ProviderRanges> {
    let document: ServiceTags = serde_json::from_slice(json)?;
    ProviderRanges::from_cidrs(
        document
            .values
            .iter()
            .flat_map(|tag| tag.properties.address_prefixes.iter()),
    )
}
