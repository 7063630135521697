//! Adapters from each provider's published feed to
//! [`ProviderRanges`](crate::store::ProviderRanges).
//!
//! Every adapter classifies prefixes by their parsed family, keeps
//! duplicates, and rejects the whole document on the first malformed CIDR.

pub mod aws;
pub mod azure;
pub mod gcp;

use crate::error::Result;
use crate::store::RangeStore;

/// Build a [`RangeStore`] from the three native feed documents: AWS
/// `ip-ranges.json`, GCP `cloud.json`, and Azure `ServiceTags_Public_*.json`.
///
/// Pair with [`crate::snapshot::encode`] to publish a fresh snapshot.
pub fn build_store(aws_json: &[u8], gcp_json: &[u8], azure_json: &[u8]) -> Result<RangeStore> {
    Ok(RangeStore::new(
        aws::parse(aws_json)?,
        gcp::parse(gcp_json)?,
        azure::parse(azure_json)?,
    ))
}
