//! Per-provider range storage.

use serde::Serialize;

use crate::address::{parse_cidr, Address, CidrRange, Family};
use crate::error::Result;
use crate::membership::{self, RangeIndex};
use crate::provider::CloudProvider;

/// One provider's ranges, split by address family.
///
/// Ranges keep their insertion order and duplicates; both only matter for
/// reproducible snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderRanges {
    v4: Vec<CidrRange>,
    v6: Vec<CidrRange>,
}

impl ProviderRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and classify a list of CIDR strings.
    pub fn from_cidrs<I, S>(cidrs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranges = Self::new();
        for cidr in cidrs {
            ranges.push(parse_cidr(cidr.as_ref())?);
        }
        Ok(ranges)
    }

    /// Append a range to the list matching its family.
    pub fn push(&mut self, range: CidrRange) {
        match range.family() {
            Family::Ipv4 => self.v4.push(range),
            Family::Ipv6 => self.v6.push(range),
        }
    }

    pub fn v4(&self) -> &[CidrRange] {
        &self.v4
    }

    pub fn v6(&self) -> &[CidrRange] {
        &self.v6
    }

    pub fn family(&self, family: Family) -> &[CidrRange] {
        match family {
            Family::Ipv4 => &self.v4,
            Family::Ipv6 => &self.v6,
        }
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    /// Linear membership check against the list for `address`'s family.
    pub fn contains(&self, address: &Address) -> bool {
        membership::contains(self.family(address.family()), address)
    }
}

impl Extend<CidrRange> for ProviderRanges {
    fn extend<T: IntoIterator<Item = CidrRange>>(&mut self, iter: T) {
        for range in iter {
            self.push(range);
        }
    }
}

impl FromIterator<CidrRange> for ProviderRanges {
    fn from_iter<T: IntoIterator<Item = CidrRange>>(iter: T) -> Self {
        let mut ranges = Self::new();
        ranges.extend(iter);
        ranges
    }
}

#[derive(Debug, Clone)]
struct IndexedRanges {
    ranges: ProviderRanges,
    v4: RangeIndex,
    v6: RangeIndex,
}

impl IndexedRanges {
    fn new(ranges: ProviderRanges) -> Self {
        let v4 = RangeIndex::build(Family::Ipv4, ranges.v4());
        let v6 = RangeIndex::build(Family::Ipv6, ranges.v6());
        Self { ranges, v4, v6 }
    }

    fn contains(&self, address: &Address) -> bool {
        match address.family() {
            Family::Ipv4 => self.v4.contains(address),
            Family::Ipv6 => self.v6.contains(address),
        }
    }
}

/// Ranges for every provider, with lookup indexes built once up front.
///
/// Immutable after construction; a refresh builds a new store.
#[derive(Debug, Clone)]
pub struct RangeStore {
    aws: IndexedRanges,
    gcp: IndexedRanges,
    azure: IndexedRanges,
}

impl RangeStore {
    pub fn new(aws: ProviderRanges, gcp: ProviderRanges, azure: ProviderRanges) -> Self {
        Self {
            aws: IndexedRanges::new(aws),
            gcp: IndexedRanges::new(gcp),
            azure: IndexedRanges::new(azure),
        }
    }

    fn indexed(&self, provider: CloudProvider) -> &IndexedRanges {
        match provider {
            CloudProvider::Aws => &self.aws,
            CloudProvider::Gcp => &self.gcp,
            CloudProvider::Azure => &self.azure,
        }
    }

    pub fn ranges(&self, provider: CloudProvider) -> &ProviderRanges {
        &self.indexed(provider).ranges
    }

    /// Whether `address` falls in any of `provider`'s ranges of the same family.
    pub fn contains(&self, provider: CloudProvider, address: &Address) -> bool {
        self.indexed(provider).contains(address)
    }

    /// Check `address` against every provider independently.
    pub fn lookup(&self, address: &Address) -> CloudInfoResult {
        CloudInfoResult {
            is_aws: self.contains(CloudProvider::Aws, address),
            is_gcp: self.contains(CloudProvider::Gcp, address),
            is_azure: self.contains(CloudProvider::Azure, address),
        }
    }

    /// Total number of ranges across all providers.
    pub fn len(&self) -> usize {
        CloudProvider::ALL
            .iter()
            .map(|&provider| self.ranges(provider).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Independent per-provider membership flags for one address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudInfoResult {
    pub is_aws: bool,
    pub is_gcp: bool,
    pub is_azure: bool,
}

impl CloudInfoResult {
    pub fn get(&self, provider: CloudProvider) -> bool {
        match provider {
            CloudProvider::Aws => self.is_aws,
            CloudProvider::Gcp => self.is_gcp,
            CloudProvider::Azure => self.is_azure,
        }
    }

    /// Providers whose ranges matched.
    pub fn providers(&self) -> Vec<CloudProvider> {
        CloudProvider::ALL
            .into_iter()
            .filter(|&provider| self.get(provider))
            .collect()
    }

    pub fn is_cloud(&self) -> bool {
        self.is_aws || self.is_gcp || self.is_azure
    }
}
