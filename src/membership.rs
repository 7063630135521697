//! Point-in-range membership checks.

use crate::address::{Address, CidrRange, Family};

/// Whether any range in `ranges` contains `address`.
///
/// Ranges of the other family are skipped, and the answer does not depend on
/// the order of `ranges`.
pub fn contains(ranges: &[CidrRange], address: &Address) -> bool {
    ranges.iter().any(|range| range.contains(address))
}

/// Sorted, merged intervals for one address family.
///
/// Answers exactly what [`contains`] answers for the ranges it was built
/// from, in logarithmic time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeIndex {
    family: Option<Family>,
    intervals: Vec<(u128, u128)>,
}

impl RangeIndex {
    /// Build an index over the ranges of `family`; ranges of the other family
    /// are left out.
    pub fn build<'a, I>(family: Family, ranges: I) -> Self
    where
        I: IntoIterator<Item = &'a CidrRange>,
    {
        let mut bounds: Vec<(u128, u128)> = ranges
            .into_iter()
            .filter(|range| range.family() == family)
            .map(CidrRange::bounds)
            .collect();
        bounds.sort_unstable();

        let mut intervals: Vec<(u128, u128)> = Vec::with_capacity(bounds.len());
        for (first, last) in bounds {
            match intervals.last_mut() {
                Some((_, end)) if first <= end.saturating_add(1) => {
                    *end = (*end).max(last);
                }
                _ => intervals.push((first, last)),
            }
        }
        intervals.shrink_to_fit();

        Self {
            family: Some(family),
            intervals,
        }
    }

    pub fn family(&self) -> Option<Family> {
        self.family
    }

    /// Number of disjoint intervals after merging.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        if self.family != Some(address.family()) {
            return false;
        }

        let value = address.to_bits();
        let after = self.intervals.partition_point(|&(first, _)| first <= value);
        after > 0 && value <= self.intervals[after - 1].1
    }
}
