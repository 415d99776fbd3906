//! Sets of disjoint intervals
//!
//! [`IntervalSet`] keeps its members sorted and disjoint: inserting an
//! interval that overlaps or touches existing members merges them.

use std::collections::BTreeMap;

use super::Interval;

/// An ordered set of disjoint, non-adjacent intervals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    /// lower -> upper
    ranges: BTreeMap<u64, u64>,
}

impl IntervalSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an interval, merging it with any member it overlaps or touches
    ///
    /// Empty intervals are ignored.
    pub fn insert(&mut self, interval: Interval) {
        if interval.is_empty() {
            return;
        }

        let mut lower = interval.lower();
        let mut upper = interval.upper();

        let absorbed: Vec<(u64, u64)> = self
            .ranges
            .range(..=upper)
            .rev()
            .take_while(|(_, &end)| end >= lower)
            .map(|(&start, &end)| (start, end))
            .collect();

        for (start, end) in absorbed {
            self.ranges.remove(&start);
            lower = lower.min(start);
            upper = upper.max(end);
        }

        self.ranges.insert(lower, upper);
    }

    /// The member containing `offset`, if any
    pub fn find(&self, offset: u64) -> Option<Interval> {
        self.ranges
            .range(..=offset)
            .next_back()
            .map(|(&start, &end)| Interval::new(start, end))
            .filter(|iv| iv.contains_offset(offset))
    }

    /// True if some member contains `offset`
    pub fn contains_offset(&self, offset: u64) -> bool {
        self.find(offset).is_some()
    }

    /// True if a single member fully covers `interval`
    pub fn contains_interval(&self, interval: &Interval) -> bool {
        self.ranges
            .range(..=interval.lower())
            .next_back()
            .map(|(&start, &end)| Interval::new(start, end).contains_interval(interval))
            .unwrap_or(false)
    }

    /// True if any member shares an offset with `interval`
    pub fn intersects(&self, interval: &Interval) -> bool {
        if interval.is_empty() {
            return false;
        }
        self.ranges
            .range(..interval.upper())
            .next_back()
            .map(|(_, &end)| end > interval.lower())
            .unwrap_or(false)
    }

    /// Iterate members in ascending order
    pub fn iter(&self) -> impl Iterator<Item = Interval> + '_ {
        self.ranges
            .iter()
            .map(|(&start, &end)| Interval::new(start, end))
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// True if the set has no members
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of offsets covered by all members
    pub fn coverage(&self) -> u64 {
        self.ranges.iter().map(|(start, end)| end - start).sum()
    }
}

impl FromIterator<Interval> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = Interval>>(iter: T) -> Self {
        let mut set = IntervalSet::new();
        for interval in iter {
            set.insert(interval);
        }
        set
    }
}
