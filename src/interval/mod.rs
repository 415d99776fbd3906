//! Half-open offset intervals
//!
//! All intervals in this crate are zero-based and half-open: `[lower, upper)`.
//! An interval is empty when `lower == upper`.
//!
//! Operations that can fail to produce a meaningful interval (disjoint
//! intersections, non-adjacent merges) return the empty sentinel `[0, 0)`
//! rather than an `Option`, so that interval arithmetic composes without
//! branching at every step. Use [`Interval::is_empty`] to test the result.
//!
//! # Examples
//!
//! ```
//! use ferro_mutate::interval::Interval;
//!
//! let exon = Interval::new(100, 200);
//! let window = Interval::new(150, 300);
//!
//! assert_eq!(exon.intersection(&window), Interval::new(150, 200));
//! assert_eq!(exon.merge(&window), Interval::new(100, 300));
//! assert!(exon.intersection(&Interval::new(500, 600)).is_empty());
//! ```

pub mod set;

pub use set::IntervalSet;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A zero-based half-open interval `[lower, upper)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Interval {
    lower: u64,
    upper: u64,
}

impl Interval {
    /// Create a new interval
    ///
    /// Bounds given in the wrong order are swapped so that `lower <= upper`
    /// always holds.
    pub fn new(lower: u64, upper: u64) -> Self {
        if lower <= upper {
            Self { lower, upper }
        } else {
            Self {
                lower: upper,
                upper: lower,
            }
        }
    }

    /// The empty sentinel `[0, 0)`
    pub const fn empty_sentinel() -> Self {
        Self { lower: 0, upper: 0 }
    }

    /// An interval of `size` starting at `lower`
    pub fn with_size(lower: u64, size: u64) -> Self {
        Self {
            lower,
            upper: lower + size,
        }
    }

    /// Inclusive lower bound
    #[inline]
    pub const fn lower(&self) -> u64 {
        self.lower
    }

    /// Exclusive upper bound
    #[inline]
    pub const fn upper(&self) -> u64 {
        self.upper
    }

    /// Number of offsets covered
    #[inline]
    pub const fn size(&self) -> u64 {
        self.upper - self.lower
    }

    /// True if the interval covers no offsets
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.lower == self.upper
    }

    /// Keep the lower bound and set the size
    pub fn resize(&self, size: u64) -> Self {
        Self::with_size(self.lower, size)
    }

    /// Shift both bounds by `offset` without changing the size
    ///
    /// If the shift would move the lower bound below zero (or overflow the
    /// upper bound) the interval is returned unchanged.
    pub fn translate(&self, offset: i64) -> Self {
        match (
            self.lower.checked_add_signed(offset),
            self.upper.checked_add_signed(offset),
        ) {
            (Some(lower), Some(upper)) => Self { lower, upper },
            _ => *self,
        }
    }

    /// Move the interval so that it starts at zero
    pub fn translate_zero(&self) -> Self {
        Self::with_size(0, self.size())
    }

    /// True if `offset` lies in `[lower, upper)`
    #[inline]
    pub fn contains_offset(&self, offset: u64) -> bool {
        self.lower <= offset && offset < self.upper
    }

    /// True if `other` lies entirely within this interval
    ///
    /// An empty interval is contained if its bound lies within `[lower, upper]`.
    #[inline]
    pub fn contains_interval(&self, other: &Interval) -> bool {
        self.lower <= other.lower && other.upper <= self.upper
    }

    /// True if the intervals touch end-to-start in either order
    #[inline]
    pub fn adjacent(&self, other: &Interval) -> bool {
        self.upper == other.lower || other.upper == self.lower
    }

    /// True if the intervals share no offset
    ///
    /// Empty intervals contain no offsets and are therefore disjoint from
    /// everything, including themselves.
    #[inline]
    pub fn disjoint(&self, other: &Interval) -> bool {
        !(self.lower < other.upper && other.lower < self.upper)
    }

    /// The offsets common to both intervals, or `[0, 0)` if disjoint
    pub fn intersection(&self, other: &Interval) -> Self {
        if self.disjoint(other) {
            return Self::empty_sentinel();
        }
        Self {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }

    /// The union of two overlapping, adjacent or nested intervals
    ///
    /// Returns `[0, 0)` when the intervals are separated by a gap. Merging two
    /// empty intervals with the same bound yields that (still empty) interval.
    pub fn merge(&self, other: &Interval) -> Self {
        let mergeable = !self.disjoint(other)
            || self.adjacent(other)
            || self.contains_interval(other)
            || other.contains_interval(self);
        if !mergeable {
            return Self::empty_sentinel();
        }
        Self {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Grow the interval by `size` offsets inserted before `offset`
    ///
    /// The insertion point may sit on either boundary. Returns `None` when the
    /// insertion point lies outside `[lower, upper]`.
    pub fn insert(&self, offset: u64, size: u64) -> Option<Self> {
        if offset < self.lower || offset > self.upper {
            return None;
        }
        Some(Self {
            lower: self.lower,
            upper: self.upper + size,
        })
    }

    /// Remove `span` from the interval, closing the gap
    ///
    /// Offsets downstream of the deleted span shift left by the span size, so
    /// a deletion that starts upstream of the interval moves its lower bound.
    /// Returns `None` when `span` and the interval are disjoint.
    pub fn delete(&self, span: &Interval) -> Option<Self> {
        let overlap = self.intersection(span);
        if overlap.is_empty() {
            return None;
        }
        let remaining = self.size() - overlap.size();
        let lower = self.lower.min(span.lower);
        Some(Self::with_size(lower, remaining))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lower, self.upper)
    }
}

impl From<std::ops::Range<u64>> for Interval {
    fn from(range: std::ops::Range<u64>) -> Self {
        Interval::new(range.start, range.end)
    }
}
