//! Contig offset ↔ buffer offset translation
//!
//! A [`ModifiedOffsetMap`] is anchored to one tracked contig interval. The
//! unmutated buffer covers the interval exactly, so a contig offset `c`
//! resolves to `c - lower` there. In the mutated buffer every applied
//! variant contributes an entry; `c` resolves through the nearest entry
//! keyed strictly before it:
//!
//! ```text
//! modified_zero_offset(c) = c - lower + cumulative(nearest entry < c)
//! ```
//!
//! Offsets inside a deleted span have no base of their own and collapse to
//! the position where the deletion happened. The interval's upper bound
//! always resolves to the end of the mutated buffer.

use std::collections::BTreeMap;

use crate::error::FerroError;
use crate::interval::Interval;

use super::tracker::SequenceVariantUpdate;

/// One applied update as seen from the mutated buffer
#[derive(Debug, Clone)]
pub struct AdjustedModifiedOffset {
    /// First contig offset the update modifies
    pub contig_offset: u64,
    /// Zero-based mutated-buffer offset where the update was applied
    pub modified_offset: u64,
    /// Change in buffer length made by this update
    pub delta: i64,
    /// Running sum of deltas up to and including this update
    pub cumulative: i64,
    /// Contig span removed by a deletion; empty for other updates
    pub deleted: Interval,
    pub update: SequenceVariantUpdate,
}

impl AdjustedModifiedOffset {
    pub fn new(
        contig_offset: u64,
        modified_offset: u64,
        delta: i64,
        update: SequenceVariantUpdate,
    ) -> Self {
        Self {
            contig_offset,
            modified_offset,
            delta,
            cumulative: 0,
            deleted: Interval::empty_sentinel(),
            update,
        }
    }

    /// Mark the contig span this deletion removed
    pub fn with_deleted(mut self, span: Interval) -> Self {
        self.deleted = span;
        self
    }

    fn shadows(&self, offset: u64) -> bool {
        self.deleted.contains_offset(offset)
    }
}

/// Ordered translation table for one tracked interval
#[derive(Debug, Clone)]
pub struct ModifiedOffsetMap {
    interval: Interval,
    entries: BTreeMap<u64, AdjustedModifiedOffset>,
    modified_size: u64,
}

impl ModifiedOffsetMap {
    pub fn new(interval: Interval) -> Self {
        Self {
            interval,
            entries: BTreeMap::new(),
            modified_size: interval.size(),
        }
    }

    /// The tracked contig interval
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Length of the mutated buffer implied by the entries
    pub fn modified_size(&self) -> u64 {
        self.modified_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &AdjustedModifiedOffset> {
        self.entries.values()
    }

    pub fn get(&self, contig_offset: u64) -> Option<&AdjustedModifiedOffset> {
        self.entries.get(&contig_offset)
    }

    /// Cumulative delta after all entries
    pub fn total_delta(&self) -> i64 {
        self.entries.values().next_back().map_or(0, |e| e.cumulative)
    }

    /// Append an entry, filling in its cumulative delta
    ///
    /// Entries must arrive in ascending contig offset order. A second entry
    /// for an existing offset is rejected and the first one kept.
    pub fn insert(&mut self, mut entry: AdjustedModifiedOffset) -> Result<(), FerroError> {
        let key = entry.contig_offset;
        if self.entries.contains_key(&key) {
            log::warn!(
                "Offset map for {} already has an entry at {}; dropping {}",
                self.interval,
                key,
                entry.update.variant
            );
            return Err(FerroError::DuplicateInsertion {
                offset: key,
                msg: format!("{}", entry.update.variant),
            });
        }
        if let Some((&last, _)) = self.entries.iter().next_back() {
            if key < last {
                return Err(FerroError::InvalidCoordinates {
                    msg: format!("offset map entry {} inserted after {}", key, last),
                });
            }
        }

        entry.cumulative = self.total_delta() + entry.delta;
        let size = self.interval.size() as i64 + entry.cumulative;
        if size < 0 {
            return Err(FerroError::invariant(format!(
                "offset map for {} shrank below zero at {}",
                self.interval, key
            )));
        }
        self.modified_size = size as u64;
        self.entries.insert(key, entry);
        Ok(())
    }

    fn check_bound(&self, contig_offset: u64) -> Result<(), FerroError> {
        if contig_offset < self.interval.lower() || contig_offset > self.interval.upper() {
            return Err(FerroError::out_of_bounds(format!(
                "offset {} outside tracked interval {}",
                contig_offset, self.interval
            )));
        }
        Ok(())
    }

    /// Unmutated-buffer offset of a contig offset
    pub fn original_zero_offset(&self, contig_offset: u64) -> Result<u64, FerroError> {
        self.check_bound(contig_offset)?;
        Ok(contig_offset - self.interval.lower())
    }

    /// Mutated-buffer offset of a contig offset
    pub fn modified_zero_offset(&self, contig_offset: u64) -> Result<u64, FerroError> {
        self.check_bound(contig_offset)?;
        if contig_offset == self.interval.upper() {
            return Ok(self.modified_size);
        }
        self.lookup_indel_offset(contig_offset)
    }

    /// Resolve through the nearest prior entry, honouring delete shadows
    pub fn lookup_indel_offset(&self, contig_offset: u64) -> Result<u64, FerroError> {
        self.check_bound(contig_offset)?;
        let prior = self.entries.range(..contig_offset).next_back().map(|(_, e)| e);
        if let Some(entry) = prior {
            if entry.shadows(contig_offset) {
                return Ok(entry.modified_offset);
            }
        }

        let cumulative = prior.map_or(0, |e| e.cumulative);
        let resolved = (contig_offset - self.interval.lower()) as i64 + cumulative;
        if resolved < 0 || resolved as u64 > self.modified_size {
            return Err(FerroError::out_of_bounds(format!(
                "offset {} resolves to {} in a buffer of {}",
                contig_offset, resolved, self.modified_size
            )));
        }
        Ok(resolved as u64)
    }

    /// True if an earlier deletion already removed `contig_offset`
    pub fn in_delete_shadow(&self, contig_offset: u64) -> bool {
        self.entries
            .range(..contig_offset)
            .next_back()
            .is_some_and(|(_, e)| e.shadows(contig_offset))
    }

    /// Contig offset of a mutated-buffer offset
    ///
    /// Returns `None` for inserted bases and offsets past the buffer end.
    pub fn lookup_contig_offset(&self, modified_offset: u64) -> Option<u64> {
        if modified_offset >= self.modified_size {
            return None;
        }
        let lower = self.interval.lower() as i64;
        let m = modified_offset as i64;
        let mut cumulative = 0i64;

        for entry in self.entries.values() {
            if entry.delta > 0
                && modified_offset >= entry.modified_offset
                && m < entry.modified_offset as i64 + entry.delta
            {
                return None;
            }
            let candidate = lower + m - cumulative;
            if candidate < entry.contig_offset as i64 {
                return Some(candidate as u64);
            }
            cumulative = entry.cumulative;
        }

        let candidate = lower + m - cumulative;
        (candidate < self.interval.upper() as i64).then_some(candidate as u64)
    }

    /// Mutated-buffer interval for a contig interval
    ///
    /// Both bounds must resolve or neither is returned.
    pub fn lookup_modified_interval(&self, interval: &Interval) -> Result<Interval, FerroError> {
        self.check_contained(interval)?;
        let lower = self.modified_zero_offset(interval.lower())?;
        let upper = self.modified_zero_offset(interval.upper())?;
        if upper < lower {
            return Err(FerroError::invariant(format!(
                "{} maps to inverted buffer range {}..{}",
                interval, lower, upper
            )));
        }
        Ok(Interval::new(lower, upper))
    }

    /// Unmutated-buffer interval for a contig interval
    pub fn lookup_original_interval(&self, interval: &Interval) -> Result<Interval, FerroError> {
        self.check_contained(interval)?;
        let lower = self.original_zero_offset(interval.lower())?;
        let upper = self.original_zero_offset(interval.upper())?;
        Ok(Interval::new(lower, upper))
    }

    fn check_contained(&self, interval: &Interval) -> Result<(), FerroError> {
        if !self.interval.contains_interval(interval) {
            return Err(FerroError::out_of_bounds(format!(
                "{} not contained in tracked interval {}",
                interval, self.interval
            )));
        }
        Ok(())
    }
}
