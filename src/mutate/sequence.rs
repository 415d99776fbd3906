//! Applying variants to sequence buffers
//!
//! An [`AdjustedSequence`] owns two copies of the reference bases over a
//! tracked interval. The original copy is never changed; the modified copy
//! receives every accepted update in ascending contig offset order. Each
//! update is checked against the reference bases it claims to replace
//! before it is applied, and the whole sequence is invalidated on the first
//! failure. An invalid sequence answers every query with
//! [`FerroError::InvalidSequence`].

use std::fmt;

use crate::diagnostic;
use crate::error::FerroError;
use crate::interval::Interval;
use crate::variant::{OffsetVariantMap, VariantType};

use super::offset_map::{AdjustedModifiedOffset, ModifiedOffsetMap};
use super::tracker::{IntervalModifyMap, SequenceVariantUpdate};

/// Which buffer a query reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SequenceSource {
    /// The buffer with variants applied
    #[default]
    Modified,
    /// The reference bases
    Original,
}

impl fmt::Display for SequenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceSource::Modified => write!(f, "modified"),
            SequenceSource::Original => write!(f, "original"),
        }
    }
}

/// Reference and mutated bases over one contig interval
#[derive(Debug, Clone)]
pub struct AdjustedSequence {
    contig: String,
    interval: Interval,
    original: Vec<u8>,
    modified: Vec<u8>,
    offset_map: ModifiedOffsetMap,
    modify_map: IntervalModifyMap,
    failure: Option<FerroError>,
}

impl AdjustedSequence {
    /// Apply `variants` to `reference`, the bases of `interval` on `contig`
    ///
    /// Only a reference of the wrong length is an error here; problems with
    /// individual variants invalidate the returned sequence instead.
    pub fn build(
        contig: &str,
        interval: Interval,
        reference: &[u8],
        variants: &OffsetVariantMap,
    ) -> Result<Self, FerroError> {
        Self::build_with(contig, interval, reference, variants, true)
    }

    /// As [`AdjustedSequence::build`], optionally skipping the SNP re-check
    pub fn build_with(
        contig: &str,
        interval: Interval,
        reference: &[u8],
        variants: &OffsetVariantMap,
        verify_snps: bool,
    ) -> Result<Self, FerroError> {
        if reference.len() as u64 != interval.size() {
            return Err(FerroError::InvalidSequence {
                contig: contig.to_string(),
                interval: interval.to_string(),
                msg: format!(
                    "reference has {} bases, interval needs {}",
                    reference.len(),
                    interval.size()
                ),
            });
        }

        let original = reference.to_ascii_uppercase();
        let mut sequence = Self {
            contig: contig.to_string(),
            interval,
            modified: original.clone(),
            original,
            offset_map: ModifiedOffsetMap::new(interval),
            modify_map: IntervalModifyMap::build(contig, interval, variants),
            failure: None,
        };

        let outcome = sequence.apply_all().and_then(|_| {
            if verify_snps {
                sequence.verify_snps()?;
            }
            sequence.verify_size()
        });

        if let Err(err) = outcome {
            diagnostic::report(&format!("{}:{}", contig, interval), &err, || {
                diagnostic::audit_dump(
                    &format!("{} {}", contig, interval),
                    sequence.modify_map.updates(),
                )
            });
            sequence.failure = Some(err);
        }

        Ok(sequence)
    }

    fn apply_all(&mut self) -> Result<(), FerroError> {
        if !self.modify_map.is_valid() {
            return Err(FerroError::invariant(
                "interval tracking failed before sequence mutation",
            ));
        }
        let updates: Vec<SequenceVariantUpdate> = self
            .modify_map
            .updates()
            .filter(|u| u.result.is_applied())
            .cloned()
            .collect();
        for update in updates {
            self.apply_update(update)?;
        }
        Ok(())
    }

    /// Apply one update; a second update at an occupied offset is dropped
    fn apply_update(&mut self, update: SequenceVariantUpdate) -> Result<(), FerroError> {
        if let Some(existing) = self.offset_map.get(update.key) {
            log::warn!(
                "{}: offset {} already holds {}; dropping {}",
                self.contig,
                update.key,
                existing.update.variant,
                update.variant
            );
            return Ok(());
        }
        let entry = match update.variant.variant_type() {
            VariantType::Snp => self.apply_snp(update)?,
            VariantType::Delete => self.apply_delete(update)?,
            VariantType::Insert => self.apply_insert(update)?,
        };
        self.offset_map.insert(entry)
    }

    fn apply_snp(&mut self, update: SequenceVariantUpdate) -> Result<AdjustedModifiedOffset, FerroError> {
        let offset = update.key;
        let mz = self.offset_map.modified_zero_offset(offset)? as usize;
        let expected = first_base(update.variant.reference())?;
        let alternate = first_base(update.variant.alternate())?;

        let found = *self.modified.get(mz).ok_or_else(|| {
            FerroError::out_of_bounds(format!(
                "SNP at {} resolves past buffer end ({})",
                offset,
                self.modified.len()
            ))
        })?;
        if found != expected {
            return Err(self.mismatch(offset, &[expected], &[found]));
        }

        self.modified[mz] = alternate;
        Ok(AdjustedModifiedOffset::new(offset, mz as u64, 0, update))
    }

    fn apply_delete(&mut self, update: SequenceVariantUpdate) -> Result<AdjustedModifiedOffset, FerroError> {
        let span = update.variant.modify_interval();
        let clipped = span.intersection(&self.interval);
        if clipped.is_empty() {
            return Err(FerroError::out_of_bounds(format!(
                "deletion {} does not overlap {}",
                span, self.interval
            )));
        }
        if self.offset_map.in_delete_shadow(clipped.lower()) {
            return Err(FerroError::out_of_bounds(format!(
                "deletion {} overlaps an earlier deletion",
                span
            )));
        }

        // Slice of the deleted bases that lies inside this buffer; the
        // reference allele starts with the anchor base at span.lower() - 1.
        let reference = update.variant.reference().as_bytes();
        let from = 1 + (clipped.lower() - span.lower()) as usize;
        let to = 1 + (clipped.upper() - span.lower()) as usize;
        let expected = reference.get(from..to).ok_or_else(|| {
            FerroError::invariant(format!(
                "deletion {} has a {}-base reference allele",
                span,
                reference.len()
            ))
        })?;

        let mz = self.offset_map.modified_zero_offset(clipped.lower())? as usize;
        let end = mz + expected.len();
        let in_modified = self.modified.get(mz..end) == Some(expected);
        if !in_modified {
            let original_from = (clipped.lower() - self.interval.lower()) as usize;
            let in_original =
                self.original.get(original_from..original_from + expected.len()) == Some(expected);
            if !in_original {
                let found = self.modified.get(mz..end.min(self.modified.len())).unwrap_or_default();
                return Err(self.mismatch(clipped.lower(), expected, found));
            }
            if end > self.modified.len() {
                return Err(FerroError::out_of_bounds(format!(
                    "deletion {} resolves past buffer end ({})",
                    clipped,
                    self.modified.len()
                )));
            }
            log::debug!(
                "{}: deletion {} matched the original bases only",
                self.contig,
                span
            );
        }

        self.modified.drain(mz..end);
        let delta = -(expected.len() as i64);
        Ok(AdjustedModifiedOffset::new(update.key, mz as u64, delta, update).with_deleted(span))
    }

    fn apply_insert(&mut self, update: SequenceVariantUpdate) -> Result<AdjustedModifiedOffset, FerroError> {
        let point = update.key;
        let mz = self.offset_map.modified_zero_offset(point)? as usize;
        if mz > self.modified.len() {
            return Err(FerroError::out_of_bounds(format!(
                "insertion at {} resolves past buffer end ({})",
                point,
                self.modified.len()
            )));
        }

        // The anchor base sits before the buffer when inserting at its lower bound
        if point > self.interval.lower() {
            let anchor = first_base(update.variant.reference())?;
            let in_modified = mz > 0 && self.modified.get(mz - 1) == Some(&anchor);
            let original_anchor = (point - 1 - self.interval.lower()) as usize;
            if !in_modified && self.original.get(original_anchor) != Some(&anchor) {
                let found: Vec<u8> = mz
                    .checked_sub(1)
                    .and_then(|i| self.modified.get(i))
                    .copied()
                    .into_iter()
                    .collect();
                return Err(self.mismatch(point - 1, &[anchor], &found));
            }
        }

        let inserted = &update.variant.alternate().as_bytes()[1..];
        let delta = inserted.len() as i64;
        self.modified.splice(mz..mz, inserted.iter().copied());
        Ok(AdjustedModifiedOffset::new(point, mz as u64, delta, update))
    }

    /// Re-check that every applied SNP left its alternate base behind
    fn verify_snps(&self) -> Result<(), FerroError> {
        for entry in self.offset_map.entries() {
            let variant = &entry.update.variant;
            if variant.variant_type() != VariantType::Snp {
                continue;
            }
            let mz = self.offset_map.modified_zero_offset(entry.contig_offset)? as usize;
            let alternate = first_base(variant.alternate())?;
            match self.modified.get(mz) {
                Some(&base) if base == alternate => {}
                other => {
                    let found: Vec<u8> = other.copied().into_iter().collect();
                    return Err(self.mismatch(entry.contig_offset, &[alternate], &found));
                }
            }
        }
        Ok(())
    }

    fn verify_size(&self) -> Result<(), FerroError> {
        let buffer = self.modified.len() as u64;
        let tracked = self.modify_map.modified().size();
        if buffer != tracked || buffer != self.offset_map.modified_size() {
            return Err(FerroError::invariant(format!(
                "mutated buffer has {} bases, tracker expects {}, offset map {}",
                buffer,
                tracked,
                self.offset_map.modified_size()
            )));
        }
        Ok(())
    }

    fn mismatch(&self, offset: u64, expected: &[u8], found: &[u8]) -> FerroError {
        FerroError::ReferenceMismatch {
            location: format!("{}:{}", self.contig, offset),
            expected: String::from_utf8_lossy(expected).into_owned(),
            found: String::from_utf8_lossy(found).into_owned(),
        }
    }

    fn ensure_valid(&self) -> Result<(), FerroError> {
        match &self.failure {
            None => Ok(()),
            Some(err) => Err(FerroError::InvalidSequence {
                contig: self.contig.clone(),
                interval: self.interval.to_string(),
                msg: err.to_string(),
            }),
        }
    }

    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// The tracked contig interval
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// True if every update applied and verified
    pub fn is_valid(&self) -> bool {
        self.failure.is_none()
    }

    /// The error that invalidated this sequence, if any
    pub fn failure(&self) -> Option<&FerroError> {
        self.failure.as_ref()
    }

    pub fn offset_map(&self) -> &ModifiedOffsetMap {
        &self.offset_map
    }

    pub fn modify_map(&self) -> &IntervalModifyMap {
        &self.modify_map
    }

    /// The whole mutated buffer
    pub fn modified_sequence(&self) -> Result<String, FerroError> {
        self.ensure_valid()?;
        Ok(String::from_utf8_lossy(&self.modified).into_owned())
    }

    /// The whole reference buffer
    pub fn original_sequence(&self) -> Result<String, FerroError> {
        self.ensure_valid()?;
        Ok(String::from_utf8_lossy(&self.original).into_owned())
    }

    /// Mutated bases for a contig interval inside the tracked interval
    ///
    /// An interval lying entirely within a deleted span yields an empty
    /// string.
    pub fn modified_sub_sequence(&self, interval: &Interval) -> Result<String, FerroError> {
        self.ensure_valid()?;
        let range = self.offset_map.lookup_modified_interval(interval)?;
        slice(&self.modified, range)
    }

    /// Reference bases for a contig interval inside the tracked interval
    pub fn original_sub_sequence(&self, interval: &Interval) -> Result<String, FerroError> {
        self.ensure_valid()?;
        let range = self.offset_map.lookup_original_interval(interval)?;
        slice(&self.original, range)
    }

    pub fn sub_sequence(&self, interval: &Interval, source: SequenceSource) -> Result<String, FerroError> {
        match source {
            SequenceSource::Modified => self.modified_sub_sequence(interval),
            SequenceSource::Original => self.original_sub_sequence(interval),
        }
    }
}

fn first_base(allele: &str) -> Result<u8, FerroError> {
    allele
        .as_bytes()
        .first()
        .copied()
        .ok_or_else(|| FerroError::invariant("empty allele"))
}

fn slice(buffer: &[u8], range: Interval) -> Result<String, FerroError> {
    buffer
        .get(range.lower() as usize..range.upper() as usize)
        .map(|bases| String::from_utf8_lossy(bases).into_owned())
        .ok_or_else(|| {
            FerroError::out_of_bounds(format!(
                "buffer range {} exceeds buffer of {}",
                range,
                buffer.len()
            ))
        })
}
