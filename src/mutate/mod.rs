//! Applying selected variants to reference sequence
//!
//! Mutation of one region runs in three stages:
//!
//! 1. [`IntervalModifyMap`] replays the variants against the region bounds
//!    and classifies each update
//! 2. [`AdjustedSequence`] applies the accepted updates to a copy of the
//!    reference, recording every step in a [`ModifiedOffsetMap`]
//! 3. queries read sub-sequences (or whole exon sets) back out of either
//!    buffer
//!
//! [`mutate_region`] chains variant selection, reference lookup and these
//! stages for a single contig region.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ferro_mutate::config::MutateConfig;
//! use ferro_mutate::interval::Interval;
//! use ferro_mutate::mutate::mutate_region;
//! use ferro_mutate::reference::MockProvider;
//! use ferro_mutate::variant::{ContigVariants, Phase, Variant};
//!
//! let provider = MockProvider::with_test_data();
//! let mut calls = ContigVariants::new("chr1");
//! calls.add(Arc::new(Variant::new("chr1", 3, Phase::A, "T", "TTT"))).unwrap();
//!
//! let region = mutate_region(&provider, &calls, Interval::new(0, 8), &MutateConfig::default()).unwrap();
//! assert_eq!(region.sequence.modified_sequence().unwrap(), "ACGTTTACGT");
//! assert_eq!(region.stats.selected, 1);
//! ```

pub mod concat;
pub mod offset_map;
pub mod sequence;
pub mod tracker;

pub use concat::{coding_sequence, concat_regions};
pub use offset_map::{AdjustedModifiedOffset, ModifiedOffsetMap};
pub use sequence::{AdjustedSequence, SequenceSource};
pub use tracker::{IntervalModifyMap, SequenceVariantUpdate, UpdateResult};

use crate::config::MutateConfig;
use crate::error::FerroError;
use crate::interval::Interval;
use crate::reference::ReferenceProvider;
use crate::variant::{ContigVariants, SelectionStats, VariantSelector};

/// A mutated region together with the selection counters that produced it
#[derive(Debug, Clone)]
pub struct MutatedRegion {
    pub sequence: AdjustedSequence,
    pub stats: SelectionStats,
}

/// Select the calls of `variants` that touch `interval` and apply them
///
/// Errors come from the reference lookup. Variant problems leave the
/// returned sequence invalid instead; check [`AdjustedSequence::is_valid`].
pub fn mutate_region<P>(
    provider: &P,
    variants: &ContigVariants,
    interval: Interval,
    config: &MutateConfig,
) -> Result<MutatedRegion, FerroError>
where
    P: ReferenceProvider + ?Sized,
{
    let reference = provider.sequence(variants.contig(), interval)?;
    apply_to_reference(reference.as_bytes(), variants, interval, config)
}

/// As [`mutate_region`], with the reference bases of `interval` already fetched
pub fn apply_to_reference(
    reference: &[u8],
    variants: &ContigVariants,
    interval: Interval,
    config: &MutateConfig,
) -> Result<MutatedRegion, FerroError> {
    let contig = variants.contig();
    let selected = VariantSelector::from_config(config).select(variants, interval);

    log::debug!(
        "{}:{} applying {} of {} scanned calls",
        contig,
        interval,
        selected.stats.selected,
        selected.stats.scanned
    );

    let sequence = AdjustedSequence::build_with(
        contig,
        interval,
        reference,
        &selected.variants,
        config.verify_snps,
    )?;

    Ok(MutatedRegion {
        sequence,
        stats: selected.stats,
    })
}
