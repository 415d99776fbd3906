//! Region concatenation
//!
//! Assembles exons (or any set of disjoint sub-intervals) of an
//! [`AdjustedSequence`] into one sequence.

use crate::error::FerroError;
use crate::interval::Interval;
use crate::reference::{reverse_complement, Strand};

use super::sequence::{AdjustedSequence, SequenceSource};

/// Concatenate `regions` in ascending lower-bound order
///
/// Regions sharing a lower bound are reported but still used. Any region
/// that cannot be extracted fails the whole concatenation.
pub fn concat_regions(
    sequence: &AdjustedSequence,
    regions: &[Interval],
    source: SequenceSource,
) -> Result<String, FerroError> {
    let mut sorted = regions.to_vec();
    sorted.sort();

    for pair in sorted.windows(2) {
        if pair[0].lower() == pair[1].lower() {
            log::warn!(
                "{}: regions {} and {} share lower bound {}",
                sequence.contig(),
                pair[0],
                pair[1],
                pair[0].lower()
            );
        }
    }

    let mut out = String::new();
    for region in &sorted {
        out.push_str(&sequence.sub_sequence(region, source)?);
    }
    Ok(out)
}

/// Concatenate exons and orient the result 5' to 3' for `strand`
pub fn coding_sequence(
    sequence: &AdjustedSequence,
    exons: &[Interval],
    strand: Strand,
    source: SequenceSource,
) -> Result<String, FerroError> {
    let joined = concat_regions(sequence, exons, source)?;
    Ok(match strand {
        Strand::Plus => joined,
        Strand::Minus => reverse_complement(&joined),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::{OffsetVariantMap, Phase, Variant};
    use std::sync::Arc;

    fn sequence(calls: &[(u64, &str, &str)]) -> AdjustedSequence {
        let variants: OffsetVariantMap = calls
            .iter()
            .map(|&(offset, r, a)| {
                let v = Variant::new("chr1", offset, Phase::A, r, a);
                (v.modify_interval().lower(), Arc::new(v))
            })
            .collect();
        AdjustedSequence::build("chr1", Interval::new(0, 12), b"AAACCCGGGTTT", &variants).unwrap()
    }

    #[test]
    fn test_concat_sorts_regions() {
        let seq = sequence(&[]);
        let exons = [Interval::new(9, 12), Interval::new(0, 3)];
        assert_eq!(concat_regions(&seq, &exons, SequenceSource::Original).unwrap(), "AAATTT");
    }

    #[test]
    fn test_concat_modified_with_indels() {
        // Insert GG after offset 1, delete [7, 9)
        let seq = sequence(&[(1, "A", "AGG"), (6, "GGG", "G")]);
        let exons = [Interval::new(0, 4), Interval::new(6, 10)];
        assert_eq!(concat_regions(&seq, &exons, SequenceSource::Modified).unwrap(), "AAGGACGT");
        assert_eq!(concat_regions(&seq, &exons, SequenceSource::Original).unwrap(), "AAACGGGT");
    }

    #[test]
    fn test_concat_failure_propagates() {
        let seq = sequence(&[]);
        let exons = [Interval::new(0, 3), Interval::new(10, 14)];
        assert!(concat_regions(&seq, &exons, SequenceSource::Modified).is_err());
    }

    #[test]
    fn test_duplicate_lower_bounds_not_fatal() {
        let seq = sequence(&[]);
        let exons = [Interval::new(0, 2), Interval::new(0, 3)];
        assert_eq!(concat_regions(&seq, &exons, SequenceSource::Original).unwrap(), "AAAAA");
    }

    #[test]
    fn test_coding_sequence_minus_strand() {
        let seq = sequence(&[]);
        let exons = [Interval::new(0, 3), Interval::new(3, 6)];
        assert_eq!(
            coding_sequence(&seq, &exons, Strand::Minus, SequenceSource::Modified).unwrap(),
            "GGGTTT"
        );
        assert_eq!(
            coding_sequence(&seq, &exons, Strand::Plus, SequenceSource::Modified).unwrap(),
            "AAACCC"
        );
    }
}
