//! Property-based tests for intervals, canonicalization and mutation
//!
//! Uses proptest to check the size and offset invariants of the mutation
//! engine over randomly generated references and variant sets.

use ferro_mutate::mutate::AdjustedSequence;
use ferro_mutate::variant::OffsetVariantMap;
use ferro_mutate::{
    mutate_region, ContigVariants, Interval, IntervalSet, MockProvider, MutateConfig, Phase,
    Variant, VariantType,
};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

// =============================================================================
// Strategies
// =============================================================================

fn nucleotide() -> impl Strategy<Value = char> {
    prop_oneof![Just('A'), Just('C'), Just('G'), Just('T'),]
}

fn sequence(len: impl Into<prop::collection::SizeRange>) -> impl Strategy<Value = String> {
    prop::collection::vec(nucleotide(), len).prop_map(|v| v.into_iter().collect())
}

fn interval() -> impl Strategy<Value = Interval> {
    (0..100u64, 0..100u64).prop_map(|(a, b)| Interval::new(a, b))
}

/// A base different from `base`
fn substitute(base: char, shift: usize) -> char {
    let index = BASES.iter().position(|&b| b == base).unwrap_or(0);
    BASES[(index + shift) % 4]
}

fn build(reference: &str, variants: Vec<Variant>) -> AdjustedSequence {
    let map: OffsetVariantMap = variants
        .into_iter()
        .map(|v| (v.modify_interval().lower(), Arc::new(v)))
        .collect();
    let interval = Interval::with_size(0, reference.len() as u64);
    AdjustedSequence::build("chr1", interval, reference.as_bytes(), &map).unwrap()
}

// =============================================================================
// Interval algebra
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn intersection_empty_iff_disjoint(a in interval(), b in interval()) {
        prop_assert_eq!(a.intersection(&b).is_empty(), a.disjoint(&b));
    }

    #[test]
    fn merge_is_symmetric(a in interval(), b in interval()) {
        prop_assert_eq!(a.merge(&b), b.merge(&a));
    }

    #[test]
    fn intersection_within_both(a in interval(), b in interval()) {
        let overlap = a.intersection(&b);
        if !overlap.is_empty() {
            prop_assert!(a.contains_interval(&overlap));
            prop_assert!(b.contains_interval(&overlap));
        }
    }

    #[test]
    fn interval_set_coverage_counts_offsets(members in prop::collection::vec(interval(), 0..10)) {
        let set: IntervalSet = members.iter().copied().collect();
        let offsets: HashSet<u64> = members.iter().flat_map(|iv| iv.lower()..iv.upper()).collect();
        prop_assert_eq!(set.coverage(), offsets.len() as u64);
        for offset in 0..100u64 {
            prop_assert_eq!(set.contains_offset(offset), offsets.contains(&offset));
        }
    }
}

#[test]
fn merge_of_empty_sentinels_is_empty() {
    let empty = Interval::empty_sentinel();
    assert_eq!(empty.merge(&empty), empty);
}

// =============================================================================
// Canonicalization
// =============================================================================

proptest! {
    #[test]
    fn canonicalization_is_idempotent(
        offset in 0..1000u64,
        reference in sequence(1..8),
        alternate in sequence(1..8),
    ) {
        let variant = Variant::new("chr1", offset, Phase::Unphased, reference, alternate);
        let once = variant.canonical_clone();
        prop_assert_eq!(once.canonical_sequences(), variant.canonical_sequences());
    }

    #[test]
    fn canonical_indel_size_preserved(
        offset in 0..1000u64,
        reference in sequence(1..8),
        alternate in sequence(1..8),
    ) {
        let variant = Variant::new("chr1", offset, Phase::Unphased, reference, alternate);
        let canonical = variant.canonical_clone();
        prop_assert_eq!(canonical.size_delta(), variant.size_delta());
    }
}

// =============================================================================
// Mutation size invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn empty_variant_set_round_trips(reference in sequence(1..50)) {
        let seq = build(&reference, Vec::new());
        prop_assert_eq!(seq.modified_sequence().unwrap(), reference.clone());
        for x in 0..reference.len() as u64 {
            prop_assert_eq!(
                seq.offset_map().modified_zero_offset(x).unwrap(),
                seq.offset_map().original_zero_offset(x).unwrap()
            );
        }
    }

    #[test]
    fn snp_keeps_size(reference in sequence(8), position in 0..8usize, shift in 1..4usize) {
        let base = reference.as_bytes()[position] as char;
        let alt = substitute(base, shift);
        let variant = Variant::new("chr1", position as u64, Phase::A, base.to_string(), alt.to_string());
        let seq = build(&reference, vec![variant]);

        let modified = seq.modified_sequence().unwrap();
        prop_assert_eq!(modified.len(), reference.len());
        prop_assert_eq!(modified.as_bytes()[position] as char, alt);
    }

    #[test]
    fn snp_sets_keep_size(
        reference in sequence(20),
        edits in prop::collection::btree_map(0..20usize, 1..4usize, 0..8),
    ) {
        let variants: Vec<Variant> = edits
            .iter()
            .map(|(&position, &shift)| {
                let base = reference.as_bytes()[position] as char;
                Variant::new("chr1", position as u64, Phase::A, base.to_string(), substitute(base, shift).to_string())
            })
            .collect();
        let seq = build(&reference, variants);
        prop_assert!(seq.is_valid());

        let modified = seq.modified_sequence().unwrap();
        prop_assert_eq!(modified.len(), reference.len());
        let changed: Vec<usize> = reference
            .bytes()
            .zip(modified.bytes())
            .enumerate()
            .filter(|(_, (r, m))| r != m)
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(changed, edits.keys().copied().collect::<Vec<_>>());
    }

    #[test]
    fn insert_grows_by_inserted_bases(
        reference in sequence(8),
        position in 0..8usize,
        inserted in sequence(1..6),
    ) {
        let anchor = &reference[position..position + 1];
        let variant = Variant::new("chr1", position as u64, Phase::A, anchor, format!("{}{}", anchor, inserted));
        let seq = build(&reference, vec![variant]);

        let expected = format!("{}{}{}", &reference[..=position], inserted, &reference[position + 1..]);
        prop_assert_eq!(seq.modified_sequence().unwrap(), expected);
        prop_assert_eq!(seq.offset_map().modified_size(), (reference.len() + inserted.len()) as u64);
    }

    #[test]
    fn delete_shrinks_by_deleted_bases(
        reference in sequence(8),
        position in 0..7usize,
        size in 1..7usize,
    ) {
        let size = size.min(7 - position);
        let variant = Variant::new(
            "chr1",
            position as u64,
            Phase::A,
            &reference[position..position + 1 + size],
            &reference[position..position + 1],
        );
        let seq = build(&reference, vec![variant]);

        let expected = format!("{}{}", &reference[..=position], &reference[position + 1 + size..]);
        prop_assert_eq!(seq.modified_sequence().unwrap(), expected);
        prop_assert_eq!(seq.offset_map().modified_size(), (reference.len() - size) as u64);
    }
}

// =============================================================================
// Mixed variant sets against a direct splice
// =============================================================================

const CONTIG_LEN: usize = 40;

/// One planned edit: gap before it, kind, SNP shift, inserted bases, deletion size
type Edit = (usize, usize, usize, String, usize);

fn edit() -> impl Strategy<Value = Edit> {
    (1..4usize, 0..3usize, 1..4usize, sequence(1..4), 1..5usize)
}

/// Lay edits out left to right so no call touches another's bases
fn place(reference: &str, edits: &[Edit]) -> Vec<Variant> {
    let mut variants = Vec::new();
    let mut position = 0;
    for (gap, kind, shift, inserted, size) in edits {
        position += gap - 1;
        if position >= reference.len() {
            break;
        }
        let anchor = &reference[position..position + 1];
        let (variant, used) = match kind {
            0 => {
                let alt = substitute(anchor.as_bytes()[0] as char, *shift).to_string();
                (Variant::new("chr1", position as u64, Phase::A, anchor, alt), 1)
            }
            1 => {
                let alt = format!("{}{}", anchor, inserted);
                (Variant::new("chr1", position as u64, Phase::A, anchor, alt), 1)
            }
            _ => {
                let end = (position + 1 + size).min(reference.len());
                if end == position + 1 {
                    break;
                }
                let deleted = &reference[position..end];
                (Variant::new("chr1", position as u64, Phase::A, deleted, anchor), end - position)
            }
        };
        variants.push(variant);
        position += used + 1;
    }
    variants
}

/// Bases of `target` after applying `variants` one contig offset at a time
fn splice(reference: &str, variants: &[Variant], target: Interval) -> String {
    let bases = reference.as_bytes();
    let mut snps: HashMap<u64, u8> = HashMap::new();
    let mut inserts: HashMap<u64, Vec<u8>> = HashMap::new();
    let mut deleted: HashSet<u64> = HashSet::new();
    for variant in variants {
        let alternate = variant.alternate().as_bytes();
        match variant.variant_type() {
            VariantType::Snp => {
                snps.insert(variant.offset(), alternate[0]);
            }
            VariantType::Insert => {
                inserts.insert(variant.offset() + 1, alternate[1..].to_vec());
            }
            VariantType::Delete => {
                let span = variant.modify_interval();
                deleted.extend(span.lower()..span.upper());
            }
        }
    }

    let mut out = Vec::new();
    for x in target.lower()..target.upper() {
        if let Some(inserted) = inserts.get(&x) {
            out.extend_from_slice(inserted);
        }
        if !deleted.contains(&x) {
            out.push(snps.get(&x).copied().unwrap_or(bases[x as usize]));
        }
    }
    if let Some(inserted) = inserts.get(&target.upper()) {
        out.extend_from_slice(inserted);
    }
    String::from_utf8(out).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn mixed_variant_sets_match_direct_splice(
        reference in sequence(CONTIG_LEN),
        edits in prop::collection::vec(edit(), 0..12),
        lower in 0..CONTIG_LEN as u64,
        size in 1..CONTIG_LEN as u64,
    ) {
        let target = Interval::new(lower, (lower + size).min(CONTIG_LEN as u64));
        let variants = place(&reference, &edits);

        let mut provider = MockProvider::new();
        provider.add_contig("chr1", reference.clone());
        let mut store = ContigVariants::new("chr1");
        for variant in &variants {
            store.add(Arc::new(variant.clone())).unwrap();
        }

        let region = mutate_region(&provider, &store, target, &MutateConfig::default()).unwrap();
        prop_assert!(region.sequence.is_valid(), "{:?}", region.sequence.failure());
        prop_assert_eq!(region.sequence.modify_map().error_count(), 0);
        prop_assert_eq!(
            region.sequence.modified_sequence().unwrap(),
            splice(&reference, &variants, target)
        );
        prop_assert_eq!(region.sequence.original_sequence().unwrap(), &reference[target.lower() as usize..target.upper() as usize]);
    }
}
