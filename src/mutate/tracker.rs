//! Interval adjustment tracking
//!
//! [`IntervalModifyMap`] replays a set of selected variants against the
//! bounds of a tracked interval without touching any sequence. Each variant
//! produces a [`SequenceVariantUpdate`] recording the interval before and
//! after the update and how the update was classified. The sequence engine
//! consults these records to decide which updates to apply and how much of
//! a deletion falls inside its buffer.
//!
//! Variant modify intervals are rebased by the full size of every indel
//! applied before them, so all bounds live in the coordinate space of the
//! partially-mutated contig. Size deltas count only the bases gained or lost
//! inside the tracked interval.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::diagnostic;
use crate::error::FerroError;
use crate::interval::{Interval, IntervalSet};
use crate::variant::{OffsetVariantMap, Variant, VariantType};

/// Classification of one tracker update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateResult {
    /// Applied entirely inside the tracked interval
    Normal,
    /// Rejected; a zero-size patch was applied
    Error,
    /// A deletion consumed the whole interval
    DeletedRegion,
    /// A deletion removed the top of the interval
    PartialHighDelete,
    /// A deletion removed the bottom of the interval
    PartialLowDelete,
}

impl UpdateResult {
    /// True for updates the sequence engine should apply
    pub fn is_applied(&self) -> bool {
        !matches!(self, UpdateResult::Error)
    }
}

impl fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateResult::Normal => "NORMAL",
            UpdateResult::Error => "ERROR",
            UpdateResult::DeletedRegion => "DELETED_REGION",
            UpdateResult::PartialHighDelete => "PARTIAL_HIGH_DELETE",
            UpdateResult::PartialLowDelete => "PARTIAL_LOW_DELETE",
        };
        write!(f, "{}", s)
    }
}

/// Audit record for one variant applied to the tracked interval
#[derive(Debug, Clone)]
pub struct SequenceVariantUpdate {
    /// Key of the variant in the selected map
    pub key: u64,
    pub variant: Arc<Variant>,
    /// Tracked interval before the update
    pub prior: Interval,
    /// Tracked interval after the update
    pub post: Interval,
    /// Variant modify interval rebased by prior indels
    pub updating: Interval,
    pub result: UpdateResult,
    /// Change in tracked interval size
    pub size_delta: i64,
    /// Shift applied to downstream contig offsets
    pub offset_delta: i64,
}

impl SequenceVariantUpdate {
    fn rejected(key: u64, variant: Arc<Variant>, prior: Interval, updating: Interval) -> Self {
        Self {
            key,
            variant,
            prior,
            post: prior,
            updating,
            result: UpdateResult::Error,
            size_delta: 0,
            offset_delta: 0,
        }
    }
}

impl fmt::Display for SequenceVariantUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key={} {} prior={} updating={} post={} {} size_delta={} offset_delta={}",
            self.key,
            self.variant,
            self.prior,
            self.updating,
            self.post,
            self.result,
            self.size_delta,
            self.offset_delta
        )
    }
}

/// Simulated evolution of a tracked interval under a set of variants
#[derive(Debug, Clone)]
pub struct IntervalModifyMap {
    original: Interval,
    modified: Interval,
    updates: BTreeMap<u64, SequenceVariantUpdate>,
    size_delta: i64,
    deleted_region: bool,
    valid: bool,
}

impl IntervalModifyMap {
    /// Replay `variants` in key order against `interval`
    pub fn build(contig: &str, interval: Interval, variants: &OffsetVariantMap) -> Self {
        let mut map = Self {
            original: interval,
            modified: interval,
            updates: BTreeMap::new(),
            size_delta: 0,
            deleted_region: false,
            valid: true,
        };

        let mut offset_shift: i64 = 0;
        // Contig spans of accepted deletions, before rebasing
        let mut deleted = IntervalSet::new();

        for (&key, variant) in variants {
            let prior = map.modified;
            let span = variant.modify_interval();
            let updating = span.translate(offset_shift);

            let update = if map.deleted_region {
                log::warn!(
                    "{}: rejecting {} after the interval was deleted",
                    contig,
                    variant
                );
                SequenceVariantUpdate::rejected(key, Arc::clone(variant), prior, updating)
            } else if deleted.intersects(&span) {
                log::warn!(
                    "{}: rejecting {}, {} overlaps an earlier deletion",
                    contig,
                    variant,
                    span
                );
                SequenceVariantUpdate::rejected(key, Arc::clone(variant), prior, updating)
            } else {
                Self::classify(contig, key, variant, prior, updating)
            };

            if update.result.is_applied() && variant.variant_type() == VariantType::Delete {
                deleted.insert(span);
            }

            map.modified = update.post;
            map.size_delta += update.size_delta;
            offset_shift += update.offset_delta;
            if update.result == UpdateResult::DeletedRegion {
                map.deleted_region = true;
            }
            map.updates.insert(key, update);

            if !map.size_consistent() {
                map.valid = false;
                let err = FerroError::invariant(format!(
                    "tracked interval {} has size {}, expected {} + {}",
                    map.modified,
                    map.modified.size(),
                    map.original.size(),
                    map.size_delta
                ));
                diagnostic::report(contig, &err, || {
                    diagnostic::audit_dump(
                        &format!("{} {}", contig, map.original),
                        map.updates.values(),
                    )
                });
                break;
            }
        }

        map
    }

    fn classify(
        contig: &str,
        key: u64,
        variant: &Arc<Variant>,
        prior: Interval,
        updating: Interval,
    ) -> SequenceVariantUpdate {
        let variant_type = variant.variant_type();
        let applied = match variant_type {
            VariantType::Snp => {
                (prior.contains_interval(&updating) && !updating.is_empty()).then(|| {
                    (prior, UpdateResult::Normal, 0, 0)
                })
            }
            VariantType::Insert => {
                let size = updating.size() as i64;
                prior
                    .insert(updating.lower(), updating.size())
                    .map(|post| (post, UpdateResult::Normal, size, size))
            }
            VariantType::Delete => prior.delete(&updating).map(|post| {
                let removed = prior.intersection(&updating).size() as i64;
                let result = if updating.contains_interval(&prior) {
                    UpdateResult::DeletedRegion
                } else if updating.lower() < prior.lower() {
                    UpdateResult::PartialLowDelete
                } else if updating.upper() > prior.upper() {
                    UpdateResult::PartialHighDelete
                } else {
                    UpdateResult::Normal
                };
                (post, result, -removed, -(updating.size() as i64))
            }),
        };

        match applied {
            Some((post, result, size_delta, offset_delta)) => SequenceVariantUpdate {
                key,
                variant: Arc::clone(variant),
                prior,
                post,
                updating,
                result,
                size_delta,
                offset_delta,
            },
            None => {
                log::warn!(
                    "{}: {} {} falls outside tracked interval {}",
                    contig,
                    variant_type,
                    updating,
                    prior
                );
                SequenceVariantUpdate::rejected(key, Arc::clone(variant), prior, updating)
            }
        }
    }

    fn size_consistent(&self) -> bool {
        if self.deleted_region {
            return self.modified.is_empty();
        }
        self.modified.size() as i64 == self.original.size() as i64 + self.size_delta
    }

    /// The interval being tracked
    pub fn original(&self) -> Interval {
        self.original
    }

    /// The tracked interval after all applied updates
    pub fn modified(&self) -> Interval {
        self.modified
    }

    /// Sum of the per-update size deltas
    pub fn size_delta(&self) -> i64 {
        self.size_delta
    }

    /// Updates in key order
    pub fn updates(&self) -> impl Iterator<Item = &SequenceVariantUpdate> {
        self.updates.values()
    }

    pub fn get(&self, key: u64) -> Option<&SequenceVariantUpdate> {
        self.updates.get(&key)
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Number of rejected updates
    pub fn error_count(&self) -> usize {
        self.updates
            .values()
            .filter(|u| u.result == UpdateResult::Error)
            .count()
    }

    /// True if a deletion consumed the whole interval
    pub fn deleted_region(&self) -> bool {
        self.deleted_region
    }

    /// False if the size invariant failed
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::Phase;

    fn selected(calls: &[(u64, &str, &str)]) -> OffsetVariantMap {
        calls
            .iter()
            .map(|&(offset, r, a)| {
                let v = Variant::new("chr1", offset, Phase::A, r, a);
                (v.modify_interval().lower(), Arc::new(v))
            })
            .collect()
    }

    #[test]
    fn test_empty_variant_set() {
        let map = IntervalModifyMap::build("chr1", Interval::new(10, 20), &OffsetVariantMap::new());
        assert!(map.is_valid());
        assert!(map.is_empty());
        assert_eq!(map.modified(), Interval::new(10, 20));
    }

    #[test]
    fn test_snp_normal() {
        let map = IntervalModifyMap::build("chr1", Interval::new(0, 8), &selected(&[(2, "G", "T")]));
        let update = map.get(2).unwrap();
        assert_eq!(update.result, UpdateResult::Normal);
        assert_eq!(update.size_delta, 0);
        assert_eq!(map.modified(), Interval::new(0, 8));
    }

    #[test]
    fn test_insert_grows_upper() {
        let map = IntervalModifyMap::build("chr1", Interval::new(0, 8), &selected(&[(3, "T", "TTT")]));
        let update = map.get(4).unwrap();
        assert_eq!(update.result, UpdateResult::Normal);
        assert_eq!(update.size_delta, 2);
        assert_eq!(map.modified(), Interval::new(0, 10));
    }

    #[test]
    fn test_delete_inside() {
        let map = IntervalModifyMap::build("chr1", Interval::new(0, 8), &selected(&[(1, "CGT", "C")]));
        let update = map.get(2).unwrap();
        assert_eq!(update.result, UpdateResult::Normal);
        assert_eq!(update.size_delta, -2);
        assert_eq!(map.modified(), Interval::new(0, 6));
        assert_eq!(map.size_delta(), -2);
    }

    #[test]
    fn test_deleted_region() {
        let reference = "A".to_string() + &"C".repeat(20);
        let map = IntervalModifyMap::build(
            "chr1",
            Interval::new(10, 20),
            &selected(&[(4, reference.as_str(), "A")]),
        );
        let update = map.get(5).unwrap();
        assert_eq!(update.result, UpdateResult::DeletedRegion);
        assert!(map.deleted_region());
        assert!(map.is_valid());
        assert!(map.modified().is_empty());
        assert_eq!(map.modified().lower(), 5);
    }

    #[test]
    fn test_partial_low_delete() {
        // Deletes [5, 12) from [10, 20)
        let reference = "A".to_string() + &"C".repeat(7);
        let map = IntervalModifyMap::build(
            "chr1",
            Interval::new(10, 20),
            &selected(&[(4, reference.as_str(), "A"), (15, "G", "T")]),
        );
        let delete = map.get(5).unwrap();
        assert_eq!(delete.result, UpdateResult::PartialLowDelete);
        assert_eq!(delete.size_delta, -2);
        assert_eq!(delete.offset_delta, -7);

        // SNP rebased by the full deletion size
        let snp = map.get(15).unwrap();
        assert_eq!(snp.updating, Interval::new(8, 9));
        assert_eq!(snp.result, UpdateResult::Normal);
        assert_eq!(map.modified().size(), 8);
    }

    #[test]
    fn test_partial_high_delete() {
        // Deletes [15, 25) from [10, 20)
        let reference = "A".to_string() + &"C".repeat(10);
        let map = IntervalModifyMap::build(
            "chr1",
            Interval::new(10, 20),
            &selected(&[(14, reference.as_str(), "A")]),
        );
        let update = map.get(15).unwrap();
        assert_eq!(update.result, UpdateResult::PartialHighDelete);
        assert_eq!(map.modified(), Interval::new(10, 15));
    }

    #[test]
    fn test_insert_outside_rejected() {
        let map = IntervalModifyMap::build("chr1", Interval::new(10, 20), &selected(&[(25, "A", "AT")]));
        let update = map.get(26).unwrap();
        assert_eq!(update.result, UpdateResult::Error);
        assert_eq!(update.size_delta, 0);
        assert_eq!(map.error_count(), 1);
        assert!(map.is_valid());
        assert_eq!(map.modified(), Interval::new(10, 20));
    }

    #[test]
    fn test_indels_compose() {
        // Insert 3 at 12, delete 2 at 15, SNP at 18
        let map = IntervalModifyMap::build(
            "chr1",
            Interval::new(10, 20),
            &selected(&[(11, "A", "ATTT"), (14, "ACC", "A"), (18, "G", "C")]),
        );
        assert_eq!(map.get(15).unwrap().updating, Interval::new(18, 20));
        assert_eq!(map.get(18).unwrap().updating, Interval::new(19, 20));
        assert_eq!(map.modified(), Interval::new(10, 21));
        assert_eq!(map.size_delta(), 1);
        assert_eq!(map.error_count(), 0);
    }

    #[test]
    fn test_updates_after_deleted_region_rejected() {
        let reference = "A".to_string() + &"C".repeat(20);
        let mut variants = selected(&[(4, reference.as_str(), "A")]);
        let late = Variant::new("chr1", 30, Phase::A, "A", "G");
        variants.insert(30, Arc::new(late));
        let map = IntervalModifyMap::build("chr1", Interval::new(10, 20), &variants);
        assert_eq!(map.get(30).unwrap().result, UpdateResult::Error);
    }

    #[test]
    fn test_delete_inside_earlier_delete_rejected() {
        // [5, 10) then [8, 12) from opposite phases, SNP at 30
        let mut variants = selected(&[(4, "ACAGAT", "A"), (30, "C", "G")]);
        variants.insert(8, Arc::new(Variant::new("chr1", 7, Phase::B, "GATTA", "G")));
        let map = IntervalModifyMap::build("chr1", Interval::new(0, 40), &variants);

        let second = map.get(8).unwrap();
        assert_eq!(second.result, UpdateResult::Error);
        assert_eq!(second.size_delta, 0);
        assert_eq!(second.offset_delta, 0);
        assert_eq!(map.get(30).unwrap().result, UpdateResult::Normal);
        assert_eq!(map.get(30).unwrap().updating, Interval::new(25, 26));
        assert_eq!(map.modified(), Interval::new(0, 35));
        assert!(map.is_valid());
    }

    #[test]
    fn test_delete_adjacent_to_earlier_delete_applied() {
        let map = IntervalModifyMap::build(
            "chr1",
            Interval::new(0, 20),
            &selected(&[(4, "ACAGAT", "A"), (9, "TAC", "T")]),
        );
        assert_eq!(map.error_count(), 0);
        assert_eq!(map.modified(), Interval::new(0, 13));
    }

    #[test]
    fn test_update_display() {
        let map = IntervalModifyMap::build("chr1", Interval::new(0, 8), &selected(&[(2, "G", "T")]));
        let line = map.get(2).unwrap().to_string();
        assert!(line.contains("NORMAL"));
        assert!(line.contains("prior=[0, 8)"));
    }
}
