//! Per-region variant selection
//!
//! [`VariantSelector::select`] turns the raw calls stored for a contig into
//! an [`OffsetVariantMap`] that the mutation engine can apply in a single
//! forward pass. The pipeline runs in this order:
//!
//! 1. scan calls from `margin` bases upstream of the target, so deletions
//!    that start before the target but reach into it are seen
//! 2. canonicalize each call; calls that do not reduce to SNP, INSERT or
//!    DELETE form are dropped
//! 3. keep calls whose member interval intersects the target
//! 4. collapse identical calls at one offset (both halves of a homozygous
//!    call) into one
//! 5. pick one call per offset using the [`AmbiguityPolicy`]
//! 6. drop calls that lie entirely inside an accepted upstream deletion
//! 7. re-key survivors at the first base they modify: SNPs at their own
//!    offset, indels one past the anchor
//!
//! The result map holds at most one canonical variant per key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::MutateConfig;
use crate::interval::{Interval, IntervalSet};

use super::{ContigVariants, Variant, VariantType};

/// Bases scanned upstream of the target to catch overlapping deletions
pub const UPSTREAM_MARGIN: u64 = 200;

/// Selected variants keyed by the first contig offset they modify
pub type OffsetVariantMap = BTreeMap<u64, Arc<Variant>>;

/// How to choose among distinct calls sharing one offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// The first call seen, in store order
    First,
    /// The call with the highest frequency attribute; missing counts as lowest
    Frequency,
    /// A homozygous call if there is one, otherwise by frequency
    #[default]
    Homozygous,
}

impl fmt::Display for AmbiguityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmbiguityPolicy::First => write!(f, "first"),
            AmbiguityPolicy::Frequency => write!(f, "frequency"),
            AmbiguityPolicy::Homozygous => write!(f, "homozygous"),
        }
    }
}

impl FromStr for AmbiguityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(AmbiguityPolicy::First),
            "frequency" | "af" => Ok(AmbiguityPolicy::Frequency),
            "homozygous" => Ok(AmbiguityPolicy::Homozygous),
            _ => Err(format!(
                "Invalid ambiguity policy: {}. Use 'first', 'frequency' or 'homozygous'",
                s
            )),
        }
    }
}

/// Counters reported by one selection run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionStats {
    /// Calls read from the store, including the upstream margin
    pub scanned: usize,
    /// Calls that did not reduce to a canonical form
    pub non_canonical: usize,
    /// Calls whose member interval missed the target
    pub outside_target: usize,
    /// Identical calls collapsed into one
    pub duplicates: usize,
    /// Distinct calls discarded by the ambiguity policy
    pub ambiguous: usize,
    /// Calls inside an accepted upstream deletion
    pub upstream_deleted: usize,
    /// Calls dropped because another variant already held their key
    pub key_collisions: usize,
    /// Variants in the final map
    pub selected: usize,
}

impl SelectionStats {
    /// Accumulate another run's counters
    pub fn merge(&mut self, other: &SelectionStats) {
        self.scanned += other.scanned;
        self.non_canonical += other.non_canonical;
        self.outside_target += other.outside_target;
        self.duplicates += other.duplicates;
        self.ambiguous += other.ambiguous;
        self.upstream_deleted += other.upstream_deleted;
        self.key_collisions += other.key_collisions;
        self.selected += other.selected;
    }
}

/// Output of [`VariantSelector::select`]
#[derive(Debug, Clone, Default)]
pub struct SelectedVariants {
    pub variants: OffsetVariantMap,
    pub stats: SelectionStats,
}

/// A distinct call at one canonical offset and how many times it was seen
struct Candidate {
    variant: Arc<Variant>,
    count: usize,
}

/// Configurable selection pipeline
#[derive(Debug, Clone)]
pub struct VariantSelector {
    margin: u64,
    policy: AmbiguityPolicy,
    frequency_key: String,
}

impl Default for VariantSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl VariantSelector {
    pub fn new() -> Self {
        Self {
            margin: UPSTREAM_MARGIN,
            policy: AmbiguityPolicy::default(),
            frequency_key: "AF".to_string(),
        }
    }

    pub fn from_config(config: &MutateConfig) -> Self {
        Self {
            margin: config.upstream_margin,
            policy: config.ambiguity_policy,
            frequency_key: config.frequency_key.clone(),
        }
    }

    pub fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_margin(mut self, margin: u64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_frequency_key(mut self, key: impl Into<String>) -> Self {
        self.frequency_key = key.into();
        self
    }

    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    pub fn margin(&self) -> u64 {
        self.margin
    }

    /// Select the variants of `store` that modify `target`
    pub fn select(&self, store: &ContigVariants, target: Interval) -> SelectedVariants {
        let mut stats = SelectionStats::default();
        let window = Interval::new(target.lower().saturating_sub(self.margin), target.upper());

        // canonical offset -> distinct calls in first-seen order
        let mut groups: BTreeMap<u64, Vec<Candidate>> = BTreeMap::new();

        for raw in store.region(window) {
            stats.scanned += 1;

            if !raw.has_nucleotide_alleles() {
                log::warn!("Dropping call with non-nucleotide alleles {}", raw);
                stats.non_canonical += 1;
                continue;
            }

            let variant = if raw.is_canonical() {
                Arc::clone(raw)
            } else {
                Arc::new(raw.canonical_clone())
            };
            if !variant.is_canonical() {
                log::warn!("Dropping non-canonical call {}", raw);
                stats.non_canonical += 1;
                continue;
            }

            if variant.member_interval().disjoint(&target) {
                stats.outside_target += 1;
                continue;
            }

            let group = groups.entry(variant.offset()).or_default();
            match group.iter_mut().find(|c| c.variant.same_call(&variant)) {
                Some(existing) => {
                    existing.count += 1;
                    stats.duplicates += 1;
                }
                None => group.push(Candidate { variant, count: 1 }),
            }
        }

        let mut accepted_deletes = IntervalSet::new();
        let mut variants = OffsetVariantMap::new();

        for (offset, candidates) in groups {
            if candidates.len() > 1 {
                log::debug!(
                    "{} distinct calls at {}:{}, resolving by {} policy",
                    candidates.len(),
                    store.contig(),
                    offset,
                    self.policy
                );
                stats.ambiguous += candidates.len() - 1;
            }
            let Some(chosen) = self.choose(candidates) else {
                continue;
            };

            let member = chosen.member_interval();
            if accepted_deletes.contains_interval(&member) {
                log::debug!("Call {} lies inside an upstream deletion", chosen);
                stats.upstream_deleted += 1;
                continue;
            }

            let key = chosen.modify_interval().lower();
            if let Some(holder) = variants.get(&key) {
                log::warn!(
                    "Call {} collides with {} at key {}; keeping the first",
                    chosen,
                    holder,
                    key
                );
                stats.key_collisions += 1;
                continue;
            }

            if chosen.variant_type() == VariantType::Delete {
                accepted_deletes.insert(chosen.modify_interval());
            }
            variants.insert(key, chosen);
        }

        stats.selected = variants.len();
        SelectedVariants { variants, stats }
    }

    /// Apply the ambiguity policy to the distinct calls at one offset
    fn choose(&self, candidates: Vec<Candidate>) -> Option<Arc<Variant>> {
        if candidates.len() <= 1 {
            return candidates.into_iter().next().map(|c| c.variant);
        }
        let chosen = match self.policy {
            AmbiguityPolicy::First => candidates.into_iter().next(),
            AmbiguityPolicy::Frequency => self.highest_frequency(candidates),
            AmbiguityPolicy::Homozygous => {
                if let Some(index) = candidates.iter().position(|c| c.count > 1) {
                    candidates.into_iter().nth(index)
                } else {
                    self.highest_frequency(candidates)
                }
            }
        };
        chosen.map(|c| c.variant)
    }

    /// Highest frequency wins; ties and missing values fall back to first seen
    fn highest_frequency(&self, candidates: Vec<Candidate>) -> Option<Candidate> {
        let mut best: Option<(f64, Candidate)> = None;
        for candidate in candidates {
            let freq = candidate
                .variant
                .frequency(&self.frequency_key)
                .unwrap_or(f64::NEG_INFINITY);
            match &best {
                Some((best_freq, _)) if freq <= *best_freq => {}
                _ => best = Some((freq, candidate)),
            }
        }
        best.map(|(_, c)| c)
    }
}
