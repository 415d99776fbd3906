//! Variant filters
//!
//! Filters are plain values: a closed set of predicates plus `And`, `Or` and
//! `Not` combinators. Stores apply them either as a shallow view (sharing the
//! underlying variants) or destructively in place.
//!
//! ```
//! use ferro_mutate::interval::Interval;
//! use ferro_mutate::variant::{Phase, Variant, VariantFilter};
//!
//! let filter = VariantFilter::contig("chr1")
//!     .and(VariantFilter::offset(Interval::new(0, 100)))
//!     .and(VariantFilter::snp().not());
//!
//! let del = Variant::new("chr1", 10, Phase::A, "CAT", "C");
//! let snp = Variant::new("chr1", 10, Phase::A, "C", "T");
//! assert!(filter.matches("genome1", &del));
//! assert!(!filter.matches("genome1", &snp));
//! ```

use crate::interval::Interval;

use super::{Phase, Variant, VariantType};

/// A predicate over (genome, variant) pairs
#[derive(Debug, Clone, PartialEq, Default)]
pub enum VariantFilter {
    /// Accept everything
    #[default]
    All,
    /// Variants on the named contig
    Contig(String),
    /// Variants belonging to the named genome
    Genome(String),
    /// Variants whose offset lies in the interval
    Offset(Interval),
    /// Variants with the given phase
    Phase(Phase),
    /// Variants of the given type
    Type(VariantType),
    /// Calls identical to the given variant (phase ignored)
    Call(Box<Variant>),
    /// Variants whose frequency attribute is at least `min`
    MinFrequency { key: String, min: f64 },
    /// Both filters accept
    And(Box<VariantFilter>, Box<VariantFilter>),
    /// Either filter accepts
    Or(Box<VariantFilter>, Box<VariantFilter>),
    /// The inner filter rejects
    Not(Box<VariantFilter>),
}

impl VariantFilter {
    pub fn contig(contig: impl Into<String>) -> Self {
        VariantFilter::Contig(contig.into())
    }

    pub fn genome(genome: impl Into<String>) -> Self {
        VariantFilter::Genome(genome.into())
    }

    pub fn offset(interval: Interval) -> Self {
        VariantFilter::Offset(interval)
    }

    pub fn phase(phase: Phase) -> Self {
        VariantFilter::Phase(phase)
    }

    pub fn snp() -> Self {
        VariantFilter::Type(VariantType::Snp)
    }

    pub fn call(variant: &Variant) -> Self {
        VariantFilter::Call(Box::new(variant.clone()))
    }

    pub fn min_frequency(key: impl Into<String>, min: f64) -> Self {
        VariantFilter::MinFrequency {
            key: key.into(),
            min,
        }
    }

    /// Combine with another filter; both must accept
    pub fn and(self, other: VariantFilter) -> Self {
        VariantFilter::And(Box::new(self), Box::new(other))
    }

    /// Combine with another filter; either may accept
    pub fn or(self, other: VariantFilter) -> Self {
        VariantFilter::Or(Box::new(self), Box::new(other))
    }

    /// Invert this filter
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        VariantFilter::Not(Box::new(self))
    }

    /// Apply the filter to a variant belonging to `genome`
    pub fn matches(&self, genome: &str, variant: &Variant) -> bool {
        match self {
            VariantFilter::All => true,
            VariantFilter::Contig(contig) => variant.contig() == contig,
            VariantFilter::Genome(id) => genome == id,
            VariantFilter::Offset(interval) => interval.contains_offset(variant.offset()),
            VariantFilter::Phase(phase) => variant.phase() == *phase,
            VariantFilter::Type(variant_type) => variant.variant_type() == *variant_type,
            VariantFilter::Call(call) => variant.same_call(call),
            VariantFilter::MinFrequency { key, min } => {
                variant.frequency(key).is_some_and(|f| f >= *min)
            }
            VariantFilter::And(a, b) => a.matches(genome, variant) && b.matches(genome, variant),
            VariantFilter::Or(a, b) => a.matches(genome, variant) || b.matches(genome, variant),
            VariantFilter::Not(inner) => !inner.matches(genome, variant),
        }
    }
}
