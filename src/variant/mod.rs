//! Variant model and canonicalization
//!
//! A [`Variant`] is a single call against a contig: an offset, a reference
//! allele and an alternate allele. Variants are immutable once built; the
//! selection pipeline works on canonical clones produced on demand.
//!
//! # Canonical form
//!
//! | Type | Reference | Alternate |
//! |------|-----------|-----------|
//! | SNP | 1 base | 1 base |
//! | INSERT | 1 anchor base | anchor + inserted bases |
//! | DELETE | anchor + deleted bases | 1 anchor base |
//!
//! Indels keep one leading anchor base shared by both alleles, so the bases
//! actually inserted or deleted start at `offset + 1`.
//!
//! # Examples
//!
//! ```
//! use ferro_mutate::variant::{Phase, Variant, VariantType};
//!
//! // A padded deletion as an upstream caller might emit it
//! let v = Variant::new("chr1", 100, Phase::Unphased, "CAGTT", "CAT");
//! assert_eq!(v.variant_type(), VariantType::Delete);
//!
//! let canonical = v.canonical_clone();
//! assert_eq!(canonical.offset(), 101);
//! assert_eq!(canonical.reference(), "AGT");
//! assert_eq!(canonical.alternate(), "A");
//! assert!(canonical.is_canonical());
//! ```

pub mod filter;
pub mod select;
pub mod store;

pub use filter::VariantFilter;
pub use select::{AmbiguityPolicy, OffsetVariantMap, SelectedVariants, SelectionStats, VariantSelector};
pub use store::{ContigVariants, GenomeVariants, PopulationVariants, VariantRecord};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::FerroError;
use crate::interval::Interval;

/// Upper-case IUPAC nucleotide codes accepted in alleles
const IUPAC_BASES: &[u8] = b"ACGTUNRYSWKMBDHV";

/// Haplotype phase of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Phase unknown, or a haploid call
    #[default]
    Unphased,
    /// First haplotype
    A,
    /// Second haplotype
    B,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Unphased => write!(f, "unphased"),
            Phase::A => write!(f, "A"),
            Phase::B => write!(f, "B"),
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unphased" | "." | "" => Ok(Phase::Unphased),
            "a" | "0" => Ok(Phase::A),
            "b" | "1" => Ok(Phase::B),
            _ => Err(format!("Invalid phase: {}", s)),
        }
    }
}

/// Classification of a variant by its allele lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariantType {
    /// Single-nucleotide substitution
    Snp,
    /// Net gain of bases
    Insert,
    /// Net loss of bases
    Delete,
}

impl VariantType {
    /// True for inserts and deletes
    pub fn is_indel(&self) -> bool {
        !matches!(self, VariantType::Snp)
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantType::Snp => write!(f, "SNP"),
            VariantType::Insert => write!(f, "INSERT"),
            VariantType::Delete => write!(f, "DELETE"),
        }
    }
}

/// Reference and alternate alleles reduced to canonical form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSequences {
    /// Canonical reference allele
    pub reference: String,
    /// Canonical alternate allele
    pub alternate: String,
    /// Contig offset of the first canonical reference base
    pub offset: u64,
}

/// A single variant call against a contig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VariantRecord")]
pub struct Variant {
    contig: String,
    offset: u64,
    phase: Phase,
    reference: String,
    alternate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    info: BTreeMap<String, String>,
}

impl Variant {
    /// Create a new variant
    ///
    /// Alleles are stored upper-cased.
    pub fn new(
        contig: impl Into<String>,
        offset: u64,
        phase: Phase,
        reference: impl Into<String>,
        alternate: impl Into<String>,
    ) -> Self {
        Self {
            contig: contig.into(),
            offset,
            phase,
            reference: reference.into().to_ascii_uppercase(),
            alternate: alternate.into().to_ascii_uppercase(),
            id: None,
            info: BTreeMap::new(),
        }
    }

    /// Attach an identifier (e.g. an rsID)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach an INFO attribute
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    pub fn contig(&self) -> &str {
        &self.contig
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn alternate(&self) -> &str {
        &self.alternate
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn info(&self) -> &BTreeMap<String, String> {
        &self.info
    }

    /// Raw value of an INFO attribute
    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.info.get(key).map(String::as_str)
    }

    /// Population frequency read from an INFO attribute (usually "AF")
    ///
    /// Multi-valued attributes use their first value.
    pub fn frequency(&self, key: &str) -> Option<f64> {
        self.info_value(key)?
            .split(',')
            .next()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|f| f.is_finite())
    }

    /// True if both alleles are spelled in IUPAC nucleotide codes
    pub fn has_nucleotide_alleles(&self) -> bool {
        is_nucleotides(&self.reference) && is_nucleotides(&self.alternate)
    }

    /// Reject alleles outside the IUPAC nucleotide alphabet
    pub fn check_alleles(&self) -> Result<(), FerroError> {
        if self.has_nucleotide_alleles() {
            return Ok(());
        }
        Err(FerroError::InvalidCoordinates {
            msg: format!(
                "{}:{} has non-nucleotide alleles {:?}>{:?}",
                self.contig, self.offset, self.reference, self.alternate
            ),
        })
    }

    /// True if the alleles have equal length and differ at exactly one base
    pub fn is_snp(&self) -> bool {
        self.reference.len() == self.alternate.len()
            && self
                .reference
                .bytes()
                .zip(self.alternate.bytes())
                .filter(|(r, a)| r != a)
                .count()
                == 1
    }

    /// Classify the variant
    pub fn variant_type(&self) -> VariantType {
        if self.is_snp() {
            VariantType::Snp
        } else if self.reference.len() < self.alternate.len() {
            VariantType::Insert
        } else {
            VariantType::Delete
        }
    }

    /// Number of bases inserted (INSERT) or deleted (DELETE); zero for SNPs
    pub fn indel_size(&self) -> u64 {
        match self.variant_type() {
            VariantType::Snp => 0,
            VariantType::Insert => (self.alternate.len() - self.reference.len()) as u64,
            VariantType::Delete => (self.reference.len() - self.alternate.len()) as u64,
        }
    }

    /// Signed change in sequence length when the variant is applied
    pub fn size_delta(&self) -> i64 {
        match self.variant_type() {
            VariantType::Snp => 0,
            VariantType::Insert => self.indel_size() as i64,
            VariantType::Delete => -(self.indel_size() as i64),
        }
    }

    /// True if the variant is in minimal anchored form
    ///
    /// Indels must also share their anchor base between alleles.
    pub fn is_canonical(&self) -> bool {
        let ref_len = self.reference.len();
        let alt_len = self.alternate.len();
        match self.variant_type() {
            VariantType::Snp => ref_len == 1 && alt_len == 1,
            VariantType::Delete => {
                alt_len == 1 && ref_len > 1 && self.reference.as_bytes()[0] == self.alternate.as_bytes()[0]
            }
            VariantType::Insert => {
                ref_len == 1 && alt_len > 1 && self.reference.as_bytes()[0] == self.alternate.as_bytes()[0]
            }
        }
    }

    /// Reduce the alleles to canonical form
    ///
    /// Equal-length substitutions lose their whole common prefix and suffix.
    /// Indels keep the last common prefix base as anchor, and lose a common
    /// suffix bounded so that the shorter allele keeps at least one base.
    /// Alleles that cannot be reduced (identical, empty or not nucleotides)
    /// are returned as-is.
    pub fn canonical_sequences(&self) -> CanonicalSequences {
        let r = self.reference.as_bytes();
        let a = self.alternate.as_bytes();

        if r == a || r.is_empty() || a.is_empty() || !self.has_nucleotide_alleles() {
            return CanonicalSequences {
                reference: self.reference.clone(),
                alternate: self.alternate.clone(),
                offset: self.offset,
            };
        }

        let min_len = r.len().min(a.len());
        let prefix = r.iter().zip(a.iter()).take_while(|(x, y)| x == y).count();

        let (front, suffix_bound) = if r.len() == a.len() {
            (prefix, min_len - prefix)
        } else {
            let front = prefix.saturating_sub(1);
            (front, min_len - front - 1)
        };

        let suffix = r
            .iter()
            .rev()
            .zip(a.iter().rev())
            .take(suffix_bound)
            .take_while(|(x, y)| x == y)
            .count();

        CanonicalSequences {
            reference: self.reference[front..r.len() - suffix].to_string(),
            alternate: self.alternate[front..a.len() - suffix].to_string(),
            offset: self.offset + front as u64,
        }
    }

    /// Clone of this variant with canonical alleles and offset
    pub fn canonical_clone(&self) -> Variant {
        let canonical = self.canonical_sequences();
        Variant {
            contig: self.contig.clone(),
            offset: canonical.offset,
            phase: self.phase,
            reference: canonical.reference,
            alternate: canonical.alternate,
            id: self.id.clone(),
            info: self.info.clone(),
        }
    }

    /// The contig interval whose bases the variant replaces, inserts or removes
    ///
    /// SNP: `[offset, offset + 1)`; INSERT: the empty-anchored span of inserted
    /// bases starting after the reference allele; DELETE: the deleted bases
    /// following the alternate allele.
    pub fn modify_interval(&self) -> Interval {
        let size = self.indel_size();
        match self.variant_type() {
            VariantType::Snp => Interval::with_size(self.offset, 1),
            VariantType::Insert => {
                Interval::with_size(self.offset + self.reference.len() as u64, size)
            }
            VariantType::Delete => {
                Interval::with_size(self.offset + self.alternate.len() as u64, size)
            }
        }
    }

    /// The interval used for region membership tests
    ///
    /// Inserts are widened to `[lower - 1, lower + 1)` so that an insertion
    /// point sitting on a region boundary counts as modifying that region.
    pub fn member_interval(&self) -> Interval {
        let modify = self.modify_interval();
        match self.variant_type() {
            VariantType::Insert => {
                Interval::new(modify.lower().saturating_sub(1), modify.lower() + 1)
            }
            _ => modify,
        }
    }

    /// True if both calls describe the same change at the same offset
    ///
    /// Phase and annotations are ignored, so the two halves of a homozygous
    /// call compare equal.
    pub fn same_call(&self, other: &Variant) -> bool {
        self.contig == other.contig
            && self.offset == other.offset
            && self.reference == other.reference
            && self.alternate == other.alternate
    }
}

impl TryFrom<VariantRecord> for Variant {
    type Error = FerroError;

    fn try_from(record: VariantRecord) -> Result<Self, Self::Error> {
        let mut variant = Variant::new(
            record.contig,
            record.offset,
            record.phase,
            record.reference,
            record.alternate,
        );
        variant.id = record.id;
        variant.info = record.info;
        variant.check_alleles()?;
        Ok(variant)
    }
}

fn is_nucleotides(allele: &str) -> bool {
    allele.bytes().all(|b| IUPAC_BASES.contains(&b))
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {}>{} ({}, {})",
            self.contig,
            self.offset,
            self.reference,
            self.alternate,
            self.variant_type(),
            self.phase
        )
    }
}
