//! Offset-indexed variant stores
//!
//! Variants are organised as population → genome → contig → offset. Each
//! level supports two kinds of filtering:
//!
//! - `view_filter` returns a new store that shares the underlying
//!   [`Variant`]s (cheap: only `Arc`s are cloned)
//! - `self_filter` removes rejected variants in place
//!
//! A population file is a JSON array of [`VariantRecord`]s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::FerroError;
use crate::interval::Interval;

use super::{Phase, Variant, VariantFilter};

/// A variant as it appears in a population JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Genome (sample) the call belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genome: Option<String>,
    pub contig: String,
    /// Zero-based contig offset of the first reference base
    pub offset: u64,
    #[serde(default)]
    pub phase: Phase,
    pub reference: String,
    pub alternate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub info: BTreeMap<String, String>,
}

/// Variants on one contig, indexed by offset
///
/// Several calls may share an offset (both halves of a homozygous call, or
/// competing heterozygous calls).
#[derive(Debug, Clone, Default)]
pub struct ContigVariants {
    contig: String,
    variants: BTreeMap<u64, Vec<Arc<Variant>>>,
}

impl ContigVariants {
    pub fn new(contig: impl Into<String>) -> Self {
        Self {
            contig: contig.into(),
            variants: BTreeMap::new(),
        }
    }

    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// Add a variant
    ///
    /// Fails if the variant belongs to another contig.
    pub fn add(&mut self, variant: Arc<Variant>) -> Result<(), FerroError> {
        if variant.contig() != self.contig {
            return Err(FerroError::InvalidCoordinates {
                msg: format!(
                    "variant {} added to contig store '{}'",
                    variant, self.contig
                ),
            });
        }
        self.variants
            .entry(variant.offset())
            .or_default()
            .push(variant);
        Ok(())
    }

    /// Total number of calls
    pub fn len(&self) -> usize {
        self.variants.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Calls at exactly `offset`
    pub fn calls_at(&self, offset: u64) -> &[Arc<Variant>] {
        self.variants
            .get(&offset)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All calls in offset order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Variant>> {
        self.variants.values().flatten()
    }

    /// Calls whose offset lies in `interval`, in offset order
    pub fn region(&self, interval: Interval) -> impl Iterator<Item = &Arc<Variant>> {
        self.variants
            .range(interval.lower()..interval.upper())
            .flat_map(|(_, calls)| calls.iter())
    }

    /// Shallow copy holding only the calls accepted by `filter`
    pub fn view_filter(&self, genome: &str, filter: &VariantFilter) -> ContigVariants {
        let mut view = ContigVariants::new(self.contig.clone());
        for (&offset, calls) in &self.variants {
            let kept: Vec<Arc<Variant>> = calls
                .iter()
                .filter(|v| filter.matches(genome, v))
                .cloned()
                .collect();
            if !kept.is_empty() {
                view.variants.insert(offset, kept);
            }
        }
        view
    }

    /// Remove calls rejected by `filter`
    pub fn self_filter(&mut self, genome: &str, filter: &VariantFilter) {
        for calls in self.variants.values_mut() {
            calls.retain(|v| filter.matches(genome, v));
        }
        self.variants.retain(|_, calls| !calls.is_empty());
    }
}

/// All contigs of one genome
#[derive(Debug, Clone, Default)]
pub struct GenomeVariants {
    genome: String,
    contigs: BTreeMap<String, ContigVariants>,
}

impl GenomeVariants {
    pub fn new(genome: impl Into<String>) -> Self {
        Self {
            genome: genome.into(),
            contigs: BTreeMap::new(),
        }
    }

    pub fn genome(&self) -> &str {
        &self.genome
    }

    /// Add a variant to its contig, creating the contig store as needed
    pub fn add(&mut self, variant: Arc<Variant>) -> Result<(), FerroError> {
        self.contigs
            .entry(variant.contig().to_string())
            .or_insert_with(|| ContigVariants::new(variant.contig()))
            .add(variant)
    }

    pub fn contig(&self, contig: &str) -> Option<&ContigVariants> {
        self.contigs.get(contig)
    }

    pub fn contigs(&self) -> impl Iterator<Item = &ContigVariants> {
        self.contigs.values()
    }

    /// Total number of calls across contigs
    pub fn len(&self) -> usize {
        self.contigs.values().map(ContigVariants::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.contigs.values().all(ContigVariants::is_empty)
    }

    pub fn view_filter(&self, filter: &VariantFilter) -> GenomeVariants {
        let contigs = self
            .contigs
            .iter()
            .map(|(name, contig)| (name.clone(), contig.view_filter(&self.genome, filter)))
            .filter(|(_, contig)| !contig.is_empty())
            .collect();
        GenomeVariants {
            genome: self.genome.clone(),
            contigs,
        }
    }

    pub fn self_filter(&mut self, filter: &VariantFilter) {
        for contig in self.contigs.values_mut() {
            contig.self_filter(&self.genome, filter);
        }
        self.contigs.retain(|_, contig| !contig.is_empty());
    }
}

/// A population of genomes, ordered by genome id
#[derive(Debug, Clone, Default)]
pub struct PopulationVariants {
    name: String,
    genomes: BTreeMap<String, GenomeVariants>,
}

impl PopulationVariants {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            genomes: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a variant to a genome, creating the genome as needed
    pub fn add(&mut self, genome: &str, variant: Variant) -> Result<(), FerroError> {
        self.genomes
            .entry(genome.to_string())
            .or_insert_with(|| GenomeVariants::new(genome))
            .add(Arc::new(variant))
    }

    /// Register a genome with no variants (it still takes part in mutation)
    pub fn add_genome(&mut self, genome: &str) {
        self.genomes
            .entry(genome.to_string())
            .or_insert_with(|| GenomeVariants::new(genome));
    }

    pub fn genome(&self, genome: &str) -> Option<&GenomeVariants> {
        self.genomes.get(genome)
    }

    pub fn genomes(&self) -> impl Iterator<Item = &GenomeVariants> {
        self.genomes.values()
    }

    /// Number of genomes
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    /// Total number of calls across genomes
    pub fn variant_count(&self) -> usize {
        self.genomes.values().map(GenomeVariants::len).sum()
    }

    /// Shallow filtered view; genomes are kept even if all their calls are removed
    pub fn view_filter(&self, filter: &VariantFilter) -> PopulationVariants {
        PopulationVariants {
            name: self.name.clone(),
            genomes: self
                .genomes
                .iter()
                .map(|(id, genome)| (id.clone(), genome.view_filter(filter)))
                .collect(),
        }
    }

    pub fn self_filter(&mut self, filter: &VariantFilter) {
        for genome in self.genomes.values_mut() {
            genome.self_filter(filter);
        }
    }

    /// Build a population from records; records without a genome go to `default_genome`
    pub fn from_records(
        name: impl Into<String>,
        records: Vec<VariantRecord>,
        default_genome: &str,
    ) -> Result<Self, FerroError> {
        let mut population = PopulationVariants::new(name);
        for record in records {
            let genome = record
                .genome
                .clone()
                .unwrap_or_else(|| default_genome.to_string());
            population.add(&genome, Variant::try_from(record)?)?;
        }
        Ok(population)
    }

    /// Parse a JSON array of [`VariantRecord`]s
    pub fn from_json_str(name: impl Into<String>, json: &str) -> Result<Self, FerroError> {
        let records: Vec<VariantRecord> = serde_json::from_str(json)?;
        Self::from_records(name, records, "default")
    }

    /// Load a JSON array of [`VariantRecord`]s from a file
    pub fn from_json(path: &Path) -> Result<Self, FerroError> {
        let content = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_json_str(name, &content)
    }
}
