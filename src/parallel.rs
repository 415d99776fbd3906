//! Population-wide mutation on a worker pool
//!
//! [`mutate_population`] applies every genome's calls to one region of the
//! reference, one task per genome, on a bounded rayon pool. Tasks share the
//! reference bases and the population read-only; each builds its own
//! [`AdjustedSequence`](crate::mutate::AdjustedSequence) and hands the
//! result to a single mutex-guarded collector. Results are keyed by genome
//! id, so the merged output does not depend on completion order.
//!
//! A genome whose sequence fails to build is logged and recorded as a
//! failure; the rest of the population is unaffected.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "parallel")]
//! # fn main() -> Result<(), ferro_mutate::FerroError> {
//! use ferro_mutate::config::MutateConfig;
//! use ferro_mutate::interval::Interval;
//! use ferro_mutate::parallel::{mutate_population, MutationRequest};
//! use ferro_mutate::reference::MockProvider;
//! use ferro_mutate::variant::PopulationVariants;
//!
//! let provider = MockProvider::with_test_data();
//! let population = PopulationVariants::from_json(std::path::Path::new("cohort.json"))?;
//! let request = MutationRequest::new("chr1", Interval::new(0, 8));
//! let run = mutate_population(&provider, &population, &request, &MutateConfig::default())?;
//! println!("{} genomes mutated", run.stats.succeeded);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "parallel"))]
//! # fn main() {}
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::config::MutateConfig;
use crate::error::FerroError;
use crate::interval::Interval;
use crate::mutate::{apply_to_reference, coding_sequence, SequenceSource};
use crate::reference::{ReferenceProvider, Strand};
use crate::variant::{ContigVariants, GenomeVariants, PopulationVariants, SelectionStats};

/// Worker count for `workload` tasks: no more workers than tasks or cores
pub fn default_threads(workload: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    workload.min(cores).max(1)
}

/// The region (and optional exon set) to mutate in every genome
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub contig: String,
    pub interval: Interval,
    /// Exons to concatenate into a coding sequence; empty for none
    pub exons: Vec<Interval>,
    pub strand: Strand,
}

impl MutationRequest {
    pub fn new(contig: impl Into<String>, interval: Interval) -> Self {
        Self {
            contig: contig.into(),
            interval,
            exons: Vec::new(),
            strand: Strand::Plus,
        }
    }

    pub fn with_exons(mut self, exons: Vec<Interval>, strand: Strand) -> Self {
        self.exons = exons;
        self.strand = strand;
        self
    }
}

/// Output for one genome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenomeMutation {
    pub genome: String,
    /// Mutated bases over the requested region
    pub modified: String,
    /// Strand-oriented exon concatenation, when exons were requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coding: Option<String>,
    /// Updates applied to the sequence
    pub applied: usize,
    pub stats: SelectionStats,
}

/// Totals for one population run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopulationStats {
    pub genomes: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub selection: SelectionStats,
}

impl PopulationStats {
    pub fn merge(&mut self, other: &PopulationStats) {
        self.genomes += other.genomes;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.selection.merge(&other.selection);
    }
}

/// Merged output of [`mutate_population`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct PopulationMutation {
    pub results: BTreeMap<String, GenomeMutation>,
    /// Genome id -> reason it produced no result
    pub failures: BTreeMap<String, String>,
    pub stats: PopulationStats,
}

impl PopulationMutation {
    fn record(&mut self, genome: &str, outcome: Result<GenomeMutation, (FerroError, SelectionStats)>) {
        self.stats.genomes += 1;
        match outcome {
            Ok(result) => {
                self.stats.succeeded += 1;
                self.stats.selection.merge(&result.stats);
                self.results.insert(genome.to_string(), result);
            }
            Err((err, stats)) => {
                self.stats.failed += 1;
                self.stats.selection.merge(&stats);
                self.failures.insert(genome.to_string(), err.detailed_message());
            }
        }
    }
}

fn lock(collector: &Mutex<PopulationMutation>) -> MutexGuard<'_, PopulationMutation> {
    match collector.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Mutate one region in every genome of `population`
///
/// Fails only if the reference region cannot be read or the worker pool
/// cannot be built; per-genome problems are reported in the result.
pub fn mutate_population<P>(
    provider: &P,
    population: &PopulationVariants,
    request: &MutationRequest,
    config: &MutateConfig,
) -> Result<PopulationMutation, FerroError>
where
    P: ReferenceProvider + ?Sized,
{
    let reference = provider.sequence(&request.contig, request.interval)?;
    let threads = match config.threads {
        0 => default_threads(population.len()),
        n => n,
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| FerroError::Config {
            msg: format!("failed to build worker pool: {}", e),
        })?;

    log::info!(
        "Mutating {}:{} in {} genomes on {} threads",
        request.contig,
        request.interval,
        population.len(),
        threads
    );

    let collector = Mutex::new(PopulationMutation::default());
    let empty = ContigVariants::new(request.contig.clone());

    pool.scope(|s| {
        for genome in population.genomes() {
            let reference = reference.as_bytes();
            let collector = &collector;
            let empty = &empty;
            s.spawn(move |_| {
                let outcome = mutate_genome(genome, reference, request, config, empty);
                if let Err((err, _)) = &outcome {
                    log::warn!("Genome {} failed: {}", genome.genome(), err);
                }
                lock(collector).record(genome.genome(), outcome);
            });
        }
    });

    let merged = match collector.into_inner() {
        Ok(merged) => merged,
        Err(poisoned) => poisoned.into_inner(),
    };
    Ok(merged)
}

fn mutate_genome(
    genome: &GenomeVariants,
    reference: &[u8],
    request: &MutationRequest,
    config: &MutateConfig,
    empty: &ContigVariants,
) -> Result<GenomeMutation, (FerroError, SelectionStats)> {
    let calls = genome.contig(&request.contig).unwrap_or(empty);
    let region = apply_to_reference(reference, calls, request.interval, config)
        .map_err(|e| (e, SelectionStats::default()))?;
    let stats = region.stats;
    let sequence = region.sequence;

    let modified = sequence
        .modified_sequence()
        .map_err(|e| (e, stats.clone()))?;
    let coding = if request.exons.is_empty() {
        None
    } else {
        Some(
            coding_sequence(&sequence, &request.exons, request.strand, SequenceSource::Modified)
                .map_err(|e| (e, stats.clone()))?,
        )
    };

    Ok(GenomeMutation {
        genome: genome.genome().to_string(),
        modified,
        coding,
        applied: sequence.offset_map().len(),
        stats,
    })
}
