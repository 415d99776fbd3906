// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-mutate CLI
//!
//! Command-line interface for applying variant calls to reference regions.

use clap::{Args, Parser, Subcommand};
use ferro_mutate::cli::{parse_interval, parse_intervals, write_canonical, write_region, OutputFormat};
use ferro_mutate::config::MutateConfig;
use ferro_mutate::interval::Interval;
use ferro_mutate::mutate::{coding_sequence, mutate_region, SequenceSource};
use ferro_mutate::reference::{FastaProvider, MockProvider, ReferenceProvider, Strand};
use ferro_mutate::variant::{
    AmbiguityPolicy, ContigVariants, Phase, PopulationVariants, Variant, VariantFilter,
};
use ferro_mutate::FerroError;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "ferro-mutate")]
#[command(author, version, about = "Apply variant calls to reference sequence")]
#[command(
    long_about = "Build per-genome mutated sequence from a reference and a set of variant calls.

Examples:
  ferro-mutate apply --fasta ref.fa --variants calls.json --contig chr1 --region 1000-2000
  ferro-mutate apply --fasta ref.fa --variants calls.json --contig chr1 --region 1000-2000 \\
      --exons 1000-1100,1500-1600 --strand -
  ferro-mutate population --fasta ref.fa --variants cohort.json --contig chr1 --region 1000-2000
  ferro-mutate canonical --contig chr1 --offset 100 CAGTT CAT"
)]
struct Cli {
    /// Log filter (e.g. warn, info, ferro_mutate=debug)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Configuration file (defaults to .ferro-mutate.toml or ~/.config/ferro/mutate.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Reference and variant inputs shared by the mutating subcommands
#[derive(Args)]
struct RegionArgs {
    /// Reference FASTA file (indexed or plain)
    #[arg(long, required_unless_present = "reference_json", conflicts_with = "reference_json")]
    fasta: Option<PathBuf>,

    /// JSON object mapping contig names to sequences
    #[arg(long)]
    reference_json: Option<PathBuf>,

    /// JSON array of variant records
    #[arg(long)]
    variants: PathBuf,

    /// Contig to mutate
    #[arg(long)]
    contig: String,

    /// Zero-based half-open region, e.g. 1000-2000
    #[arg(long, value_parser = parse_interval)]
    region: Interval,

    /// Comma-separated exon intervals to concatenate into a coding sequence
    #[arg(long)]
    exons: Option<String>,

    /// Strand of the exons (+ or -)
    #[arg(long, default_value = "+")]
    strand: Strand,

    /// Only use calls with this phase (A, B or unphased)
    #[arg(long)]
    phase: Option<Phase>,

    /// Only use calls whose frequency attribute is at least this value
    #[arg(long)]
    min_frequency: Option<f64>,

    /// Upstream scan margin (overrides config)
    #[arg(long)]
    margin: Option<u64>,

    /// Ambiguity policy: first, frequency or homozygous (overrides config)
    #[arg(long)]
    policy: Option<AmbiguityPolicy>,

    /// Output format
    #[arg(short = 'f', long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Mutate one region in a single genome
    Apply {
        #[command(flatten)]
        region: RegionArgs,

        /// Genome whose calls are applied (defaults to the only genome in the file)
        #[arg(long)]
        genome: Option<String>,
    },

    /// Mutate one region in every genome of a population
    Population {
        #[command(flatten)]
        region: RegionArgs,

        /// Worker threads (0 = auto; overrides config)
        #[arg(short = 'j', long)]
        threads: Option<usize>,
    },

    /// Show the canonical form of a call
    Canonical {
        /// Reference allele
        reference: String,

        /// Alternate allele
        alternate: String,

        /// Contig name
        #[arg(long, default_value = "chr1")]
        contig: String,

        /// Zero-based offset of the first reference base
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Output format
        #[arg(short = 'f', long, default_value = "text")]
        format: OutputFormat,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let config = load_config(cli.config.as_deref())?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Apply { region, genome } => run_apply(&region, genome.as_deref(), config, &mut out)?,
        Commands::Population { region, threads } => run_population(&region, threads, config, &mut out)?,
        Commands::Canonical {
            reference,
            alternate,
            contig,
            offset,
            format,
        } => {
            let variant = Variant::new(contig, offset, Phase::Unphased, reference, alternate);
            write_canonical(&mut out, &variant, format)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn init_tracing(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{}': {}", level, e))?;

    // Log output goes to stderr so sequence output on stdout stays clean
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    debug!("Tracing initialized with level: {}", level);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<MutateConfig, FerroError> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            MutateConfig::load_from_path(path)
        }
        None => Ok(MutateConfig::load().unwrap_or_default()),
    }
}

fn open_reference(args: &RegionArgs) -> Result<Box<dyn ReferenceProvider>, FerroError> {
    match (&args.fasta, &args.reference_json) {
        (Some(fasta), _) => Ok(Box::new(FastaProvider::new(fasta)?)),
        (None, Some(json)) => Ok(Box::new(MockProvider::from_json(json)?)),
        (None, None) => Err(FerroError::Config {
            msg: "one of --fasta or --reference-json is required".to_string(),
        }),
    }
}

fn apply_overrides(args: &RegionArgs, mut config: MutateConfig) -> MutateConfig {
    if let Some(margin) = args.margin {
        config = config.with_upstream_margin(margin);
    }
    if let Some(policy) = args.policy {
        config = config.with_ambiguity_policy(policy);
    }
    config
}

fn call_filter(args: &RegionArgs, config: &MutateConfig) -> VariantFilter {
    let mut filter = VariantFilter::contig(args.contig.clone());
    if let Some(phase) = args.phase {
        filter = filter.and(VariantFilter::phase(phase));
    }
    if let Some(min) = args.min_frequency {
        filter = filter.and(VariantFilter::min_frequency(config.frequency_key.clone(), min));
    }
    filter
}

fn load_population(args: &RegionArgs, config: &MutateConfig) -> Result<PopulationVariants, FerroError> {
    let mut population = PopulationVariants::from_json(&args.variants)?;
    population.self_filter(&call_filter(args, config));
    info!(
        "Loaded {} calls for {} genomes from {}",
        population.variant_count(),
        population.len(),
        args.variants.display()
    );
    Ok(population)
}

fn run_apply<W: Write>(
    args: &RegionArgs,
    genome: Option<&str>,
    config: MutateConfig,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = apply_overrides(args, config);
    let provider = open_reference(args)?;
    let population = load_population(args, &config)?;

    let genome = match genome {
        Some(name) => population.genome(name).ok_or_else(|| FerroError::Config {
            msg: format!("genome '{}' not found in {}", name, args.variants.display()),
        })?,
        None => {
            let mut genomes = population.genomes();
            match (genomes.next(), genomes.next()) {
                (Some(only), None) => only,
                (None, _) => {
                    return Err(FerroError::Config {
                        msg: format!("no calls in {}", args.variants.display()),
                    }
                    .into())
                }
                (Some(_), Some(_)) => {
                    return Err(FerroError::Config {
                        msg: "file holds several genomes; choose one with --genome".to_string(),
                    }
                    .into())
                }
            }
        }
    };

    let empty = ContigVariants::new(args.contig.clone());
    let calls = genome.contig(&args.contig).unwrap_or(&empty);
    let region = mutate_region(provider.as_ref(), calls, args.region, &config)?;

    let coding = match &args.exons {
        Some(exons) if region.sequence.is_valid() => Some(coding_sequence(
            &region.sequence,
            &parse_intervals(exons)?,
            args.strand,
            SequenceSource::Modified,
        )?),
        _ => None,
    };

    write_region(out, &region, coding.as_deref(), args.format)?;
    Ok(())
}

#[cfg(feature = "parallel")]
fn run_population<W: Write>(
    args: &RegionArgs,
    threads: Option<usize>,
    config: MutateConfig,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    use ferro_mutate::cli::write_population;
    use ferro_mutate::parallel::{mutate_population, MutationRequest};

    let mut config = apply_overrides(args, config);
    if let Some(threads) = threads {
        config = config.with_threads(threads);
    }
    let provider = open_reference(args)?;
    let population = load_population(args, &config)?;

    let mut request = MutationRequest::new(args.contig.clone(), args.region);
    if let Some(exons) = &args.exons {
        request = request.with_exons(parse_intervals(exons)?, args.strand);
    }

    let run = mutate_population(provider.as_ref(), &population, &request, &config)?;
    info!(
        "{} of {} genomes mutated",
        run.stats.succeeded, run.stats.genomes
    );
    write_population(out, &run, args.format)?;
    Ok(())
}

#[cfg(not(feature = "parallel"))]
fn run_population<W: Write>(
    _args: &RegionArgs,
    _threads: Option<usize>,
    _config: MutateConfig,
    _out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("population runs need the 'parallel' feature".into())
}
