//! CLI utilities for ferro-mutate
//!
//! Argument parsing helpers and output writers used by the `ferro-mutate`
//! binary. Writers take any `io::Write` so they can be tested against an
//! in-memory buffer.

use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

use crate::error::FerroError;
use crate::interval::Interval;
use crate::mutate::{MutatedRegion, UpdateResult};
#[cfg(feature = "parallel")]
use crate::parallel::PopulationMutation;
use crate::variant::{SelectionStats, Variant};

/// Output format for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text format (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    /// Parse an output format from a string
    ///
    /// # Examples
    ///
    /// ```
    /// use ferro_mutate::cli::OutputFormat;
    ///
    /// assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    /// assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
    /// assert!("vcf".parse::<OutputFormat>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}. Use 'text' or 'json'", s)),
        }
    }
}

/// Parse a zero-based half-open interval written `start-end` or `start..end`
///
/// # Examples
///
/// ```
/// use ferro_mutate::cli::parse_interval;
/// use ferro_mutate::interval::Interval;
///
/// assert_eq!(parse_interval("100-200").unwrap(), Interval::new(100, 200));
/// assert_eq!(parse_interval("5..9").unwrap(), Interval::new(5, 9));
/// assert!(parse_interval("9-5").is_err());
/// ```
pub fn parse_interval(s: &str) -> Result<Interval, FerroError> {
    let s = s.trim();
    let (start, end) = s
        .split_once("..")
        .or_else(|| s.split_once('-'))
        .ok_or_else(|| FerroError::InvalidCoordinates {
            msg: format!("expected start-end, got '{}'", s),
        })?;
    let parse = |v: &str| {
        v.trim().replace('_', "").parse::<u64>().map_err(|_| FerroError::InvalidCoordinates {
            msg: format!("invalid offset '{}' in '{}'", v, s),
        })
    };
    let (start, end) = (parse(start)?, parse(end)?);
    if end < start {
        return Err(FerroError::InvalidCoordinates {
            msg: format!("interval end {} precedes start {}", end, start),
        });
    }
    Ok(Interval::new(start, end))
}

/// Parse a comma-separated list of intervals
pub fn parse_intervals(s: &str) -> Result<Vec<Interval>, FerroError> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_interval)
        .collect()
}

#[derive(Serialize)]
struct RegionReport<'a> {
    contig: &'a str,
    interval: Interval,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    coding: Option<&'a str>,
    updates: Vec<UpdateReport>,
    stats: &'a SelectionStats,
}

#[derive(Serialize)]
struct UpdateReport {
    key: u64,
    variant: String,
    result: UpdateResult,
    size_delta: i64,
}

/// Write a mutated region
///
/// `coding` is the exon concatenation, when one was requested.
pub fn write_region<W: Write>(
    writer: &mut W,
    region: &MutatedRegion,
    coding: Option<&str>,
    format: OutputFormat,
) -> io::Result<()> {
    let sequence = &region.sequence;
    match format {
        OutputFormat::Text => {
            writeln!(writer, "region\t{}:{}", sequence.contig(), sequence.interval())?;
            match (sequence.original_sequence(), sequence.modified_sequence()) {
                (Ok(original), Ok(modified)) => {
                    writeln!(writer, "original\t{}", original)?;
                    writeln!(writer, "modified\t{}", modified)?;
                }
                (Err(e), _) | (_, Err(e)) => writeln!(writer, "error\t{}", e)?,
            }
            if let Some(coding) = coding {
                writeln!(writer, "coding\t{}", coding)?;
            }
            for update in sequence.modify_map().updates() {
                writeln!(writer, "update\t{}\t{}\t{}", update.key, update.variant, update.result)?;
            }
            let stats = &region.stats;
            writeln!(
                writer,
                "stats\tscanned={} selected={} duplicates={} ambiguous={} upstream_deleted={} non_canonical={}",
                stats.scanned,
                stats.selected,
                stats.duplicates,
                stats.ambiguous,
                stats.upstream_deleted,
                stats.non_canonical
            )
        }
        OutputFormat::Json => {
            let report = RegionReport {
                contig: sequence.contig(),
                interval: sequence.interval(),
                valid: sequence.is_valid(),
                error: sequence.failure().map(|e| e.detailed_message()),
                original: sequence.original_sequence().ok(),
                modified: sequence.modified_sequence().ok(),
                coding,
                updates: sequence
                    .modify_map()
                    .updates()
                    .map(|u| UpdateReport {
                        key: u.key,
                        variant: u.variant.to_string(),
                        result: u.result,
                        size_delta: u.size_delta,
                    })
                    .collect(),
                stats: &region.stats,
            };
            write_json(writer, &report)
        }
    }
}

/// Write the canonical form of a call
pub fn write_canonical<W: Write>(writer: &mut W, variant: &Variant, format: OutputFormat) -> io::Result<()> {
    let canonical = variant.canonical_clone();
    let key = canonical
        .is_canonical()
        .then(|| canonical.modify_interval().lower());

    match format {
        OutputFormat::Text => {
            writeln!(writer, "input\t{}", variant)?;
            writeln!(writer, "canonical\t{}", canonical)?;
            match key {
                Some(key) => {
                    writeln!(writer, "modify\t{}", canonical.modify_interval())?;
                    writeln!(writer, "member\t{}", canonical.member_interval())?;
                    writeln!(writer, "key\t{}", key)
                }
                None => writeln!(writer, "note\tnot reducible to SNP, INSERT or DELETE"),
            }
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct CanonicalReport<'a> {
                input: &'a Variant,
                canonical: &'a Variant,
                is_canonical: bool,
                #[serde(skip_serializing_if = "Option::is_none")]
                key: Option<u64>,
                modify: Interval,
                member: Interval,
            }
            write_json(
                writer,
                &CanonicalReport {
                    input: variant,
                    canonical: &canonical,
                    is_canonical: key.is_some(),
                    key,
                    modify: canonical.modify_interval(),
                    member: canonical.member_interval(),
                },
            )
        }
    }
}

/// Write a population run
#[cfg(feature = "parallel")]
pub fn write_population<W: Write>(
    writer: &mut W,
    report: &PopulationMutation,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            for (genome, result) in &report.results {
                writeln!(writer, "{}\t{}", genome, result.modified)?;
                if let Some(coding) = &result.coding {
                    writeln!(writer, "{}\tcoding\t{}", genome, coding)?;
                }
            }
            for (genome, reason) in &report.failures {
                writeln!(writer, "{}\tFAILED\t{}", genome, reason)?;
            }
            let stats = &report.stats;
            writeln!(
                writer,
                "# genomes={} succeeded={} failed={} scanned={} duplicates={} upstream_deleted={}",
                stats.genomes,
                stats.succeeded,
                stats.failed,
                stats.selection.scanned,
                stats.selection.duplicates,
                stats.selection.upstream_deleted
            )
        }
        OutputFormat::Json => write_json(writer, report),
    }
}

fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).map_err(io::Error::other)?;
    writeln!(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MutateConfig;
    use crate::mutate::mutate_region;
    use crate::reference::MockProvider;
    use crate::variant::{ContigVariants, Phase};
    use std::io::Cursor;
    use std::sync::Arc;

    fn region() -> MutatedRegion {
        let provider = MockProvider::with_test_data();
        let mut calls = ContigVariants::new("chr1");
        calls
            .add(Arc::new(Variant::new("chr1", 2, Phase::A, "G", "T")))
            .unwrap();
        mutate_region(&provider, &calls, Interval::new(0, 8), &MutateConfig::default()).unwrap()
    }

    fn render<F: FnOnce(&mut Cursor<Vec<u8>>) -> io::Result<()>>(f: F) -> String {
        let mut buffer = Cursor::new(Vec::new());
        f(&mut buffer).unwrap();
        String::from_utf8(buffer.into_inner()).unwrap()
    }

    #[test]
    fn test_parse_interval_forms() {
        assert_eq!(parse_interval(" 1_000-2_000 ").unwrap(), Interval::new(1000, 2000));
        assert!(parse_interval("100").is_err());
        assert!(parse_interval("a-b").is_err());
    }

    #[test]
    fn test_parse_intervals() {
        assert_eq!(
            parse_intervals("0-3,5-8").unwrap(),
            vec![Interval::new(0, 3), Interval::new(5, 8)]
        );
        assert!(parse_intervals("").unwrap().is_empty());
        assert!(parse_intervals("0-3,x").is_err());
    }

    #[test]
    fn test_write_region_text() {
        let region = region();
        let out = render(|w| write_region(w, &region, None, OutputFormat::Text));
        assert!(out.contains("region\tchr1:[0, 8)"));
        assert!(out.contains("modified\tACTTACGT"));
        assert!(out.contains("NORMAL"));
        assert!(out.contains("scanned=1 selected=1"));
    }

    #[test]
    fn test_write_region_json() {
        let region = region();
        let out = render(|w| write_region(w, &region, Some("AC"), OutputFormat::Json));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["modified"], "ACTTACGT");
        assert_eq!(value["coding"], "AC");
        assert_eq!(value["valid"], true);
        assert_eq!(value["updates"][0]["result"], "NORMAL");
    }

    #[test]
    fn test_write_canonical() {
        let variant = Variant::new("chr1", 100, Phase::Unphased, "CAGTT", "CAT");
        let out = render(|w| write_canonical(w, &variant, OutputFormat::Text));
        assert!(out.contains("canonical\tchr1:101 AGT>A (DELETE, unphased)"));
        assert!(out.contains("key\t102"));

        let mnp = Variant::new("chr1", 100, Phase::Unphased, "AC", "GT");
        let out = render(|w| write_canonical(w, &mnp, OutputFormat::Json));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["is_canonical"], false);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_write_population_text() {
        use crate::parallel::{mutate_population, MutationRequest};
        use crate::variant::PopulationVariants;

        let mut pop = PopulationVariants::new("test");
        pop.add("alpha", Variant::new("chr1", 2, Phase::A, "G", "T")).unwrap();
        pop.add("beta", Variant::new("chr1", 2, Phase::A, "A", "T")).unwrap();
        let provider = MockProvider::with_test_data();
        let request = MutationRequest::new("chr1", Interval::new(0, 8));
        let run = mutate_population(&provider, &pop, &request, &MutateConfig::default()).unwrap();

        let out = render(|w| write_population(w, &run, OutputFormat::Text));
        assert!(out.contains("alpha\tACTTACGT"));
        assert!(out.contains("beta\tFAILED"));
        assert!(out.contains("# genomes=2 succeeded=1 failed=1"));
    }
}
