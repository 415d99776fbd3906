//! Reference provider trait
//!
//! Defines the interface for reading reference bases over contig intervals.

use crate::error::FerroError;
use crate::interval::Interval;

/// Trait for providing reference sequence data
///
/// Implementations might include:
/// - MockProvider for testing
/// - FastaProvider for indexed FASTA files
///
/// Providers are shared read-only across worker threads during population
/// runs, so implementations must be `Send + Sync`.
pub trait ReferenceProvider: Send + Sync {
    /// Get the bases of `interval` on `contig`, upper-cased
    ///
    /// Fails with `OutOfBounds` if the interval extends past the contig end
    /// and `ReferenceNotFound` if the contig is unknown.
    fn sequence(&self, contig: &str, interval: Interval) -> Result<String, FerroError>;

    /// Length of a contig, if known
    fn contig_length(&self, contig: &str) -> Option<u64>;

    /// Check if a contig exists
    fn has_contig(&self, contig: &str) -> bool {
        self.contig_length(contig).is_some()
    }
}

/// Blanket implementation for boxed trait objects
impl ReferenceProvider for Box<dyn ReferenceProvider> {
    fn sequence(&self, contig: &str, interval: Interval) -> Result<String, FerroError> {
        (**self).sequence(contig, interval)
    }

    fn contig_length(&self, contig: &str) -> Option<u64> {
        (**self).contig_length(contig)
    }

    fn has_contig(&self, contig: &str) -> bool {
        (**self).has_contig(contig)
    }
}

/// Check `interval` against a contig length
pub(crate) fn check_interval(contig: &str, interval: Interval, length: u64) -> Result<(), FerroError> {
    if interval.upper() > length {
        return Err(FerroError::out_of_bounds(format!(
            "{}:{} extends past contig end ({})",
            contig, interval, length
        )));
    }
    Ok(())
}
