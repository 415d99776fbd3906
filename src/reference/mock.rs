//! Mock reference provider for testing

use crate::error::FerroError;
use crate::interval::Interval;
use crate::reference::provider::{check_interval, ReferenceProvider};
use std::collections::HashMap;
use std::path::Path;

/// In-memory reference provider
///
/// Contigs can be added programmatically or loaded from a JSON object
/// mapping contig names to sequences.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    contigs: HashMap<String, String>,
}

impl MockProvider {
    /// Create an empty mock provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Load contigs from a JSON file such as `{"chr1": "ACGT..."}`
    pub fn from_json(path: &Path) -> Result<Self, FerroError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, FerroError> {
        let contigs: HashMap<String, String> = serde_json::from_str(json)?;
        let mut provider = Self::new();
        for (name, sequence) in contigs {
            if !sequence.is_ascii() {
                return Err(FerroError::InvalidCoordinates {
                    msg: format!("contig '{}' has non-ASCII bases", name),
                });
            }
            provider.add_contig(name, sequence);
        }
        Ok(provider)
    }

    /// Add a contig; bases are stored upper-cased
    pub fn add_contig(&mut self, name: impl Into<String>, sequence: impl Into<String>) {
        self.contigs
            .insert(name.into(), sequence.into().to_ascii_uppercase());
    }

    /// Create a provider with a small test contig
    ///
    /// `chr1` is `ACGTACGT`; `chr2` is 40 bases used by boundary tests.
    pub fn with_test_data() -> Self {
        let mut provider = Self::new();
        provider.add_contig("chr1", "ACGTACGT");
        provider.add_contig("chr2", "GATTACAGATTACACCCCGGGGTTTTAAAACCCCGGGGTT");
        provider
    }
}

impl ReferenceProvider for MockProvider {
    fn sequence(&self, contig: &str, interval: Interval) -> Result<String, FerroError> {
        let bases = self
            .contigs
            .get(contig)
            .ok_or_else(|| FerroError::ReferenceNotFound {
                id: contig.to_string(),
            })?;
        check_interval(contig, interval, bases.len() as u64)?;
        bases
            .get(interval.lower() as usize..interval.upper() as usize)
            .map(str::to_string)
            .ok_or_else(|| FerroError::InvalidCoordinates {
                msg: format!("{}:{} does not fall on base boundaries", contig, interval),
            })
    }

    fn contig_length(&self, contig: &str) -> Option<u64> {
        self.contigs.get(contig).map(|s| s.len() as u64)
    }
}
