//! Configuration file support for ferro-mutate.
//!
//! Settings that shape variant selection and population runs can be kept
//! in a TOML file instead of being repeated on every command line.
//!
//! # Example Configuration
//!
//! ```toml
//! upstream_margin = 200
//! ambiguity_policy = "frequency"
//! frequency_key = "AF"
//! threads = 8
//! verify_snps = true
//! ```
//!
//! # Config File Locations
//!
//! Configuration is searched in this order (first found wins):
//! 1. `.ferro-mutate.toml` in current directory
//! 2. `~/.config/ferro/mutate.toml`
//!
//! CLI flags take precedence over config file settings.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FerroError;
use crate::variant::select::UPSTREAM_MARGIN;
use crate::variant::AmbiguityPolicy;

/// Settings for selection and mutation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MutateConfig {
    /// Bases scanned upstream of a region for overlapping deletions.
    pub upstream_margin: u64,
    /// How to choose among distinct calls at one offset.
    pub ambiguity_policy: AmbiguityPolicy,
    /// INFO attribute holding the population frequency.
    pub frequency_key: String,
    /// Worker threads for population runs (0 = auto).
    pub threads: usize,
    /// Re-check every applied SNP after mutation.
    pub verify_snps: bool,
}

impl Default for MutateConfig {
    fn default() -> Self {
        Self {
            upstream_margin: UPSTREAM_MARGIN,
            ambiguity_policy: AmbiguityPolicy::default(),
            frequency_key: "AF".to_string(),
            threads: 0,
            verify_snps: true,
        }
    }
}

impl MutateConfig {
    /// Load configuration from the default locations.
    ///
    /// Files that exist but fail to parse are reported and skipped.
    pub fn load() -> Option<Self> {
        let mut candidates = vec![PathBuf::from(".ferro-mutate.toml")];
        if let Some(home) = dirs_home() {
            candidates.push(home.join(".config").join("ferro").join("mutate.toml"));
        }

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_path(&path) {
                Ok(config) => {
                    log::debug!("Loaded configuration from {}", path.display());
                    return Some(config);
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }

        None
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, FerroError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML content.
    pub fn parse(content: &str) -> Result<Self, FerroError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_upstream_margin(mut self, margin: u64) -> Self {
        self.upstream_margin = margin;
        self
    }

    pub fn with_ambiguity_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity_policy = policy;
        self
    }

    pub fn with_frequency_key(mut self, key: impl Into<String>) -> Self {
        self.frequency_key = key.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_verify_snps(mut self, verify: bool) -> Self {
        self.verify_snps = verify;
        self
    }
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = MutateConfig::parse("").unwrap();
        assert_eq!(config, MutateConfig::default());
        assert_eq!(config.upstream_margin, 200);
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::Homozygous);
    }

    #[test]
    fn test_parse_all_fields() {
        let content = r#"
upstream_margin = 50
ambiguity_policy = "frequency"
frequency_key = "MAF"
threads = 4
verify_snps = false
"#;
        let config = MutateConfig::parse(content).unwrap();
        assert_eq!(config.upstream_margin, 50);
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::Frequency);
        assert_eq!(config.frequency_key, "MAF");
        assert_eq!(config.threads, 4);
        assert!(!config.verify_snps);
    }

    #[test]
    fn test_comments_ignored() {
        let content = r#"
# Selection settings
ambiguity_policy = "first" # inline comment
"#;
        let config = MutateConfig::parse(content).unwrap();
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::First);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = MutateConfig::parse("margin = 3").unwrap_err();
        assert!(matches!(err, FerroError::Config { .. }));
    }

    #[test]
    fn test_bad_policy_rejected() {
        assert!(MutateConfig::parse(r#"ambiguity_policy = "best""#).is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mutate.toml");
        fs::write(&path, "threads = 2\n").unwrap();
        let config = MutateConfig::load_from_path(&path).unwrap();
        assert_eq!(config.threads, 2);
    }

    #[test]
    fn test_builders() {
        let config = MutateConfig::default()
            .with_upstream_margin(10)
            .with_ambiguity_policy(AmbiguityPolicy::First)
            .with_frequency_key("GNOMAD_AF")
            .with_threads(3)
            .with_verify_snps(false);
        assert_eq!(config.upstream_margin, 10);
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::First);
        assert_eq!(config.frequency_key, "GNOMAD_AF");
        assert_eq!(config.threads, 3);
        assert!(!config.verify_snps);
    }
}
