// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-mutate: per-genome mutated reference sequence
//!
//! Part of the ferro bioinformatics toolkit.
//!
//! Given a reference region and the variant calls of one genome, ferro-mutate
//! selects the calls that touch the region, applies them in a single forward
//! pass, and answers sub-sequence queries in either original or mutated
//! coordinates. Population runs repeat this for every genome in a call set on
//! a worker pool.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ferro_mutate::{mutate_region, ContigVariants, Interval, MockProvider, MutateConfig, Phase, Variant};
//!
//! let provider = MockProvider::with_test_data();
//! let mut calls = ContigVariants::new("chr1");
//! // Delete "GT" after the anchor C at offset 1
//! calls.add(Arc::new(Variant::new("chr1", 1, Phase::A, "CGT", "C"))).unwrap();
//!
//! let region = mutate_region(&provider, &calls, Interval::new(0, 8), &MutateConfig::default()).unwrap();
//! let sequence = region.sequence;
//! assert_eq!(sequence.modified_sequence().unwrap(), "ACACGT");
//! assert_eq!(sequence.modified_sub_sequence(&Interval::new(4, 8)).unwrap(), "ACGT");
//! ```

pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod interval;
pub mod mutate;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod reference;
pub mod variant;

// Re-export commonly used types
pub use config::MutateConfig;
pub use error::FerroError;
pub use interval::{Interval, IntervalSet};
pub use mutate::{mutate_region, AdjustedSequence, MutatedRegion, SequenceSource};
pub use reference::{FastaProvider, MockProvider, ReferenceProvider, Strand};
pub use variant::{
    AmbiguityPolicy, ContigVariants, GenomeVariants, Phase, PopulationVariants, Variant,
    VariantFilter, VariantSelector, VariantType,
};

/// Result type alias for ferro-mutate operations
pub type Result<T> = std::result::Result<T, FerroError>;
