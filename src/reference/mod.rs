//! Reference data abstraction
//!
//! Provides the provider trait and implementations for reading reference
//! bases, plus strand helpers used when decoding coding sequences.

pub mod fasta;
pub mod mock;
pub mod provider;
pub mod strand;

pub use fasta::FastaProvider;
pub use mock::MockProvider;
pub use provider::ReferenceProvider;
pub use strand::{reverse_complement, Strand};
