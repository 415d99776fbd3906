//! Strand orientation and reverse complement

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strand orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strand {
    #[default]
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Plus => write!(f, "+"),
            Strand::Minus => write!(f, "-"),
        }
    }
}

impl FromStr for Strand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" | "plus" | "forward" => Ok(Strand::Plus),
            "-" | "minus" | "reverse" => Ok(Strand::Minus),
            _ => Err(format!("Invalid strand: {}. Use '+' or '-'", s)),
        }
    }
}

/// Reverse complement a nucleotide sequence, preserving case
///
/// Characters other than ACGT are passed through unchanged.
pub fn reverse_complement(seq: &str) -> String {
    seq.chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'T' => 'A',
            'G' => 'C',
            'C' => 'G',
            'a' => 't',
            't' => 'a',
            'g' => 'c',
            'c' => 'g',
            _ => c,
        })
        .collect()
}
