//! Error types for ferro-mutate
//!
//! Every failure the mutation pipeline can report is a [`FerroError`]. Each
//! variant maps to an [`ErrorCode`] so that callers (and the CLI) can sort
//! failures into categories without matching on message text.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Reference errors (E2xxx)
    /// Contig not known to the reference provider
    ReferenceNotFound = 2001,

    // Validation errors (E3xxx)
    /// Offset or interval outside the tracked region
    OutOfBounds = 3001,
    /// Reference bases do not match the variant's declared reference
    ReferenceMismatch = 3002,
    /// Invalid coordinate range
    InvalidRange = 3003,

    // Mutation errors (E4xxx)
    /// Two updates keyed at the same contig offset
    DuplicateInsertion = 4001,
    /// Size or offset reconciliation failed after an update
    InvariantViolation = 4002,
    /// Query against a sequence that failed mutation
    InvalidSequence = 4003,

    // Configuration and IO errors (E9xxx)
    /// File IO error
    IoError = 9001,
    /// JSON parsing error
    JsonError = 9002,
    /// Configuration file error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the error code as a string (e.g., "E3001")
    pub fn as_str(&self) -> String {
        format!("E{:04}", *self as u16)
    }

    /// Get a brief description of this error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::ReferenceNotFound => "reference contig not found",
            ErrorCode::OutOfBounds => "offset out of bounds",
            ErrorCode::ReferenceMismatch => "reference sequence mismatch",
            ErrorCode::InvalidRange => "invalid coordinate range",
            ErrorCode::DuplicateInsertion => "duplicate update at offset",
            ErrorCode::InvariantViolation => "sequence invariant violated",
            ErrorCode::InvalidSequence => "sequence invalidated by failed mutation",
            ErrorCode::IoError => "file I/O error",
            ErrorCode::JsonError => "JSON parsing error",
            ErrorCode::ConfigError => "configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for ferro-mutate operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FerroError {
    /// Contig not available from the reference provider
    #[error("Reference not found: {id}")]
    ReferenceNotFound { id: String },

    /// An offset or interval falls outside the tracked region
    #[error("Out of bounds: {msg}")]
    OutOfBounds { msg: String },

    /// Expected reference bases do not match either buffer
    #[error("Reference mismatch at {location}: expected {expected}, found {found}")]
    ReferenceMismatch {
        location: String,
        expected: String,
        found: String,
    },

    /// Two updates target the same contig offset
    #[error("Duplicate update at contig offset {offset}: {msg}")]
    DuplicateInsertion { offset: u64, msg: String },

    /// Post-update size/offset reconciliation failed
    #[error("Invariant violation: {msg}")]
    InvariantViolation { msg: String },

    /// Query against a sequence whose mutation failed
    #[error("Sequence {contig}:{interval} is invalid: {msg}")]
    InvalidSequence {
        contig: String,
        interval: String,
        msg: String,
    },

    /// Malformed coordinates supplied by the caller
    #[error("Invalid coordinates: {msg}")]
    InvalidCoordinates { msg: String },

    /// Configuration file could not be read or parsed
    #[error("Config error: {msg}")]
    Config { msg: String },

    /// IO error (for file operations)
    #[error("IO error: {msg}")]
    Io { msg: String },

    /// JSON parsing error
    #[error("JSON error: {msg}")]
    Json { msg: String },
}

impl FerroError {
    /// Shorthand for an [`FerroError::OutOfBounds`] error
    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        FerroError::OutOfBounds { msg: msg.into() }
    }

    /// Shorthand for an [`FerroError::InvariantViolation`] error
    pub fn invariant(msg: impl Into<String>) -> Self {
        FerroError::InvariantViolation { msg: msg.into() }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            FerroError::ReferenceNotFound { .. } => ErrorCode::ReferenceNotFound,
            FerroError::OutOfBounds { .. } => ErrorCode::OutOfBounds,
            FerroError::ReferenceMismatch { .. } => ErrorCode::ReferenceMismatch,
            FerroError::DuplicateInsertion { .. } => ErrorCode::DuplicateInsertion,
            FerroError::InvariantViolation { .. } => ErrorCode::InvariantViolation,
            FerroError::InvalidSequence { .. } => ErrorCode::InvalidSequence,
            FerroError::InvalidCoordinates { .. } => ErrorCode::InvalidRange,
            FerroError::Config { .. } => ErrorCode::ConfigError,
            FerroError::Io { .. } => ErrorCode::IoError,
            FerroError::Json { .. } => ErrorCode::JsonError,
        }
    }

    /// Format the error prefixed with its code, e.g. `[E3002] Reference mismatch ...`
    pub fn detailed_message(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}

impl From<std::io::Error> for FerroError {
    fn from(err: std::io::Error) -> Self {
        FerroError::Io {
            msg: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for FerroError {
    fn from(err: serde_json::Error) -> Self {
        FerroError::Json {
            msg: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for FerroError {
    fn from(err: toml::de::Error) -> Self {
        FerroError::Config {
            msg: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ReferenceNotFound.as_str(), "E2001");
        assert_eq!(ErrorCode::OutOfBounds.as_str(), "E3001");
        assert_eq!(ErrorCode::DuplicateInsertion.as_str(), "E4001");
        assert_eq!(ErrorCode::IoError.as_str(), "E9001");
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::ReferenceMismatch), "E3002");
    }

    #[test]
    fn test_error_code_mapping() {
        let err = FerroError::out_of_bounds("offset 12 outside [0, 10)");
        assert_eq!(err.code(), ErrorCode::OutOfBounds);

        let err = FerroError::invariant("size drift");
        assert_eq!(err.code(), ErrorCode::InvariantViolation);

        let err = FerroError::DuplicateInsertion {
            offset: 5,
            msg: "second insert dropped".to_string(),
        };
        assert_eq!(err.code(), ErrorCode::DuplicateInsertion);
    }

    #[test]
    fn test_detailed_message() {
        let err = FerroError::ReferenceMismatch {
            location: "chr1:100".to_string(),
            expected: "A".to_string(),
            found: "C".to_string(),
        };
        let msg = err.detailed_message();
        assert!(msg.starts_with("[E3002]"));
        assert!(msg.contains("expected A, found C"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.fa");
        let err: FerroError = io_err.into();
        assert!(matches!(err, FerroError::Io { .. }));
        assert_eq!(err.code(), ErrorCode::IoError);
    }

    #[test]
    fn test_from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("not = [valid").unwrap_err();
        let err: FerroError = toml_err.into();
        assert_eq!(err.code(), ErrorCode::ConfigError);
    }
}
