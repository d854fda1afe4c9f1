//! Error types for loading mirrors and settings.

use thiserror::Error;
use vantage_types::FormatVersion;

/// Errors raised outside the query path.
///
/// Searching and synthesis never fail: malformed queries degrade to empty
/// results. Only I/O around mirrors and settings reports errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading a mirror or settings file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A mirror could not be decoded.
    #[error("Failed to parse mirror: {0}")]
    Parse(#[from] serde_json::Error),

    /// The mirror was written with an incompatible format version.
    #[error("Incompatible mirror format version {0}")]
    IncompatibleVersion(FormatVersion),

    /// Settings could not be loaded.
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single search predicate could not be applied.
///
/// The evaluator logs these and treats the predicate as matching nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("not a number: {0:?}")]
    InvalidNumber(String),

    #[error("invalid duration {0:?}, expected e.g. >=5m")]
    InvalidDuration(String),

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
