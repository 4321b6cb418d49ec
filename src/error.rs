//! Error types for the litmine library.

use std::io;
use thiserror::Error;

/// Result type alias for litmine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during extraction.
///
/// The pipeline favors partial, flagged results over raising: only failure to
/// open or access the source document is fatal. Heuristic stages (unit
/// normalization, property inference, table reconstruction) degrade to
/// partial output instead of returning these variants.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source document could not be opened or accessed.
    #[error("Cannot open document: {0}")]
    DocumentOpen(String),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// An optional external capability (OCR, VLM, region rendering) failed.
    ///
    /// Callers treat this as a degraded-mode signal, not a fatal condition.
    #[error("Capability error: {0}")]
    Capability(String),

    /// Baseline database file exists but could not be parsed.
    #[error("Baseline load error: {0}")]
    Baseline(String),

    /// Error serializing the result payload.
    #[error("Output error: {0}")]
    Output(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Output(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Output(err.to_string())
    }
}
