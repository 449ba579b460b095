//! Error types for stop detection

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a stop detection run.
#[derive(Debug, Error)]
pub enum StopError {
    #[error("The file '{0}' does not exist")]
    MissingInput(PathBuf),

    #[error("Input contains no fixes")]
    EmptyInput,

    #[error("Failed to parse fix at row {row}: {message}")]
    Parse { row: usize, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "serde")]
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a reverse geocoder.
///
/// These never abort the pipeline; the naming step turns them into
/// [`LocationName::Error`](crate::naming::LocationName::Error).
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Failed to decode geocoder response: {0}")]
    Decode(String),
}
