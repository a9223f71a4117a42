//! Error types for feed ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading a feed.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Feed directory not found.
    #[error("feed directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The feed does not contain the requested file.
    #[error("file {filename} is not part of the feed")]
    UnknownFile { filename: String },

    // === CSV Errors ===
    /// Failed to open a file or read its header line.
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A single record could not be decoded.
    #[error("row {csv_row_number} of {filename}: {message}")]
    Record {
        filename: String,
        csv_row_number: u64,
        message: String,
    },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
