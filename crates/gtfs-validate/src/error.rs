use thiserror::Error;

use gtfs_ingest::IngestError;
use gtfs_model::ModelError;
use gtfs_standards::SchemaError;

/// Setup failures. Anomalies in the feed itself are notices, never errors.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("feed error: {0}")]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("invalid pattern for {filename}.{field}: {source}")]
    Pattern {
        filename: String,
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule {id} is registered twice")]
    DuplicateRule { id: String },
}

pub type Result<T> = std::result::Result<T, ValidateError>;
