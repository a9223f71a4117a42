#![deny(unsafe_code)]

use std::path::PathBuf;

use gtfs_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read schema document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON schema document {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse TOML schema document {origin}: {source}")]
    Toml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported schema document format: {path} (expected .json or .toml)")]
    UnsupportedFormat { path: PathBuf },

    #[error("schema declares no files")]
    Empty,

    #[error("duplicate file in schema: {filename}")]
    DuplicateFile { filename: String },

    #[error("duplicate field {field} in {filename}")]
    DuplicateField { filename: String, field: String },

    #[error("key field {field} of {filename} is not declared")]
    UnknownKeyField { filename: String, field: String },

    #[error("field {filename}.{field} references unknown target {target}")]
    UnknownReference {
        filename: String,
        field: String,
        target: String,
    },

    #[error("invalid pattern for {filename}.{field}: {source}")]
    InvalidPattern {
        filename: String,
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("enum field {filename}.{field} declares no values")]
    EmptyEnum { filename: String, field: String },

    #[error("invalid range for {filename}.{field}: min {min} is greater than max {max}")]
    InvalidRange {
        filename: String,
        field: String,
        min: f64,
        max: f64,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl SchemaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
