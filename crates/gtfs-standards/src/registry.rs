#![deny(unsafe_code)]

use std::path::Path;

use gtfs_model::SchemaModel;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::hash::sha256_hex;
use crate::parser::{JsonSchemaParser, SchemaParser, parser_for_path};
use crate::paths::{SchemaLocation, resolve_schema_location};
use crate::verify::verify_schema;

/// The schema document compiled into the crate.
pub const BUNDLED_SCHEMA: &str = include_str!("../schema/gtfs_schema.json");

/// Origin label used for the bundled document.
pub const BUNDLED_ORIGIN: &str = "bundled:gtfs_schema.json";

#[derive(Debug, Clone, serde::Serialize)]
pub struct VerifySummary {
    pub source: String,
    pub sha256: String,
    pub file_count: usize,
    pub required_file_count: usize,
    pub keyed_file_count: usize,
    pub field_count: usize,
    pub required_field_count: usize,
    pub reference_count: usize,
}

/// A verified schema together with where it came from.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    pub schema: SchemaModel,
    pub source: String,
    pub sha256: String,
}

impl SchemaRegistry {
    /// Read, parse and verify a schema document from disk.
    pub fn verify_and_load(path: &Path) -> Result<(Self, VerifySummary)> {
        let parser = parser_for_path(path)?;
        let document = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
        Self::from_document(&path.display().to_string(), &document, parser.as_ref())
    }

    /// The bundled GTFS schema.
    pub fn bundled() -> Result<(Self, VerifySummary)> {
        Self::from_document(BUNDLED_ORIGIN, BUNDLED_SCHEMA, &JsonSchemaParser)
    }

    /// Load from an explicit path, the environment override, or the bundled
    /// document, in that order.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, VerifySummary)> {
        match resolve_schema_location(explicit) {
            SchemaLocation::File(path) => Self::verify_and_load(&path),
            SchemaLocation::Bundled => Self::bundled(),
        }
    }

    pub fn from_document(
        origin: &str,
        document: &str,
        parser: &dyn SchemaParser,
    ) -> Result<(Self, VerifySummary)> {
        let schema = parser.parse(origin, document)?;
        verify_schema(&schema)?;
        let sha256 = sha256_hex(document.as_bytes());

        let summary = summarize(origin, &sha256, &schema);
        debug!(
            source = origin,
            files = summary.file_count,
            fields = summary.field_count,
            sha256 = %sha256,
            "schema loaded"
        );

        Ok((
            Self {
                schema,
                source: origin.to_string(),
                sha256,
            },
            summary,
        ))
    }
}

fn summarize(origin: &str, sha256: &str, schema: &SchemaModel) -> VerifySummary {
    let fields = schema.files.iter().flat_map(|file| file.fields.iter());
    VerifySummary {
        source: origin.to_string(),
        sha256: sha256.to_string(),
        file_count: schema.files.len(),
        required_file_count: schema.required_filenames().len(),
        keyed_file_count: schema.files.iter().filter(|file| file.is_keyed()).count(),
        field_count: fields.clone().count(),
        required_field_count: fields.clone().filter(|field| field.required).count(),
        reference_count: fields.filter(|field| field.references.is_some()).count(),
    }
}
