//! Schema document parsers.
//!
//! Both formats describe the same structure: a top-level `files` list of
//! file declarations, each with a `fields` list.

use std::path::Path;

use gtfs_model::SchemaModel;

use crate::error::{Result, SchemaError};

/// Turns a schema document into a [`SchemaModel`].
///
/// Parsers only decode; structural checks happen in [`crate::verify`].
pub trait SchemaParser {
    /// `origin` names the document in error messages.
    fn parse(&self, origin: &str, document: &str) -> Result<SchemaModel>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaParser;

impl SchemaParser for JsonSchemaParser {
    fn parse(&self, origin: &str, document: &str) -> Result<SchemaModel> {
        serde_json::from_str(document).map_err(|source| SchemaError::Json {
            origin: origin.to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlSchemaParser;

impl SchemaParser for TomlSchemaParser {
    fn parse(&self, origin: &str, document: &str) -> Result<SchemaModel> {
        toml::from_str(document).map_err(|source| SchemaError::Toml {
            origin: origin.to_string(),
            source,
        })
    }
}

/// Pick a parser from the file extension.
pub fn parser_for_path(path: &Path) -> Result<Box<dyn SchemaParser>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("json") => Ok(Box::new(JsonSchemaParser)),
        Some("toml") => Ok(Box::new(TomlSchemaParser)),
        _ => Err(SchemaError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}
