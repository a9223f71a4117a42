//! Schema document path resolution.

use std::path::{Path, PathBuf};

/// Environment variable for overriding the schema document.
pub const SCHEMA_ENV_VAR: &str = "GTFS_SCHEMA_PATH";

/// Where the schema document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLocation {
    /// A document on disk, from `--schema` or the environment.
    File(PathBuf),
    /// The document compiled into this crate.
    Bundled,
}

/// Resolve the schema location.
///
/// Resolution order:
/// 1. an explicit path (the CLI `--schema` flag)
/// 2. `GTFS_SCHEMA_PATH` environment variable
/// 3. the bundled GTFS schema
pub fn resolve_schema_location(explicit: Option<&Path>) -> SchemaLocation {
    if let Some(path) = explicit {
        return SchemaLocation::File(path.to_path_buf());
    }
    match std::env::var(SCHEMA_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => SchemaLocation::File(PathBuf::from(path)),
        _ => SchemaLocation::Bundled,
    }
}

/// On-disk copy of the bundled schema, for tooling that wants a real path.
pub fn bundled_schema_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("schema/gtfs_schema.json")
}
