#![deny(unsafe_code)]

use crate::error::Result;
use crate::registry::{SchemaRegistry, VerifySummary};

#[derive(Debug, Clone, serde::Serialize)]
pub struct DoctorReport {
    pub schema: String,
    pub schema_version: u32,
    pub source: String,
    pub sha256: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub counts: DoctorCounts,
    pub dependency_order: Vec<String>,
    pub files: Vec<DoctorFile>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DoctorCounts {
    pub files: usize,
    pub required_files: usize,
    pub keyed_files: usize,
    pub fields: usize,
    pub required_fields: usize,
    pub references: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DoctorFile {
    pub filename: String,
    pub required: bool,
    pub fields: usize,
    pub required_fields: usize,
    pub key: Vec<String>,
    pub depends_on: Vec<String>,
}

impl DoctorReport {
    pub fn from_verify_summary(registry: &SchemaRegistry, summary: &VerifySummary) -> Result<Self> {
        let dependency_order = registry
            .schema
            .dependency_order()?
            .into_iter()
            .map(|file| file.filename.clone())
            .collect();
        let files = registry
            .schema
            .files
            .iter()
            .map(|file| DoctorFile {
                filename: file.filename.clone(),
                required: file.required,
                fields: file.fields.len(),
                required_fields: file.required_headers().len(),
                key: file.key.clone(),
                depends_on: file.depends_on.clone(),
            })
            .collect();

        Ok(Self {
            schema: "gtfs-validator.schema-doctor".to_string(),
            schema_version: 1,
            source: summary.source.clone(),
            sha256: summary.sha256.clone(),
            name: registry.schema.name.clone(),
            version: registry.schema.version.clone(),
            counts: DoctorCounts {
                files: summary.file_count,
                required_files: summary.required_file_count,
                keyed_files: summary.keyed_file_count,
                fields: summary.field_count,
                required_fields: summary.required_field_count,
                references: summary.reference_count,
            },
            dependency_order,
            files,
        })
    }
}
