#![deny(unsafe_code)]

use std::collections::BTreeSet;

use gtfs_model::{FieldType, SchemaModel};
use regex::Regex;

use crate::error::{Result, SchemaError};

/// Structural checks on a freshly parsed schema.
///
/// Fails on the first problem found. Files are checked in declaration order.
pub fn verify_schema(schema: &SchemaModel) -> Result<()> {
    if schema.files.is_empty() {
        return Err(SchemaError::Empty);
    }

    let mut filenames: BTreeSet<&str> = BTreeSet::new();
    for file in &schema.files {
        if !filenames.insert(file.filename.as_str()) {
            return Err(SchemaError::DuplicateFile {
                filename: file.filename.clone(),
            });
        }
    }

    for file in &schema.files {
        let mut fields: BTreeSet<&str> = BTreeSet::new();
        for field in &file.fields {
            if !fields.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    filename: file.filename.clone(),
                    field: field.name.clone(),
                });
            }
            if let Some(pattern) = &field.pattern {
                Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
                    filename: file.filename.clone(),
                    field: field.name.clone(),
                    source,
                })?;
            }
            if field.field_type == FieldType::Enum && field.values.is_empty() {
                return Err(SchemaError::EmptyEnum {
                    filename: file.filename.clone(),
                    field: field.name.clone(),
                });
            }
            if let (Some(min), Some(max)) = (field.min, field.max)
                && min > max
            {
                return Err(SchemaError::InvalidRange {
                    filename: file.filename.clone(),
                    field: field.name.clone(),
                    min,
                    max,
                });
            }
            if let Some(target) = &field.references {
                let resolved = schema
                    .file(&target.file)
                    .is_some_and(|target_file| target_file.declares(&target.field));
                if !resolved {
                    return Err(SchemaError::UnknownReference {
                        filename: file.filename.clone(),
                        field: field.name.clone(),
                        target: format!("{}.{}", target.file, target.field),
                    });
                }
            }
        }

        for key_field in &file.key {
            if !fields.contains(key_field.as_str()) {
                return Err(SchemaError::UnknownKeyField {
                    filename: file.filename.clone(),
                    field: key_field.clone(),
                });
            }
        }
    }

    // Unknown dependencies and cycles.
    schema.dependency_order()?;
    Ok(())
}
