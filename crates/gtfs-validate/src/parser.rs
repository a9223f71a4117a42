//! Raw row to typed entity conversion.
//!
//! Every declared field is parsed independently. A field that fails produces
//! one notice and an explicit error marker; the remaining fields of the row
//! are still parsed and the entity is always returned.

use std::collections::{BTreeMap, BTreeSet};

use gtfs_model::{
    FieldSpec, FieldType, FieldValue, FileSpec, GtfsColor, GtfsTime, Notice, ParsedEntity,
    RawRow, SchemaModel, TypedValue, parse_gtfs_date,
};
use regex::Regex;

use crate::error::{Result, ValidateError};

/// Compiled `pattern` constraints of a schema, anchored at both ends.
#[derive(Debug, Clone, Default)]
pub struct FieldPatterns {
    by_file: BTreeMap<String, BTreeMap<String, Regex>>,
}

impl FieldPatterns {
    pub fn compile(schema: &SchemaModel) -> Result<Self> {
        let mut by_file: BTreeMap<String, BTreeMap<String, Regex>> = BTreeMap::new();
        for file in &schema.files {
            for field in &file.fields {
                let Some(pattern) = &field.pattern else {
                    continue;
                };
                let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                    ValidateError::Pattern {
                        filename: file.filename.clone(),
                        field: field.name.clone(),
                        source,
                    }
                })?;
                by_file
                    .entry(file.filename.clone())
                    .or_default()
                    .insert(field.name.clone(), regex);
            }
        }
        Ok(Self { by_file })
    }

    pub fn get(&self, filename: &str, field: &str) -> Option<&Regex> {
        self.by_file.get(filename).and_then(|fields| fields.get(field))
    }
}

/// Location of one raw value, for notices.
struct Cell<'r> {
    filename: &'r str,
    csv_row_number: u64,
    field_name: &'r str,
    raw: &'r str,
}

#[derive(Debug, Clone, Copy)]
enum FormatError {
    Integer,
    Float,
    Color,
    Date,
    Time,
    Coordinate,
    Url,
    Email,
    Enum,
}

impl Cell<'_> {
    fn format_notice(&self, kind: FormatError) -> Notice {
        let filename = self.filename.to_string();
        let csv_row_number = self.csv_row_number;
        let field_name = self.field_name.to_string();
        let field_value = self.raw.to_string();
        match kind {
            FormatError::Integer => Notice::InvalidInteger {
                filename,
                csv_row_number,
                field_name,
                field_value,
            },
            FormatError::Float => Notice::InvalidFloat {
                filename,
                csv_row_number,
                field_name,
                field_value,
            },
            FormatError::Color => Notice::InvalidColor {
                filename,
                csv_row_number,
                field_name,
                field_value,
            },
            FormatError::Date => Notice::InvalidDate {
                filename,
                csv_row_number,
                field_name,
                field_value,
            },
            FormatError::Time => Notice::InvalidTime {
                filename,
                csv_row_number,
                field_name,
                field_value,
            },
            FormatError::Coordinate => Notice::InvalidCoordinate {
                filename,
                csv_row_number,
                field_name,
                field_value,
            },
            FormatError::Url => Notice::InvalidUrl {
                filename,
                csv_row_number,
                field_name,
                field_value,
            },
            FormatError::Email => Notice::InvalidEmail {
                filename,
                csv_row_number,
                field_name,
                field_value,
            },
            FormatError::Enum => Notice::UnexpectedEnumValue {
                filename,
                csv_row_number,
                field_name,
                field_value,
            },
        }
    }
}

/// Parser for the rows of one file.
pub struct RowParser<'a> {
    file: &'a FileSpec,
    patterns: &'a FieldPatterns,
    columns: BTreeSet<String>,
}

impl<'a> RowParser<'a> {
    /// `actual_headers` is the file's header line; declared fields missing
    /// from it are treated as absent without per-row notices.
    pub fn new(file: &'a FileSpec, actual_headers: &[String], patterns: &'a FieldPatterns) -> Self {
        Self {
            file,
            patterns,
            columns: actual_headers.iter().cloned().collect(),
        }
    }

    /// Parse one row. Never fails; problems come back as notices.
    ///
    /// Notices carry the same entity id the store derives from the parsed
    /// key, so every notice about a row names it the same way.
    pub fn parse(&self, row: &RawRow) -> (ParsedEntity, Vec<Notice>) {
        let mut entity = ParsedEntity::new(&self.file.filename, row.csv_row_number);
        let mut notices = Vec::new();
        for field in &self.file.fields {
            let value = self.parse_field(field, row, &mut notices);
            entity.insert(field.name.clone(), value);
        }
        let entity_id = entity.key(&self.file.key).entity_id();
        for notice in &mut notices {
            stamp_entity_id(notice, &entity_id);
        }
        (entity, notices)
    }

    fn parse_field(
        &self,
        field: &FieldSpec,
        row: &RawRow,
        notices: &mut Vec<Notice>,
    ) -> FieldValue {
        if !self.columns.contains(&field.name) {
            return if field.required {
                FieldValue::MissingRequired
            } else {
                FieldValue::NotProvided
            };
        }

        let raw = row.get(&field.name).unwrap_or("");
        if raw.is_empty() {
            if !field.required {
                return FieldValue::NotProvided;
            }
            notices.push(Notice::MissingRequiredField {
                filename: self.file.filename.clone(),
                csv_row_number: row.csv_row_number,
                field_name: field.name.clone(),
                entity_id: String::new(),
            });
            return FieldValue::MissingRequired;
        }

        let cell = Cell {
            filename: &self.file.filename,
            csv_row_number: row.csv_row_number,
            field_name: &field.name,
            raw,
        };
        match self.coerce(field, &cell) {
            Ok(value) => FieldValue::Present(value),
            Err(notice) => {
                notices.push(notice);
                FieldValue::Invalid {
                    raw: raw.to_string(),
                }
            }
        }
    }

    fn coerce(&self, field: &FieldSpec, cell: &Cell<'_>) -> std::result::Result<TypedValue, Notice> {
        let raw = cell.raw;
        let value = match field.field_type {
            FieldType::Text | FieldType::Id => TypedValue::Text(raw.to_string()),
            FieldType::Integer => {
                let value = raw
                    .parse::<i64>()
                    .map_err(|_| cell.format_notice(FormatError::Integer))?;
                check_integer_range(field, value, cell)?;
                TypedValue::Integer(value)
            }
            FieldType::Float => {
                let value = parse_float(raw).ok_or_else(|| cell.format_notice(FormatError::Float))?;
                check_float_range(field, value, cell)?;
                TypedValue::Float(value)
            }
            FieldType::Latitude | FieldType::Longitude => {
                let limit = if field.field_type == FieldType::Latitude {
                    90.0
                } else {
                    180.0
                };
                let value = parse_float(raw)
                    .filter(|value| value.abs() <= limit)
                    .ok_or_else(|| cell.format_notice(FormatError::Coordinate))?;
                check_float_range(field, value, cell)?;
                TypedValue::Float(value)
            }
            FieldType::Color => GtfsColor::parse(raw)
                .map(TypedValue::Color)
                .ok_or_else(|| cell.format_notice(FormatError::Color))?,
            FieldType::Date => parse_gtfs_date(raw)
                .map(TypedValue::Date)
                .ok_or_else(|| cell.format_notice(FormatError::Date))?,
            FieldType::Time => GtfsTime::parse(raw)
                .map(TypedValue::Time)
                .ok_or_else(|| cell.format_notice(FormatError::Time))?,
            FieldType::Url => {
                if !is_valid_url(raw) {
                    return Err(cell.format_notice(FormatError::Url));
                }
                TypedValue::Text(raw.to_string())
            }
            FieldType::Email => {
                if !is_valid_email(raw) {
                    return Err(cell.format_notice(FormatError::Email));
                }
                TypedValue::Text(raw.to_string())
            }
            FieldType::Enum => raw
                .parse::<i64>()
                .ok()
                .filter(|value| field.values.contains(value))
                .map(TypedValue::Integer)
                .ok_or_else(|| cell.format_notice(FormatError::Enum))?,
        };

        if let Some(pattern) = self.patterns.get(&self.file.filename, &field.name)
            && !pattern.is_match(raw)
        {
            return Err(Notice::PatternMismatch {
                filename: cell.filename.to_string(),
                csv_row_number: cell.csv_row_number,
                field_name: cell.field_name.to_string(),
                field_value: raw.to_string(),
                pattern: field.pattern.clone().unwrap_or_default(),
            });
        }
        Ok(value)
    }
}

fn stamp_entity_id(notice: &mut Notice, id: &str) {
    match notice {
        Notice::MissingRequiredField { entity_id, .. }
        | Notice::IntegerFieldValueOutOfRange { entity_id, .. }
        | Notice::FloatFieldValueOutOfRange { entity_id, .. } => {
            id.clone_into(entity_id);
        }
        _ => {}
    }
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn check_integer_range(field: &FieldSpec, value: i64, cell: &Cell<'_>) -> std::result::Result<(), Notice> {
    let (min, max) = (field.integer_min(), field.integer_max());
    let below = min.is_some_and(|min| value < min);
    let above = max.is_some_and(|max| value > max);
    if below || above {
        return Err(Notice::IntegerFieldValueOutOfRange {
            filename: cell.filename.to_string(),
            csv_row_number: cell.csv_row_number,
            field_name: cell.field_name.to_string(),
            entity_id: String::new(),
            range_min: min,
            range_max: max,
            actual_value: value,
        });
    }
    Ok(())
}

fn check_float_range(field: &FieldSpec, value: f64, cell: &Cell<'_>) -> std::result::Result<(), Notice> {
    let below = field.min.is_some_and(|min| value < min);
    let above = field.max.is_some_and(|max| value > max);
    if below || above {
        return Err(Notice::FloatFieldValueOutOfRange {
            filename: cell.filename.to_string(),
            csv_row_number: cell.csv_row_number,
            field_name: cell.field_name.to_string(),
            entity_id: String::new(),
            range_min: field.min,
            range_max: field.max,
            actual_value: value,
        });
    }
    Ok(())
}

fn is_valid_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
}

fn is_valid_email(raw: &str) -> bool {
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !raw.chars().any(char::is_whitespace)
}
