//! Declarative description of the files and columns a feed is checked against.
//!
//! A [`SchemaModel`] is built once from a schema document and stays read-only
//! for the rest of a validation run. It carries no behavior beyond lookup and
//! the ordering implied by the file dependency graph.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Free text.
    Text,
    /// Identifier, optionally referencing another file.
    Id,
    Integer,
    Float,
    /// Six hexadecimal digits, no leading `#`.
    Color,
    /// `YYYYMMDD`.
    Date,
    /// `H:MM:SS` or `HH:MM:SS`; hours may exceed 23.
    Time,
    Latitude,
    Longitude,
    Url,
    Email,
    /// Integer restricted to the values listed on the field.
    Enum,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Id => "id",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Color => "color",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Latitude => "latitude",
            FieldType::Longitude => "longitude",
            FieldType::Url => "url",
            FieldType::Email => "email",
            FieldType::Enum => "enum",
        }
    }

    /// Returns true for types whose `min`/`max` bounds are meaningful.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Float | FieldType::Latitude | FieldType::Longitude
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(FieldType::Text),
            "id" | "id_reference" => Ok(FieldType::Id),
            "integer" | "int" => Ok(FieldType::Integer),
            "float" | "decimal" => Ok(FieldType::Float),
            "color" => Ok(FieldType::Color),
            "date" => Ok(FieldType::Date),
            "time" => Ok(FieldType::Time),
            "latitude" => Ok(FieldType::Latitude),
            "longitude" => Ok(FieldType::Longitude),
            "url" => Ok(FieldType::Url),
            "email" => Ok(FieldType::Email),
            "enum" => Ok(FieldType::Enum),
            _ => Err(format!("Unknown field type: {s}")),
        }
    }
}

/// Target of an id-reference column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldReference {
    pub file: String,
    pub field: String,
}

/// One column declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Inclusive lower bound for numeric types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Regular expression the whole raw value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed values for [`FieldType::Enum`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<FieldReference>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            required: false,
            field_type,
            min: None,
            max: None,
            pattern: None,
            values: Vec::new(),
            references: None,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    #[must_use]
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    #[must_use]
    pub fn with_range(self, min: f64, max: f64) -> Self {
        self.with_min(min).with_max(max)
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn with_values(mut self, values: impl IntoIterator<Item = i64>) -> Self {
        self.values = values.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_reference(mut self, file: impl Into<String>, field: impl Into<String>) -> Self {
        self.references = Some(FieldReference {
            file: file.into(),
            field: field.into(),
        });
        self
    }

    /// Lower bound as an integer (rounded up so the bound stays inclusive).
    pub fn integer_min(&self) -> Option<i64> {
        self.min.map(|value| value.ceil() as i64)
    }

    /// Upper bound as an integer (rounded down so the bound stays inclusive).
    pub fn integer_max(&self) -> Option<i64> {
        self.max.map(|value| value.floor() as i64)
    }
}

/// One file declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSpec {
    pub filename: String,
    #[serde(default)]
    pub required: bool,
    pub fields: Vec<FieldSpec>,
    /// Fields composing the natural key. Empty means rows are keyed by
    /// their row number.
    #[serde(default)]
    pub key: Vec<String>,
    /// Files whose entities this file refers to.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl FileSpec {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            required: false,
            fields: Vec::new(),
            key: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_key<I, S>(mut self, key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key = key.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, filename: impl Into<String>) -> Self {
        self.depends_on.push(filename.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn required_headers(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name.as_str())
            .collect()
    }

    pub fn optional_headers(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| !field.required)
            .map(|field| field.name.as_str())
            .collect()
    }

    /// Returns true if the column is declared, required or optional.
    pub fn declares(&self, header: &str) -> bool {
        self.field(header).is_some()
    }

    pub fn is_keyed(&self) -> bool {
        !self.key.is_empty()
    }
}

/// The full set of file declarations for a feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub files: Vec<FileSpec>,
}

impl SchemaModel {
    pub fn new(files: Vec<FileSpec>) -> Self {
        Self {
            name: None,
            version: None,
            files,
        }
    }

    pub fn file(&self, filename: &str) -> Option<&FileSpec> {
        self.files.iter().find(|file| file.filename == filename)
    }

    pub fn required_filenames(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|file| file.required)
            .map(|file| file.filename.as_str())
            .collect()
    }

    pub fn optional_filenames(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|file| !file.required)
            .map(|file| file.filename.as_str())
            .collect()
    }

    /// Required columns of a file; empty for files the schema does not know.
    pub fn required_headers_for_file(&self, filename: &str) -> Vec<&str> {
        self.file(filename)
            .map(FileSpec::required_headers)
            .unwrap_or_default()
    }

    pub fn optional_headers_for_file(&self, filename: &str) -> Vec<&str> {
        self.file(filename)
            .map(FileSpec::optional_headers)
            .unwrap_or_default()
    }

    /// The given files plus everything they transitively depend on.
    ///
    /// Names the schema does not declare are kept as-is, so callers can still
    /// check them against the set of loaded files.
    pub fn dependency_closure<I, S>(&self, filenames: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut closure = BTreeSet::new();
        let mut pending: Vec<String> = filenames
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect();
        while let Some(name) = pending.pop() {
            if !closure.insert(name.clone()) {
                continue;
            }
            if let Some(file) = self.file(&name) {
                pending.extend(file.depends_on.iter().cloned());
            }
        }
        closure
    }

    /// Files ordered so that every file follows the files it depends on.
    ///
    /// Ties keep declaration order, so the result is stable across runs.
    pub fn dependency_order(&self) -> Result<Vec<&FileSpec>> {
        let declared: BTreeMap<&str, &FileSpec> = self
            .files
            .iter()
            .map(|file| (file.filename.as_str(), file))
            .collect();
        for file in &self.files {
            for dependency in &file.depends_on {
                if !declared.contains_key(dependency.as_str()) {
                    return Err(ModelError::UnknownDependency {
                        file: file.filename.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let mut emitted: BTreeSet<&str> = BTreeSet::new();
        let mut ordered = Vec::with_capacity(self.files.len());
        while ordered.len() < self.files.len() {
            let next = self.files.iter().find(|file| {
                !emitted.contains(file.filename.as_str())
                    && file
                        .depends_on
                        .iter()
                        .all(|dependency| emitted.contains(dependency.as_str()))
            });
            let Some(file) = next else {
                let files = self
                    .files
                    .iter()
                    .filter(|file| !emitted.contains(file.filename.as_str()))
                    .map(|file| file.filename.clone())
                    .collect();
                return Err(ModelError::DependencyCycle { files });
            };
            emitted.insert(file.filename.as_str());
            ordered.push(file);
        }
        Ok(ordered)
    }
}
