//! Rows before and after typed parsing.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{GtfsColor, GtfsTime, format_gtfs_date};

/// Entity id used in notices when a row has no usable key.
pub const NO_ID: &str = "no id";

/// One physical row as delivered by a data provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub filename: String,
    /// 1-based position in the file, the header being row 1.
    pub csv_row_number: u64,
    values: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(filename: impl Into<String>, csv_row_number: u64) -> Self {
        Self {
            filename: filename.into(),
            csv_row_number,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values.push((column.into(), value.into()));
    }

    /// Raw value for a column. The first occurrence wins for repeated headers.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }
}

/// A successfully coerced field value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Color(GtfsColor),
    Date(NaiveDate),
    Time(GtfsTime),
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Text(value) => f.write_str(value),
            TypedValue::Integer(value) => write!(f, "{value}"),
            TypedValue::Float(value) => write!(f, "{value}"),
            TypedValue::Color(value) => write!(f, "{value}"),
            TypedValue::Date(value) => f.write_str(&format_gtfs_date(*value)),
            TypedValue::Time(value) => write!(f, "{value}"),
        }
    }
}

/// State of one declared field after parsing.
///
/// Absence is always explicit: an optional column left empty and a value
/// that failed coercion are different states and rules can tell them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Present(TypedValue),
    /// Optional field left empty or column not in the file.
    NotProvided,
    /// Required field left empty. A notice was recorded at parse time.
    MissingRequired,
    /// Value could not be coerced or violated a constraint. A notice was
    /// recorded at parse time.
    Invalid { raw: String },
}

impl FieldValue {
    pub fn as_typed(&self) -> Option<&TypedValue> {
        match self {
            FieldValue::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, FieldValue::Present(_))
    }

    /// True for values marked absent because of an error.
    pub fn is_error(&self) -> bool {
        matches!(self, FieldValue::MissingRequired | FieldValue::Invalid { .. })
    }
}

/// Identity of an entity within its file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKey {
    /// Files without a natural key are indexed by row number.
    Row(u64),
    /// Natural key values in declaration order.
    Fields(Vec<String>),
}

impl EntityKey {
    pub fn single(value: impl Into<String>) -> Self {
        EntityKey::Fields(vec![value.into()])
    }

    pub fn composite<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EntityKey::Fields(values.into_iter().map(Into::into).collect())
    }

    /// Text used as `entityId` in notices.
    pub fn entity_id(&self) -> String {
        match self {
            EntityKey::Row(_) => NO_ID.to_string(),
            EntityKey::Fields(values) if values.iter().all(String::is_empty) => NO_ID.to_string(),
            EntityKey::Fields(values) => values.join(":"),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Row(row) => write!(f, "row {row}"),
            EntityKey::Fields(values) => f.write_str(&values.join(":")),
        }
    }
}

/// Typed record produced from a [`RawRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntity {
    pub filename: String,
    pub csv_row_number: u64,
    fields: BTreeMap<String, FieldValue>,
}

impl ParsedEntity {
    pub fn new(filename: impl Into<String>, csv_row_number: u64) -> Self {
        Self {
            filename: filename.into(),
            csv_row_number,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Shorthand for tests and builders: a present value.
    #[must_use]
    pub fn with(self, name: impl Into<String>, value: TypedValue) -> Self {
        self.with_value(name, FieldValue::Present(value))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Field state, or `None` when the field was never declared.
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn typed(&self, name: &str) -> Option<&TypedValue> {
        self.value(name).and_then(FieldValue::as_typed)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.typed(name)? {
            TypedValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.typed(name)? {
            TypedValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Float value; integers widen.
    pub fn float(&self, name: &str) -> Option<f64> {
        match self.typed(name)? {
            TypedValue::Float(value) => Some(*value),
            TypedValue::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.typed(name)? {
            TypedValue::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn time(&self, name: &str) -> Option<GtfsTime> {
        match self.typed(name)? {
            TypedValue::Time(value) => Some(*value),
            _ => None,
        }
    }

    pub fn color(&self, name: &str) -> Option<GtfsColor> {
        match self.typed(name)? {
            TypedValue::Color(value) => Some(*value),
            _ => None,
        }
    }

    /// Display text of a present value, used for id matching.
    pub fn display(&self, name: &str) -> Option<String> {
        self.typed(name).map(ToString::to_string)
    }

    /// Key under `key_fields`.
    ///
    /// Falls back to the row number when the list is empty or when a key
    /// component is missing or invalid, so such rows never collide. Optional
    /// components left empty contribute an empty string.
    pub fn key(&self, key_fields: &[String]) -> EntityKey {
        let unusable = key_fields
            .iter()
            .any(|field| self.value(field).is_some_and(FieldValue::is_error));
        if key_fields.is_empty() || unusable {
            return EntityKey::Row(self.csv_row_number);
        }
        EntityKey::Fields(
            key_fields
                .iter()
                .map(|field| self.display(field).unwrap_or_default())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_row_first_occurrence_wins() {
        let row = RawRow::new("stops.txt", 2)
            .with_value("stop_id", "S1")
            .with_value("stop_id", "S2");
        assert_eq!(row.get("stop_id"), Some("S1"));
        assert_eq!(row.get("stop_name"), None);
    }

    #[test]
    fn key_falls_back_to_row_number() {
        let entity = ParsedEntity::new("feed_info.txt", 2)
            .with("feed_publisher_name", TypedValue::Text("Agency".into()));
        assert_eq!(entity.key(&[]), EntityKey::Row(2));
        assert_eq!(entity.key(&[]).entity_id(), NO_ID);
    }

    #[test]
    fn composite_key_uses_display_text() {
        let entity = ParsedEntity::new("stop_times.txt", 5)
            .with("trip_id", TypedValue::Text("T1".into()))
            .with("stop_sequence", TypedValue::Integer(3))
            .with_value("stop_id", FieldValue::Invalid { raw: "?".into() });
        let key = entity.key(&["trip_id".to_string(), "stop_sequence".to_string()]);
        assert_eq!(key, EntityKey::composite(["T1", "3"]));
        assert_eq!(key.entity_id(), "T1:3");
        assert!(entity.value("stop_id").is_some_and(FieldValue::is_error));
        assert_eq!(entity.text("stop_id"), None);
    }

    #[test]
    fn unusable_key_component_keys_by_row() {
        let key_fields = ["trip_id".to_string(), "stop_sequence".to_string()];
        let invalid = ParsedEntity::new("stop_times.txt", 4)
            .with("trip_id", TypedValue::Text("T1".into()))
            .with_value("stop_sequence", FieldValue::Invalid { raw: "x".into() });
        assert_eq!(invalid.key(&key_fields), EntityKey::Row(4));
        assert_eq!(invalid.key(&key_fields).entity_id(), NO_ID);

        let missing =
            ParsedEntity::new("stops.txt", 7).with_value("stop_id", FieldValue::MissingRequired);
        assert_eq!(missing.key(&["stop_id".to_string()]), EntityKey::Row(7));
    }
}
