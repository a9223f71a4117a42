//! Validation notices.
//!
//! Every finding of a validation run is a [`Notice`]. Each variant carries
//! only the context it needs; the code and severity are fixed per variant.
//! Serialized notices are flat objects with a snake_case `code` tag and
//! camelCase context keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Notice severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Notice {
    // Feed structure
    /// A required file is absent from the feed.
    MissingRequiredFile { filename: String },
    /// The feed contains a file the schema does not declare.
    UnknownFile { filename: String },
    /// The file is known but no data provider could be built for it.
    CannotConstructDataProvider { filename: String },
    /// A physical row could not be read.
    CsvParsingFailed {
        filename: String,
        csv_row_number: u64,
        message: String,
    },
    /// A required file has a header but no rows.
    EmptyFile { filename: String },

    // Headers
    MissingHeader {
        filename: String,
        header_name: String,
    },
    NonStandardHeader {
        filename: String,
        header_name: String,
    },

    // Field values
    MissingRequiredField {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        entity_id: String,
    },
    InvalidInteger {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        field_value: String,
    },
    InvalidFloat {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        field_value: String,
    },
    IntegerFieldValueOutOfRange {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        entity_id: String,
        range_min: Option<i64>,
        range_max: Option<i64>,
        actual_value: i64,
    },
    FloatFieldValueOutOfRange {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        entity_id: String,
        range_min: Option<f64>,
        range_max: Option<f64>,
        actual_value: f64,
    },
    InvalidColor {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        field_value: String,
    },
    InvalidDate {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        field_value: String,
    },
    InvalidTime {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        field_value: String,
    },
    InvalidCoordinate {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        field_value: String,
    },
    InvalidUrl {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        field_value: String,
    },
    InvalidEmail {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        field_value: String,
    },
    UnexpectedEnumValue {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        field_value: String,
    },
    PatternMismatch {
        filename: String,
        csv_row_number: u64,
        field_name: String,
        field_value: String,
        pattern: String,
    },

    // Cross-entity
    DuplicateKey {
        filename: String,
        csv_row_number: u64,
        entity_id: String,
        previous_csv_row_number: u64,
    },
    ForeignKeyViolation {
        child_filename: String,
        child_field_name: String,
        parent_filename: String,
        parent_field_name: String,
        field_value: String,
        csv_row_number: u64,
    },

    // Feed info
    MissingFeedEndDate {
        filename: String,
        csv_row_number: u64,
        feed_publisher_name: String,
    },
    FeedInfoExpiresInLessThan30Days {
        filename: String,
        field_name: String,
        feed_publisher_name: String,
        feed_end_date: String,
        current_date: String,
    },
    FeedInfoExpiresInLessThan7Days {
        filename: String,
        field_name: String,
        feed_publisher_name: String,
        feed_end_date: String,
        current_date: String,
    },

    // Trips and shapes
    TooFastTravel {
        trip_id: String,
        speed_kmh: f64,
        first_stop_sequence: i64,
        last_stop_sequence: i64,
    },
    StopTooFarFromTripShape {
        stop_id: String,
        stop_sequence: i64,
        trip_id: String,
        shape_id: String,
        stop_shape_threshold_meters: f64,
    },

    // Engine
    /// A rule panicked; its partial output was discarded.
    RuntimeExceptionInValidator { validator: String, message: String },
}

impl Notice {
    /// Stable snake_case identifier, identical to the serialized `code` tag.
    pub fn code(&self) -> &'static str {
        match self {
            Notice::MissingRequiredFile { .. } => "missing_required_file",
            Notice::UnknownFile { .. } => "unknown_file",
            Notice::CannotConstructDataProvider { .. } => "cannot_construct_data_provider",
            Notice::CsvParsingFailed { .. } => "csv_parsing_failed",
            Notice::EmptyFile { .. } => "empty_file",
            Notice::MissingHeader { .. } => "missing_header",
            Notice::NonStandardHeader { .. } => "non_standard_header",
            Notice::MissingRequiredField { .. } => "missing_required_field",
            Notice::InvalidInteger { .. } => "invalid_integer",
            Notice::InvalidFloat { .. } => "invalid_float",
            Notice::IntegerFieldValueOutOfRange { .. } => "integer_field_value_out_of_range",
            Notice::FloatFieldValueOutOfRange { .. } => "float_field_value_out_of_range",
            Notice::InvalidColor { .. } => "invalid_color",
            Notice::InvalidDate { .. } => "invalid_date",
            Notice::InvalidTime { .. } => "invalid_time",
            Notice::InvalidCoordinate { .. } => "invalid_coordinate",
            Notice::InvalidUrl { .. } => "invalid_url",
            Notice::InvalidEmail { .. } => "invalid_email",
            Notice::UnexpectedEnumValue { .. } => "unexpected_enum_value",
            Notice::PatternMismatch { .. } => "pattern_mismatch",
            Notice::DuplicateKey { .. } => "duplicate_key",
            Notice::ForeignKeyViolation { .. } => "foreign_key_violation",
            Notice::MissingFeedEndDate { .. } => "missing_feed_end_date",
            Notice::FeedInfoExpiresInLessThan30Days { .. } => {
                "feed_info_expires_in_less_than30_days"
            }
            Notice::FeedInfoExpiresInLessThan7Days { .. } => "feed_info_expires_in_less_than7_days",
            Notice::TooFastTravel { .. } => "too_fast_travel",
            Notice::StopTooFarFromTripShape { .. } => "stop_too_far_from_trip_shape",
            Notice::RuntimeExceptionInValidator { .. } => "runtime_exception_in_validator",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Notice::UnknownFile { .. } => Severity::Info,
            Notice::EmptyFile { .. }
            | Notice::NonStandardHeader { .. }
            | Notice::MissingFeedEndDate { .. }
            | Notice::FeedInfoExpiresInLessThan30Days { .. }
            | Notice::TooFastTravel { .. }
            | Notice::StopTooFarFromTripShape { .. } => Severity::Warning,
            Notice::MissingRequiredFile { .. }
            | Notice::CannotConstructDataProvider { .. }
            | Notice::CsvParsingFailed { .. }
            | Notice::MissingHeader { .. }
            | Notice::MissingRequiredField { .. }
            | Notice::InvalidInteger { .. }
            | Notice::InvalidFloat { .. }
            | Notice::IntegerFieldValueOutOfRange { .. }
            | Notice::FloatFieldValueOutOfRange { .. }
            | Notice::InvalidColor { .. }
            | Notice::InvalidDate { .. }
            | Notice::InvalidTime { .. }
            | Notice::InvalidCoordinate { .. }
            | Notice::InvalidUrl { .. }
            | Notice::InvalidEmail { .. }
            | Notice::UnexpectedEnumValue { .. }
            | Notice::PatternMismatch { .. }
            | Notice::DuplicateKey { .. }
            | Notice::ForeignKeyViolation { .. }
            | Notice::FeedInfoExpiresInLessThan7Days { .. }
            | Notice::RuntimeExceptionInValidator { .. } => Severity::Error,
        }
    }

    /// File the notice is about, when it is about a single file.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Notice::MissingRequiredFile { filename }
            | Notice::UnknownFile { filename }
            | Notice::CannotConstructDataProvider { filename }
            | Notice::EmptyFile { filename }
            | Notice::CsvParsingFailed { filename, .. }
            | Notice::MissingHeader { filename, .. }
            | Notice::NonStandardHeader { filename, .. }
            | Notice::MissingRequiredField { filename, .. }
            | Notice::InvalidInteger { filename, .. }
            | Notice::InvalidFloat { filename, .. }
            | Notice::IntegerFieldValueOutOfRange { filename, .. }
            | Notice::FloatFieldValueOutOfRange { filename, .. }
            | Notice::InvalidColor { filename, .. }
            | Notice::InvalidDate { filename, .. }
            | Notice::InvalidTime { filename, .. }
            | Notice::InvalidCoordinate { filename, .. }
            | Notice::InvalidUrl { filename, .. }
            | Notice::InvalidEmail { filename, .. }
            | Notice::UnexpectedEnumValue { filename, .. }
            | Notice::PatternMismatch { filename, .. }
            | Notice::DuplicateKey { filename, .. }
            | Notice::MissingFeedEndDate { filename, .. }
            | Notice::FeedInfoExpiresInLessThan30Days { filename, .. }
            | Notice::FeedInfoExpiresInLessThan7Days { filename, .. } => Some(filename),
            Notice::ForeignKeyViolation { child_filename, .. } => Some(child_filename),
            Notice::TooFastTravel { .. } => Some("stop_times.txt"),
            Notice::StopTooFarFromTripShape { .. } => Some("stop_times.txt"),
            Notice::RuntimeExceptionInValidator { .. } => None,
        }
    }

    /// Row the notice points at, if any.
    pub fn csv_row_number(&self) -> Option<u64> {
        match self {
            Notice::CsvParsingFailed { csv_row_number, .. }
            | Notice::MissingRequiredField { csv_row_number, .. }
            | Notice::InvalidInteger { csv_row_number, .. }
            | Notice::InvalidFloat { csv_row_number, .. }
            | Notice::IntegerFieldValueOutOfRange { csv_row_number, .. }
            | Notice::FloatFieldValueOutOfRange { csv_row_number, .. }
            | Notice::InvalidColor { csv_row_number, .. }
            | Notice::InvalidDate { csv_row_number, .. }
            | Notice::InvalidTime { csv_row_number, .. }
            | Notice::InvalidCoordinate { csv_row_number, .. }
            | Notice::InvalidUrl { csv_row_number, .. }
            | Notice::InvalidEmail { csv_row_number, .. }
            | Notice::UnexpectedEnumValue { csv_row_number, .. }
            | Notice::PatternMismatch { csv_row_number, .. }
            | Notice::DuplicateKey { csv_row_number, .. }
            | Notice::ForeignKeyViolation { csv_row_number, .. }
            | Notice::MissingFeedEndDate { csv_row_number, .. } => Some(*csv_row_number),
            _ => None,
        }
    }

    /// Human-readable one-line description.
    pub fn message(&self) -> String {
        match self {
            Notice::MissingRequiredFile { filename } => {
                format!("Required file {filename} is missing")
            }
            Notice::UnknownFile { filename } => {
                format!("File {filename} is not part of the schema and was ignored")
            }
            Notice::CannotConstructDataProvider { filename } => {
                format!("Could not open a data provider for {filename}")
            }
            Notice::CsvParsingFailed {
                filename,
                csv_row_number,
                message,
            } => format!("Row {csv_row_number} of {filename} could not be read: {message}"),
            Notice::EmptyFile { filename } => format!("Required file {filename} has no rows"),
            Notice::MissingHeader {
                filename,
                header_name,
            } => format!("Required column {header_name} is missing from {filename}"),
            Notice::NonStandardHeader {
                filename,
                header_name,
            } => format!("Column {header_name} in {filename} is not declared by the schema"),
            Notice::MissingRequiredField {
                field_name,
                entity_id,
                ..
            } => format!("Required field {field_name} is empty for {entity_id}"),
            Notice::InvalidInteger {
                field_name,
                field_value,
                ..
            } => format!("Value '{field_value}' of {field_name} is not an integer"),
            Notice::InvalidFloat {
                field_name,
                field_value,
                ..
            } => format!("Value '{field_value}' of {field_name} is not a number"),
            Notice::IntegerFieldValueOutOfRange {
                field_name,
                range_min,
                range_max,
                actual_value,
                ..
            } => format!(
                "Value {actual_value} of {field_name} is outside [{}, {}]",
                bound_label(*range_min),
                bound_label(*range_max)
            ),
            Notice::FloatFieldValueOutOfRange {
                field_name,
                range_min,
                range_max,
                actual_value,
                ..
            } => format!(
                "Value {actual_value} of {field_name} is outside [{}, {}]",
                bound_label(*range_min),
                bound_label(*range_max)
            ),
            Notice::InvalidColor {
                field_name,
                field_value,
                ..
            } => format!("Value '{field_value}' of {field_name} is not a six-digit hex color"),
            Notice::InvalidDate {
                field_name,
                field_value,
                ..
            } => format!("Value '{field_value}' of {field_name} is not a YYYYMMDD date"),
            Notice::InvalidTime {
                field_name,
                field_value,
                ..
            } => format!("Value '{field_value}' of {field_name} is not an HH:MM:SS time"),
            Notice::InvalidCoordinate {
                field_name,
                field_value,
                ..
            } => format!("Value '{field_value}' of {field_name} is not a valid coordinate"),
            Notice::InvalidUrl {
                field_name,
                field_value,
                ..
            } => format!("Value '{field_value}' of {field_name} is not a valid URL"),
            Notice::InvalidEmail {
                field_name,
                field_value,
                ..
            } => format!("Value '{field_value}' of {field_name} is not a valid email address"),
            Notice::UnexpectedEnumValue {
                field_name,
                field_value,
                ..
            } => format!("Value '{field_value}' of {field_name} is not an allowed value"),
            Notice::PatternMismatch {
                field_name,
                field_value,
                pattern,
                ..
            } => format!("Value '{field_value}' of {field_name} does not match {pattern}"),
            Notice::DuplicateKey {
                filename,
                csv_row_number,
                entity_id,
                previous_csv_row_number,
            } => format!(
                "Key {entity_id} in {filename} row {csv_row_number} duplicates row {previous_csv_row_number}"
            ),
            Notice::ForeignKeyViolation {
                child_filename,
                child_field_name,
                parent_filename,
                parent_field_name,
                field_value,
                ..
            } => format!(
                "{child_filename}.{child_field_name} '{field_value}' has no match in {parent_filename}.{parent_field_name}"
            ),
            Notice::MissingFeedEndDate {
                feed_publisher_name,
                ..
            } => format!("Feed from {feed_publisher_name} has a start date but no end date"),
            Notice::FeedInfoExpiresInLessThan30Days {
                feed_end_date,
                current_date,
                ..
            } => format!(
                "Feed ends on {feed_end_date}, less than 30 days after {current_date}"
            ),
            Notice::FeedInfoExpiresInLessThan7Days {
                feed_end_date,
                current_date,
                ..
            } => format!("Feed ends on {feed_end_date}, within 7 days of {current_date}"),
            Notice::TooFastTravel {
                trip_id,
                speed_kmh,
                first_stop_sequence,
                last_stop_sequence,
            } => format!(
                "Trip {trip_id} travels at {speed_kmh:.1} km/h between stop sequences {first_stop_sequence} and {last_stop_sequence}"
            ),
            Notice::StopTooFarFromTripShape {
                stop_id,
                trip_id,
                shape_id,
                stop_shape_threshold_meters,
                ..
            } => format!(
                "Stop {stop_id} of trip {trip_id} is more than {stop_shape_threshold_meters} m from shape {shape_id}"
            ),
            Notice::RuntimeExceptionInValidator { validator, message } => {
                format!("Rule {validator} failed: {message}")
            }
        }
    }

    /// Context values keyed by their serialized (camelCase) names.
    pub fn context(&self) -> BTreeMap<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.into_iter().filter(|(key, _)| key != "code").collect(),
            _ => BTreeMap::new(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code(), self.message())
    }
}

fn bound_label<T: fmt::Display>(bound: Option<T>) -> String {
    bound.map_or_else(|| "-".to_string(), |value| value.to_string())
}
