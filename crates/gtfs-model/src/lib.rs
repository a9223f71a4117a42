pub mod entity;
pub mod error;
pub mod notice;
pub mod schema;
pub mod types;

pub use entity::{EntityKey, FieldValue, NO_ID, ParsedEntity, RawRow, TypedValue};
pub use error::{ModelError, Result};
pub use notice::{Notice, Severity};
pub use schema::{FieldReference, FieldSpec, FieldType, FileSpec, SchemaModel};
pub use types::{GtfsColor, GtfsTime, format_gtfs_date, parse_gtfs_date};
