#![deny(unsafe_code)]

pub mod doctor;
pub mod error;
pub mod hash;
pub mod parser;
pub mod paths;
pub mod registry;
pub mod verify;

pub use crate::doctor::DoctorReport;
pub use crate::error::{Result, SchemaError};
pub use crate::parser::{JsonSchemaParser, SchemaParser, TomlSchemaParser, parser_for_path};
pub use crate::paths::{SCHEMA_ENV_VAR, SchemaLocation, resolve_schema_location};
pub use crate::registry::{BUNDLED_SCHEMA, SchemaRegistry, VerifySummary};
pub use crate::verify::verify_schema;
