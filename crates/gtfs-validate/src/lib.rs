//! GTFS feed validation core.
//!
//! Headers and rows are checked against a [`gtfs_model::SchemaModel`], parsed
//! rows land in a [`GtfsDataRepository`], and semantic rules then run over the
//! populated store. Every finding is a [`gtfs_model::Notice`] delivered to a
//! [`NoticeSink`].

pub mod engine;
pub mod error;
pub mod geo;
pub mod header;
pub mod notices;
pub mod options;
pub mod parser;
pub mod pipeline;
mod rules;
pub mod store;

pub use engine::{RuleContext, RuleEngine, RuleFn, RuleRegistry, RuleRunSummary, RuleUnit};
pub use error::{Result, ValidateError};
pub use header::validate_headers;
pub use notices::{InMemoryNoticeRepository, NoticeSink};
pub use options::ValidationOptions;
pub use parser::{FieldPatterns, RowParser};
pub use pipeline::{FeedValidator, FileStats, RunSummary, ValidationOutcome};
pub use store::{DisplacedEntity, GtfsDataRepository, InMemoryGtfsDataRepository};
