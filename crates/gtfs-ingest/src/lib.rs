pub mod discovery;
pub mod error;
pub mod repository;

pub use discovery::list_feed_files;
pub use error::{IngestError, Result};
pub use repository::{CsvFeedRepository, InMemoryFeedRepository, RawFileRepository, RowProvider};
