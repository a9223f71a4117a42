//! Raw file access for the validator.
//!
//! A [`RawFileRepository`] hands the validator header lists and row
//! providers, one file at a time. The validator never touches the file system
//! itself.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecordsIntoIter};
use gtfs_model::RawRow;
use tracing::debug;

use crate::discovery::list_feed_files;
use crate::error::{IngestError, Result};

/// Stream of rows from one file. Errors cover single records; the stream
/// continues after them.
pub type RowProvider<'a> = Box<dyn Iterator<Item = Result<RawRow>> + Send + 'a>;

/// Port through which the validator reads a feed.
pub trait RawFileRepository: Send + Sync {
    /// Names of all files in the feed, sorted.
    fn filenames(&self) -> Vec<String>;

    /// Header columns of a file, in file order.
    fn actual_headers(&self, filename: &str) -> Result<Vec<String>>;

    /// Row provider for a file; `None` signals the file could not be opened.
    fn provider(&self, filename: &str) -> Option<RowProvider<'_>>;
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').trim().to_string()
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().to_string()
}

/// Feed stored as a directory of comma-separated `.txt` files.
#[derive(Debug, Clone)]
pub struct CsvFeedRepository {
    root: PathBuf,
    files: BTreeMap<String, PathBuf>,
}

impl CsvFeedRepository {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files = BTreeMap::new();
        for path in list_feed_files(dir)? {
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                files.insert(name.to_string(), path.clone());
            }
        }
        debug!(path = %dir.display(), file_count = files.len(), "feed directory opened");
        Ok(Self {
            root: dir.to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, filename: &str) -> Result<&PathBuf> {
        self.files
            .get(filename)
            .ok_or_else(|| IngestError::UnknownFile {
                filename: filename.to_string(),
            })
    }

    fn reader(&self, filename: &str) -> Result<csv::Reader<File>> {
        let path = self.path(filename)?;
        ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|source| IngestError::Csv {
                path: path.clone(),
                source,
            })
    }
}

impl RawFileRepository for CsvFeedRepository {
    fn filenames(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn actual_headers(&self, filename: &str) -> Result<Vec<String>> {
        let mut reader = self.reader(filename)?;
        let headers = reader.headers().map_err(|source| IngestError::Csv {
            path: self.root.join(filename),
            source,
        })?;
        Ok(headers.iter().map(normalize_header).collect())
    }

    fn provider(&self, filename: &str) -> Option<RowProvider<'_>> {
        let mut reader = self.reader(filename).ok()?;
        let headers: Vec<String> = reader.headers().ok()?.iter().map(normalize_header).collect();
        Some(Box::new(CsvRows {
            filename: filename.to_string(),
            headers,
            records: reader.into_records(),
            index: 0,
            finished: false,
        }))
    }
}

struct CsvRows {
    filename: String,
    headers: Vec<String>,
    records: StringRecordsIntoIter<File>,
    index: u64,
    finished: bool,
}

impl Iterator for CsvRows {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let record = self.records.next()?;
        self.index += 1;
        // Physical line where the record starts; blank lines and quoted line
        // breaks make it differ from the record count. Header is row 1.
        let position = match &record {
            Ok(record) => record.position(),
            Err(err) => err.position(),
        };
        let csv_row_number = position.map_or(self.index + 1, csv::Position::line);
        match record {
            Ok(record) => {
                let mut row = RawRow::new(self.filename.clone(), csv_row_number);
                for (header, value) in self.headers.iter().zip(record.iter()) {
                    row.push(header.clone(), normalize_cell(value));
                }
                Some(Ok(row))
            }
            Err(err) => {
                if err.is_io_error() {
                    self.finished = true;
                }
                Some(Err(IngestError::Record {
                    filename: self.filename.clone(),
                    csv_row_number,
                    message: err.to_string(),
                }))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryFile {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Feed held in memory; used by tests and by callers that already hold the
/// data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeedRepository {
    files: BTreeMap<String, MemoryFile>,
    unreadable: BTreeSet<String>,
}

impl InMemoryFeedRepository {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file<H, R>(mut self, filename: &str, headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = Vec<&'static str>>,
    {
        self.files.insert(
            filename.to_string(),
            MemoryFile {
                headers: headers.into_iter().map(Into::into).collect(),
                rows: rows
                    .into_iter()
                    .map(|row| row.into_iter().map(str::to_string).collect())
                    .collect(),
            },
        );
        self
    }

    /// Add a file from CSV text; the first line is the header.
    pub fn with_csv(mut self, filename: &str, text: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let csv_error = |source| IngestError::Csv {
            path: PathBuf::from(filename),
            source,
        };
        let headers = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(normalize_header)
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            rows.push(record.iter().map(normalize_cell).collect());
        }
        self.files
            .insert(filename.to_string(), MemoryFile { headers, rows });
        Ok(self)
    }

    /// Register a file that is listed in the feed but cannot be opened.
    #[must_use]
    pub fn with_unreadable(mut self, filename: &str) -> Self {
        self.unreadable.insert(filename.to_string());
        self
    }
}

impl RawFileRepository for InMemoryFeedRepository {
    fn filenames(&self) -> Vec<String> {
        self.files
            .keys()
            .chain(self.unreadable.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn actual_headers(&self, filename: &str) -> Result<Vec<String>> {
        match self.files.get(filename) {
            Some(file) if !self.unreadable.contains(filename) => Ok(file.headers.clone()),
            _ => Err(IngestError::UnknownFile {
                filename: filename.to_string(),
            }),
        }
    }

    fn provider(&self, filename: &str) -> Option<RowProvider<'_>> {
        if self.unreadable.contains(filename) {
            return None;
        }
        let file = self.files.get(filename)?;
        let filename = filename.to_string();
        let rows = file.rows.iter().enumerate().map(move |(index, values)| {
            let mut row = RawRow::new(filename.clone(), index as u64 + 2);
            for (header, value) in file.headers.iter().zip(values) {
                row.push(header.clone(), value.clone());
            }
            Ok(row)
        });
        Some(Box::new(rows))
    }
}
