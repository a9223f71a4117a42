//! Feed validation orchestrator.
//!
//! Order of work for one run:
//! 1. File presence against the schema.
//! 2. Per file: header check, then rows parsed into the entity store. Files
//!    are parsed concurrently; their notices are appended in dependency order
//!    once every file is done.
//! 3. Rule phase over the now read-only store.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Instant;

use gtfs_ingest::{CsvFeedRepository, IngestError, RawFileRepository};
use gtfs_model::{FileSpec, Notice, SchemaModel, Severity};
use gtfs_standards::SchemaRegistry;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::engine::{RuleContext, RuleEngine, RuleRegistry, RuleRunSummary};
use crate::error::Result;
use crate::header::validate_headers;
use crate::notices::{InMemoryNoticeRepository, NoticeSink};
use crate::options::ValidationOptions;
use crate::parser::{FieldPatterns, RowParser};
use crate::store::{GtfsDataRepository, InMemoryGtfsDataRepository};

/// Per-file parse statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
    pub filename: String,
    /// Data rows decoded from the file.
    pub rows: usize,
    /// Entities held by the store after duplicates were resolved.
    pub entities: usize,
    pub notices: usize,
    /// `false` when no row provider could be constructed.
    pub loaded: bool,
}

/// What happened during a run, apart from the notices themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files: Vec<FileStats>,
    pub rules: RuleRunSummary,
}

/// Result of validating one feed.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    notices: Vec<Notice>,
    pub summary: RunSummary,
}

impl ValidationOutcome {
    /// Notices in emission order.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn into_notices(self) -> Vec<Notice> {
        self.notices
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<&Notice> {
        self.notices
            .iter()
            .filter(|notice| notice.severity() == severity)
            .collect()
    }

    /// Notices grouped by code, codes sorted.
    pub fn by_code(&self) -> BTreeMap<&'static str, Vec<&Notice>> {
        let mut groups: BTreeMap<&'static str, Vec<&Notice>> = BTreeMap::new();
        for notice in &self.notices {
            groups.entry(notice.code()).or_default().push(notice);
        }
        groups
    }

    pub fn counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for notice in &self.notices {
            *counts.entry(notice.severity()).or_insert(0) += 1;
        }
        counts
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.counts().get(&severity).copied().unwrap_or(0)
    }

    pub fn has_errors(&self) -> bool {
        self.notices
            .iter()
            .any(|notice| notice.severity() == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

struct FileRun {
    stats: FileStats,
    notices: Vec<Notice>,
}

/// Validates feeds against one schema.
#[derive(Debug, Clone)]
pub struct FeedValidator {
    schema: SchemaModel,
    options: ValidationOptions,
    patterns: FieldPatterns,
    parse_order: Vec<String>,
    engine: RuleEngine,
}

impl FeedValidator {
    pub fn new(schema: SchemaModel, options: ValidationOptions) -> Result<Self> {
        let patterns = FieldPatterns::compile(&schema)?;
        let parse_order = schema
            .dependency_order()?
            .into_iter()
            .map(|file| file.filename.clone())
            .collect();
        Ok(Self {
            schema,
            options,
            patterns,
            parse_order,
            engine: RuleEngine::new(RuleRegistry::default_rules()),
        })
    }

    /// Validator over the schema shipped with the crate.
    pub fn with_bundled_schema(options: ValidationOptions) -> Result<Self> {
        let (registry, _) = SchemaRegistry::bundled()?;
        Self::new(registry.schema, options)
    }

    #[must_use]
    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.engine = RuleEngine::new(registry);
        self
    }

    pub fn schema(&self) -> &SchemaModel {
        &self.schema
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub fn rules(&self) -> &RuleRegistry {
        self.engine.registry()
    }

    /// Validate a feed directory of CSV files.
    pub fn validate_directory(&self, dir: &Path) -> Result<ValidationOutcome> {
        let feed = CsvFeedRepository::open(dir)?;
        Ok(self.validate(&feed))
    }

    pub fn validate(&self, feed: &dyn RawFileRepository) -> ValidationOutcome {
        let sink = InMemoryNoticeRepository::new();
        let summary = self.validate_into(feed, &sink);
        ValidationOutcome {
            notices: sink.notices(),
            summary,
        }
    }

    /// Run the full pipeline, sending every notice to `sink`.
    pub fn validate_into(&self, feed: &dyn RawFileRepository, sink: &dyn NoticeSink) -> RunSummary {
        let span = info_span!(
            "validate",
            schema = self.schema.name.as_deref().unwrap_or("unnamed")
        );
        let _guard = span.enter();
        let start = Instant::now();

        let present: BTreeSet<String> = feed.filenames().into_iter().collect();
        sink.add_notices(self.file_presence(&present));

        let store = InMemoryGtfsDataRepository::new(&self.schema);
        let files: Vec<&FileSpec> = self
            .parse_order
            .iter()
            .filter(|filename| present.contains(*filename))
            .filter_map(|filename| self.schema.file(filename))
            .collect();

        let parse_start = Instant::now();
        let runs: Vec<FileRun> = if self.options.parallel && files.len() > 1 {
            std::thread::scope(|scope| {
                let store = &store;
                let handles: Vec<_> = files
                    .iter()
                    .map(|file| scope.spawn(move || self.parse_file(file, feed, store)))
                    .collect();
                handles
                    .into_iter()
                    .zip(&files)
                    .map(|(handle, file)| {
                        handle.join().unwrap_or_else(|_| FileRun {
                            stats: FileStats {
                                filename: file.filename.clone(),
                                ..FileStats::default()
                            },
                            notices: vec![Notice::RuntimeExceptionInValidator {
                                validator: format!("parser:{}", file.filename),
                                message: "file parsing panicked".to_string(),
                            }],
                        })
                    })
                    .collect()
            })
        } else {
            files
                .iter()
                .map(|file| self.parse_file(file, feed, &store))
                .collect()
        };
        debug!(
            file_count = runs.len(),
            duration_ms = parse_start.elapsed().as_millis(),
            "parse phase complete"
        );

        let mut summary = RunSummary::default();
        for run in runs {
            sink.add_notices(run.notices);
            summary.files.push(run.stats);
        }

        let ctx = RuleContext::new(&store, &self.schema, &self.options);
        summary.rules = self.engine.execute(&ctx, sink);

        info!(
            files = summary.files.len(),
            rules_executed = summary.rules.executed.len(),
            rules_skipped = summary.rules.skipped.len(),
            duration_ms = start.elapsed().as_millis(),
            "validation complete"
        );
        summary
    }

    fn file_presence(&self, present: &BTreeSet<String>) -> Vec<Notice> {
        let mut notices = Vec::new();
        for required in self.schema.required_filenames() {
            if !present.contains(required) {
                warn!(filename = required, "required file missing");
                notices.push(Notice::MissingRequiredFile {
                    filename: required.to_string(),
                });
            }
        }
        for filename in present {
            if self.schema.file(filename).is_none() {
                notices.push(Notice::UnknownFile {
                    filename: filename.clone(),
                });
            }
        }
        notices
    }

    fn parse_file(
        &self,
        file: &FileSpec,
        feed: &dyn RawFileRepository,
        store: &InMemoryGtfsDataRepository,
    ) -> FileRun {
        let span = info_span!("file", filename = %file.filename);
        let _guard = span.enter();
        let start = Instant::now();
        let mut stats = FileStats {
            filename: file.filename.clone(),
            ..FileStats::default()
        };

        let provider = feed.provider(&file.filename);
        let headers = provider
            .as_ref()
            .map(|_| feed.actual_headers(&file.filename));
        let (rows, headers) = match (provider, headers) {
            (Some(rows), Some(Ok(headers))) => (rows, headers),
            (_, headers) => {
                if let Some(Err(error)) = headers {
                    warn!(%error, "cannot read header");
                } else {
                    warn!("cannot open file");
                }
                return FileRun {
                    stats,
                    notices: vec![Notice::CannotConstructDataProvider {
                        filename: file.filename.clone(),
                    }],
                };
            }
        };

        let mut notices = validate_headers(file, &headers);
        let parser = RowParser::new(file, &headers, &self.patterns);
        for row in rows {
            match row {
                Ok(raw) => {
                    stats.rows += 1;
                    let (entity, row_notices) = parser.parse(&raw);
                    notices.extend(row_notices);
                    store.add_entity(entity);
                }
                Err(error) => notices.push(csv_notice(&file.filename, &error)),
            }
        }
        if stats.rows == 0 && file.required {
            notices.push(Notice::EmptyFile {
                filename: file.filename.clone(),
            });
        }
        store.mark_loaded(&file.filename);

        stats.entities = store.count(&file.filename);
        stats.notices = notices.len();
        stats.loaded = true;
        debug!(
            rows = stats.rows,
            entities = stats.entities,
            notices = stats.notices,
            duration_ms = start.elapsed().as_millis(),
            "file parsed"
        );
        FileRun { stats, notices }
    }
}

fn csv_notice(filename: &str, error: &IngestError) -> Notice {
    match error {
        IngestError::Record {
            csv_row_number,
            message,
            ..
        } => Notice::CsvParsingFailed {
            filename: filename.to_string(),
            csv_row_number: *csv_row_number,
            message: message.clone(),
        },
        other => Notice::CsvParsingFailed {
            filename: filename.to_string(),
            csv_row_number: 0,
            message: other.to_string(),
        },
    }
}
