use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat};
use gtfs_ingest::CsvFeedRepository;
use gtfs_standards::{DoctorReport, SchemaRegistry};
use gtfs_validate::{FeedValidator, ValidationOptions, ValidationOutcome};
use tracing::{info, info_span};

use crate::cli::{SchemaArgs, ValidateArgs};
use crate::report::ValidationReport;
use crate::summary::print_schema;

/// Everything a finished `validate` command produced.
#[derive(Debug)]
pub struct ValidateRun {
    pub outcome: ValidationOutcome,
    pub report: ValidationReport,
    /// Where the JSON report was written, if requested.
    pub report_path: Option<PathBuf>,
}

impl ValidateRun {
    pub fn has_errors(&self) -> bool {
        self.outcome.has_errors()
    }
}

pub fn run_validate(args: &ValidateArgs) -> Result<ValidateRun> {
    let span = info_span!("feed", feed = %args.feed_dir.display());
    let _guard = span.enter();
    let start = Instant::now();

    let (registry, _) = SchemaRegistry::resolve(args.schema.as_deref()).context("load schema")?;
    let options = validation_options(args);
    let validator =
        FeedValidator::new(registry.schema.clone(), options).context("prepare validator")?;

    let feed = CsvFeedRepository::open(&args.feed_dir)
        .with_context(|| format!("open feed directory {}", args.feed_dir.display()))?;
    let outcome = validator.validate(&feed);

    let generated_at = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
    let report = ValidationReport::build(
        &args.feed_dir,
        &registry,
        &outcome,
        &generated_at,
        args.max_samples,
    );
    if let Some(path) = &args.output {
        report.write(path)?;
        info!(path = %path.display(), "report written");
    }

    info!(
        notices = outcome.len(),
        errors = report.summary.errors,
        duration_ms = start.elapsed().as_millis(),
        "feed validated"
    );
    Ok(ValidateRun {
        outcome,
        report,
        report_path: args.output.clone(),
    })
}

pub fn validation_options(args: &ValidateArgs) -> ValidationOptions {
    let mut options = ValidationOptions::new().with_parallel(!args.sequential);
    if let Some(today) = args.date {
        options = options.with_today(today);
    }
    if let Some(meters) = args.stop_shape_threshold {
        options = options.with_stop_shape_threshold(meters);
    }
    options
}

pub fn run_schema(args: &SchemaArgs) -> Result<()> {
    let report = schema_report(args.schema.as_deref())?;
    if args.json {
        let json = serde_json::to_string_pretty(&report).context("serialize schema report")?;
        println!("{json}");
    } else {
        print_schema(&report);
    }
    Ok(())
}

pub fn schema_report(explicit: Option<&Path>) -> Result<DoctorReport> {
    let (registry, summary) = SchemaRegistry::resolve(explicit).context("load schema")?;
    DoctorReport::from_verify_summary(&registry, &summary).context("describe schema")
}
