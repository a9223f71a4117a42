//! JSON report export.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gtfs_model::Severity;
use gtfs_standards::SchemaRegistry;
use gtfs_validate::{FileStats, RuleRunSummary, ValidationOutcome};
use serde::Serialize;
use serde_json::Value;

pub const REPORT_SCHEMA: &str = "gtfs-validator.report";
pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub schema: String,
    pub schema_version: u32,
    pub generated_at: String,
    pub feed: String,
    pub feed_schema: FeedSchemaInfo,
    pub summary: ReportSummary,
    /// One group per notice code, most severe first.
    pub notices: Vec<NoticeGroup>,
}

/// Which schema document the feed was checked against.
#[derive(Debug, Clone, Serialize)]
pub struct FeedSchemaInfo {
    pub source: String,
    pub sha256: String,
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub files: Vec<FileStats>,
    pub rules: RuleRunSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoticeGroup {
    pub code: String,
    pub severity: Severity,
    pub count: usize,
    pub samples: Vec<BTreeMap<String, Value>>,
}

impl ValidationReport {
    pub fn build(
        feed: &Path,
        registry: &SchemaRegistry,
        outcome: &ValidationOutcome,
        generated_at: &str,
        max_samples: usize,
    ) -> Self {
        let mut notices: Vec<NoticeGroup> = outcome
            .by_code()
            .into_iter()
            .filter_map(|(code, group)| {
                let severity = group.first()?.severity();
                Some(NoticeGroup {
                    code: code.to_string(),
                    severity,
                    count: group.len(),
                    samples: group
                        .iter()
                        .take(max_samples)
                        .map(|notice| notice.context())
                        .collect(),
                })
            })
            .collect();
        notices.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.code.cmp(&b.code)));

        Self {
            schema: REPORT_SCHEMA.to_string(),
            schema_version: REPORT_SCHEMA_VERSION,
            generated_at: generated_at.to_string(),
            feed: feed.display().to_string(),
            feed_schema: FeedSchemaInfo {
                source: registry.source.clone(),
                sha256: registry.sha256.clone(),
                name: registry.schema.name.clone(),
                version: registry.schema.version.clone(),
            },
            summary: ReportSummary {
                errors: outcome.count(Severity::Error),
                warnings: outcome.count(Severity::Warning),
                infos: outcome.count(Severity::Info),
                files: outcome.summary.files.clone(),
                rules: outcome.summary.rules.clone(),
            },
            notices,
        }
    }

    pub fn group(&self, code: &str) -> Option<&NoticeGroup> {
        self.notices.iter().find(|group| group.code == code)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create report directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize report")?;
        fs::write(path, json).with_context(|| format!("write report {}", path.display()))?;
        Ok(())
    }
}
