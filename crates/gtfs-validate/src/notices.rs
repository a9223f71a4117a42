//! Notice collection.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use gtfs_model::{Notice, Severity};

/// Single ingestion point for every finding of a run.
///
/// Implementations must accept concurrent appends from parser and rule
/// threads without losing notices.
pub trait NoticeSink: Send + Sync {
    fn add_notice(&self, notice: Notice);

    fn add_notices(&self, notices: Vec<Notice>) {
        for notice in notices {
            self.add_notice(notice);
        }
    }
}

/// Thread-safe, append-only notice collector.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNoticeRepository {
    notices: Arc<RwLock<Vec<Notice>>>,
}

impl InMemoryNoticeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // Appends are single pushes, so a poisoned list is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Notice>> {
        self.notices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Notice>> {
        self.notices.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// All notices, in insertion order.
    pub fn notices(&self) -> Vec<Notice> {
        self.read().clone()
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<Notice> {
        self.notices()
            .into_iter()
            .filter(|notice| notice.severity() == severity)
            .collect()
    }

    pub fn by_code(&self, code: &str) -> Vec<Notice> {
        self.notices()
            .into_iter()
            .filter(|notice| notice.code() == code)
            .collect()
    }

    pub fn count_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for notice in self.read().iter() {
            *counts.entry(notice.severity()).or_insert(0) += 1;
        }
        counts
    }

    pub fn has_errors(&self) -> bool {
        self.read()
            .iter()
            .any(|notice| notice.severity() == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NoticeSink for InMemoryNoticeRepository {
    fn add_notice(&self, notice: Notice) {
        self.write().push(notice);
    }

    fn add_notices(&self, batch: Vec<Notice>) {
        self.write().extend(batch);
    }
}
