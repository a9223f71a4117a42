//! Rule engine for semantic checks over a populated entity store.
//!
//! Rules come from an explicit [`RuleRegistry`] and are evaluated in registry
//! order. A rule runs only when every file in the dependency closure of the
//! files it reads has been loaded. A panicking rule is converted into a
//! `runtime_exception_in_validator` notice; it never aborts the run.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

use gtfs_model::{Notice, SchemaModel};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ValidateError};
use crate::notices::NoticeSink;
use crate::options::ValidationOptions;
use crate::rules;
use crate::store::GtfsDataRepository;

/// Read-only inputs of a rule.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub store: &'a dyn GtfsDataRepository,
    pub schema: &'a SchemaModel,
    pub options: &'a ValidationOptions,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        store: &'a dyn GtfsDataRepository,
        schema: &'a SchemaModel,
        options: &'a ValidationOptions,
    ) -> Self {
        Self {
            store,
            schema,
            options,
        }
    }
}

pub type RuleFn = fn(&RuleContext<'_>) -> Vec<Notice>;

/// One registered semantic check.
#[derive(Debug, Clone, Copy)]
pub struct RuleUnit {
    pub id: &'static str,
    pub title: &'static str,
    /// Files the rule reads.
    pub files: &'static [&'static str],
    pub check: RuleFn,
}

impl RuleUnit {
    pub const fn new(
        id: &'static str,
        title: &'static str,
        files: &'static [&'static str],
        check: RuleFn,
    ) -> Self {
        Self {
            id,
            title,
            files,
            check,
        }
    }
}

/// Ordered collection of rules with unique identifiers.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<RuleUnit>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in rules, in evaluation order.
    pub fn default_rules() -> Self {
        Self {
            rules: rules::builtin().to_vec(),
        }
    }

    pub fn register(&mut self, rule: RuleUnit) -> Result<()> {
        if self.get(rule.id).is_some() {
            return Err(ValidateError::DuplicateRule {
                id: rule.id.to_string(),
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&RuleUnit> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.id).collect()
    }

    pub fn rules(&self) -> &[RuleUnit] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Which rules ran during one engine pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleRunSummary {
    pub executed: Vec<String>,
    /// Rules whose input files were not all loaded.
    pub skipped: Vec<String>,
}

/// Executes a registry against a rule context.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    registry: RuleRegistry,
}

impl RuleEngine {
    pub fn new(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Run every ready rule and append its notices to `sink` in registry order.
    pub fn execute(&self, ctx: &RuleContext<'_>, sink: &dyn NoticeSink) -> RuleRunSummary {
        let loaded = ctx.store.loaded_files();
        let mut summary = RuleRunSummary::default();
        let mut ready = Vec::new();
        for rule in self.registry.rules() {
            if is_ready(rule, ctx.schema, &loaded) {
                summary.executed.push(rule.id.to_string());
                ready.push(rule);
            } else {
                debug!(rule = rule.id, "rule skipped, input files not loaded");
                summary.skipped.push(rule.id.to_string());
            }
        }

        let results: Vec<Vec<Notice>> = if ctx.options.parallel && ready.len() > 1 {
            std::thread::scope(|scope| {
                let handles: Vec<_> = ready
                    .iter()
                    .map(|rule| scope.spawn(move || run_rule(rule, ctx)))
                    .collect();
                handles
                    .into_iter()
                    .zip(&ready)
                    .map(|(handle, rule)| {
                        handle
                            .join()
                            .unwrap_or_else(|payload| vec![runtime_notice(rule, payload.as_ref())])
                    })
                    .collect()
            })
        } else {
            ready.iter().map(|rule| run_rule(rule, ctx)).collect()
        };

        for notices in results {
            if !notices.is_empty() {
                sink.add_notices(notices);
            }
        }
        summary
    }
}

/// Files of the rule, expanded through the schema dependency graph, must all
/// be loaded.
fn is_ready(rule: &RuleUnit, schema: &SchemaModel, loaded: &BTreeSet<String>) -> bool {
    schema
        .dependency_closure(rule.files.iter().copied())
        .iter()
        .all(|file| loaded.contains(file))
}

fn run_rule(rule: &RuleUnit, ctx: &RuleContext<'_>) -> Vec<Notice> {
    info!("Validating rule '{} - {}'", rule.id, rule.title);
    match catch_unwind(AssertUnwindSafe(|| (rule.check)(ctx))) {
        Ok(notices) => {
            debug!(rule = rule.id, notice_count = notices.len(), "rule finished");
            notices
        }
        Err(payload) => vec![runtime_notice(rule, payload.as_ref())],
    }
}

fn runtime_notice(rule: &RuleUnit, payload: &(dyn Any + Send)) -> Notice {
    let message = payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "rule panicked".to_string());
    warn!(rule = rule.id, %message, "rule raised an exception");
    Notice::RuntimeExceptionInValidator {
        validator: rule.id.to_string(),
        message,
    }
}
