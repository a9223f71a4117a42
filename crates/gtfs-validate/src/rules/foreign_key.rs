//! Declared references between files.
//!
//! A reference is only checked when both the child and the parent file are
//! loaded; a missing parent file is reported elsewhere.

use std::collections::{BTreeMap, BTreeSet};

use gtfs_model::Notice;

use crate::engine::RuleContext;

pub fn check(ctx: &RuleContext<'_>) -> Vec<Notice> {
    let mut notices = Vec::new();
    let mut parents: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();

    for file in &ctx.schema.files {
        if !ctx.store.is_loaded(&file.filename) {
            continue;
        }
        for field in &file.fields {
            let Some(target) = &field.references else {
                continue;
            };
            if !ctx.store.is_loaded(&target.file) {
                continue;
            }
            let values = parents
                .entry((target.file.clone(), target.field.clone()))
                .or_insert_with(|| {
                    ctx.store
                        .get_all(&target.file)
                        .iter()
                        .filter_map(|parent| parent.display(&target.field))
                        .collect()
                });

            for child in ctx.store.get_all(&file.filename) {
                let Some(value) = child.display(&field.name) else {
                    continue;
                };
                if !values.contains(&value) {
                    notices.push(Notice::ForeignKeyViolation {
                        child_filename: file.filename.clone(),
                        child_field_name: field.name.clone(),
                        parent_filename: target.file.clone(),
                        parent_field_name: target.field.clone(),
                        field_value: value,
                        csv_row_number: child.csv_row_number,
                    });
                }
            }
        }
    }
    notices
}
