//! Rows displaced by a later row with the same natural key.

use gtfs_model::{EntityKey, Notice};

use crate::engine::RuleContext;

pub fn check(ctx: &RuleContext<'_>) -> Vec<Notice> {
    let mut notices = Vec::new();
    for file in ctx.schema.files.iter().filter(|file| file.is_keyed()) {
        if !ctx.store.is_loaded(&file.filename) {
            continue;
        }
        for displaced in ctx.store.displaced(&file.filename) {
            // Rows without a usable key are reported by the parser.
            if matches!(displaced.key, EntityKey::Row(_)) {
                continue;
            }
            notices.push(Notice::DuplicateKey {
                filename: file.filename.clone(),
                csv_row_number: displaced.kept_row,
                entity_id: displaced.key.entity_id(),
                previous_csv_row_number: displaced.displaced_row,
            });
        }
    }
    notices
}
