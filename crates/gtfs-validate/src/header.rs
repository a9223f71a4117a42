//! Header checks.

use std::collections::BTreeSet;

use gtfs_model::{FileSpec, Notice};

/// Compare a file's actual header against its declaration.
///
/// Emits `MissingHeader` for every required column absent from `actual`
/// (schema order) and `NonStandardHeader` for every actual column the schema
/// does not declare (file order, each name once). Comparison is
/// case-sensitive.
pub fn validate_headers(file: &FileSpec, actual: &[String]) -> Vec<Notice> {
    let present: BTreeSet<&str> = actual.iter().map(String::as_str).collect();
    let mut notices = Vec::new();

    for required in file.required_headers() {
        if !present.contains(required) {
            notices.push(Notice::MissingHeader {
                filename: file.filename.clone(),
                header_name: required.to_string(),
            });
        }
    }

    let mut reported = BTreeSet::new();
    for header in actual {
        if !file.declares(header) && reported.insert(header.as_str()) {
            notices.push(Notice::NonStandardHeader {
                filename: file.filename.clone(),
                header_name: header.clone(),
            });
        }
    }

    notices
}
