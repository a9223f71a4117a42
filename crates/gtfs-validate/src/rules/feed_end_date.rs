//! A feed that declares a start date should also declare when it ends.

use gtfs_model::{FieldValue, Notice};

use super::FEED_INFO;
use crate::engine::RuleContext;

pub fn check(ctx: &RuleContext<'_>) -> Vec<Notice> {
    ctx.store
        .get_all(FEED_INFO)
        .iter()
        .filter(|info| info.date("feed_start_date").is_some())
        .filter(|info| {
            matches!(
                info.value("feed_end_date"),
                None | Some(FieldValue::NotProvided)
            )
        })
        .map(|info| Notice::MissingFeedEndDate {
            filename: FEED_INFO.to_string(),
            csv_row_number: info.csv_row_number,
            feed_publisher_name: info
                .text("feed_publisher_name")
                .unwrap_or_default()
                .to_string(),
        })
        .collect()
}
