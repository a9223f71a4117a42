//! Feed expiration windows.
//!
//! "Now" is today truncated to midnight. The warning window is exclusive at
//! both ends: an end date exactly `coverage_warning_days` away is fine, and one
//! exactly `coverage_error_days` away belongs to the error rule.

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use gtfs_model::{Notice, ParsedEntity};

use super::FEED_INFO;
use crate::engine::RuleContext;

const END_DATE_FIELD: &str = "feed_end_date";
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub fn check_30_days(ctx: &RuleContext<'_>) -> Vec<Notice> {
    let now = ctx.options.today_midnight();
    let warning_limit = now + TimeDelta::days(ctx.options.coverage_warning_days);
    let error_limit = now + TimeDelta::days(ctx.options.coverage_error_days);

    let mut notices = Vec::new();
    for info in ctx.store.get_all(FEED_INFO) {
        let Some(end) = end_of_feed(&info) else {
            continue;
        };
        if end < warning_limit && end > error_limit {
            let (feed_publisher_name, feed_end_date, current_date) = describe(&info, end, now);
            notices.push(Notice::FeedInfoExpiresInLessThan30Days {
                filename: FEED_INFO.to_string(),
                field_name: END_DATE_FIELD.to_string(),
                feed_publisher_name,
                feed_end_date,
                current_date,
            });
        }
    }
    notices
}

pub fn check_7_days(ctx: &RuleContext<'_>) -> Vec<Notice> {
    let now = ctx.options.today_midnight();
    let error_limit = now + TimeDelta::days(ctx.options.coverage_error_days);

    let mut notices = Vec::new();
    for info in ctx.store.get_all(FEED_INFO) {
        let Some(end) = end_of_feed(&info) else {
            continue;
        };
        if end <= error_limit {
            let (feed_publisher_name, feed_end_date, current_date) = describe(&info, end, now);
            notices.push(Notice::FeedInfoExpiresInLessThan7Days {
                filename: FEED_INFO.to_string(),
                field_name: END_DATE_FIELD.to_string(),
                feed_publisher_name,
                feed_end_date,
                current_date,
            });
        }
    }
    notices
}

fn end_of_feed(info: &ParsedEntity) -> Option<NaiveDateTime> {
    info.date(END_DATE_FIELD)
        .map(|date| date.and_time(NaiveTime::MIN))
}

fn describe(info: &ParsedEntity, end: NaiveDateTime, now: NaiveDateTime) -> (String, String, String) {
    (
        info.text("feed_publisher_name")
            .unwrap_or_default()
            .to_string(),
        end.format(DATE_FORMAT).to_string(),
        now.format(DATE_FORMAT).to_string(),
    )
}
