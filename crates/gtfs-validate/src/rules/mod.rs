//! Built-in semantic rules.
//!
//! Each module exposes `check(&RuleContext) -> Vec<Notice>`. The registry
//! order below is the order notices are appended in.

mod duplicate_key;
mod feed_coverage;
mod feed_end_date;
mod foreign_key;
mod shape_proximity;
mod travel_speed;

use gtfs_model::{EntityKey, ParsedEntity};

use crate::engine::{RuleContext, RuleUnit};
use crate::geo::LatLon;

pub(crate) const FEED_INFO: &str = "feed_info.txt";
pub(crate) const ROUTES: &str = "routes.txt";
pub(crate) const SHAPES: &str = "shapes.txt";
pub(crate) const STOPS: &str = "stops.txt";
pub(crate) const STOP_TIMES: &str = "stop_times.txt";
pub(crate) const TRIPS: &str = "trips.txt";

const BUILTIN: &[RuleUnit] = &[
    RuleUnit::new(
        "duplicate_key",
        "Natural keys are unique within a file",
        &[],
        duplicate_key::check,
    ),
    RuleUnit::new(
        "foreign_key",
        "Referenced entities exist",
        &[],
        foreign_key::check,
    ),
    RuleUnit::new(
        "feed_end_date_missing",
        "Feed end date accompanies feed start date",
        &[FEED_INFO],
        feed_end_date::check,
    ),
    RuleUnit::new(
        "feed_coverage_30_days",
        "Feed is valid for at least 30 more days",
        &[FEED_INFO],
        feed_coverage::check_30_days,
    ),
    RuleUnit::new(
        "feed_expiration_7_days",
        "Feed is valid for at least 7 more days",
        &[FEED_INFO],
        feed_coverage::check_7_days,
    ),
    RuleUnit::new(
        "too_fast_travel",
        "Travel speed between stops is plausible",
        &[STOP_TIMES, TRIPS, ROUTES, STOPS],
        travel_speed::check,
    ),
    RuleUnit::new(
        "stop_too_far_from_trip_shape",
        "Stops lie close to the trip shape",
        &[STOP_TIMES, TRIPS, STOPS, SHAPES],
        shape_proximity::check,
    ),
];

pub(crate) fn builtin() -> &'static [RuleUnit] {
    BUILTIN
}

/// Entity of a single-field keyed file.
pub(crate) fn lookup(
    ctx: &RuleContext<'_>,
    filename: &str,
    id: &str,
) -> Option<std::sync::Arc<ParsedEntity>> {
    ctx.store.get_by_key(filename, &EntityKey::single(id))
}

/// Coordinates of the stop a stop time points at.
pub(crate) fn stop_position(ctx: &RuleContext<'_>, stop_time: &ParsedEntity) -> Option<LatLon> {
    let stop = lookup(ctx, STOPS, stop_time.text("stop_id")?)?;
    Some(LatLon::new(stop.float("stop_lat")?, stop.float("stop_lon")?))
}
