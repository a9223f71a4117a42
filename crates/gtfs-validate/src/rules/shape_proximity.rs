//! Stops that lie far from the shape of a trip serving them.
//!
//! One notice per (shape, stop): the same cause seen from several trips is
//! reported once, for the first trip in trip id order.

use std::collections::{BTreeMap, BTreeSet};

use gtfs_model::Notice;

use super::{SHAPES, STOP_TIMES, TRIPS, lookup, stop_position};
use crate::engine::RuleContext;
use crate::geo::{LatLon, distance_to_polyline_meters};

pub fn check(ctx: &RuleContext<'_>) -> Vec<Notice> {
    let threshold = ctx.options.stop_shape_threshold_meters;
    let shapes: BTreeMap<String, Vec<LatLon>> = ctx
        .store
        .get_grouped(SHAPES, "shape_id", "shape_pt_sequence")
        .into_iter()
        .map(|(shape_id, points)| {
            let line = points
                .iter()
                .filter_map(|point| {
                    Some(LatLon::new(
                        point.float("shape_pt_lat")?,
                        point.float("shape_pt_lon")?,
                    ))
                })
                .collect();
            (shape_id, line)
        })
        .collect();

    let mut reported: BTreeSet<(String, String)> = BTreeSet::new();
    let mut notices = Vec::new();
    for (trip_id, stop_times) in ctx.store.get_grouped(STOP_TIMES, "trip_id", "stop_sequence") {
        let Some(shape_id) = lookup(ctx, TRIPS, &trip_id)
            .and_then(|trip| trip.text("shape_id").map(str::to_string))
        else {
            continue;
        };
        let Some(line) = shapes.get(&shape_id).filter(|line| !line.is_empty()) else {
            continue;
        };

        for stop_time in &stop_times {
            let (Some(stop_id), Some(stop_sequence)) =
                (stop_time.text("stop_id"), stop_time.integer("stop_sequence"))
            else {
                continue;
            };
            let Some(position) = stop_position(ctx, stop_time) else {
                continue;
            };
            let Some(distance) = distance_to_polyline_meters(position, line) else {
                continue;
            };
            if distance > threshold && reported.insert((shape_id.clone(), stop_id.to_string())) {
                notices.push(Notice::StopTooFarFromTripShape {
                    stop_id: stop_id.to_string(),
                    stop_sequence,
                    trip_id: trip_id.clone(),
                    shape_id: shape_id.clone(),
                    stop_shape_threshold_meters: threshold,
                });
            }
        }
    }
    notices
}
