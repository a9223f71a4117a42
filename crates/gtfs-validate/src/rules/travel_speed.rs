//! Implausible travel speed between consecutive timed stops.
//!
//! Distance accumulates over untimed stops until the next stop with a time.
//! A stop without coordinates breaks the chain. Equal departure and arrival
//! times count as one minute; a negative elapsed time is left to other checks.

use gtfs_model::Notice;

use super::{ROUTES, STOP_TIMES, TRIPS, lookup, stop_position};
use crate::engine::RuleContext;
use crate::geo::{LatLon, haversine_meters};

const SECONDS_FOR_ZERO_ELAPSED: i64 = 60;

struct Anchor {
    stop_sequence: i64,
    departure_seconds: i64,
}

pub fn check(ctx: &RuleContext<'_>) -> Vec<Notice> {
    let mut notices = Vec::new();
    for (trip_id, stop_times) in ctx.store.get_grouped(STOP_TIMES, "trip_id", "stop_sequence") {
        let route_type = lookup(ctx, TRIPS, &trip_id)
            .and_then(|trip| trip.text("route_id").map(str::to_string))
            .and_then(|route_id| lookup(ctx, ROUTES, &route_id))
            .and_then(|route| route.integer("route_type"));
        let max_speed_kmh = ctx.options.max_speed_for(route_type);

        let mut anchor: Option<Anchor> = None;
        let mut last_position: Option<LatLon> = None;
        let mut distance_meters = 0.0;

        for stop_time in &stop_times {
            let Some(stop_sequence) = stop_time.integer("stop_sequence") else {
                continue;
            };
            let Some(position) = stop_position(ctx, stop_time) else {
                anchor = None;
                last_position = None;
                distance_meters = 0.0;
                continue;
            };
            if let Some(previous) = last_position {
                distance_meters += haversine_meters(previous, position);
            }
            last_position = Some(position);

            let arrival = stop_time
                .time("arrival_time")
                .or_else(|| stop_time.time("departure_time"));
            let departure = stop_time.time("departure_time").or(arrival);
            let (Some(arrival), Some(departure)) = (arrival, departure) else {
                continue;
            };

            if let Some(previous) = &anchor {
                let elapsed = i64::from(arrival.total_seconds()) - previous.departure_seconds;
                if elapsed >= 0 {
                    let seconds = if elapsed == 0 {
                        SECONDS_FOR_ZERO_ELAPSED
                    } else {
                        elapsed
                    };
                    let speed_kmh = distance_meters / 1000.0 / (seconds as f64 / 3600.0);
                    if speed_kmh > max_speed_kmh {
                        notices.push(Notice::TooFastTravel {
                            trip_id: trip_id.clone(),
                            speed_kmh,
                            first_stop_sequence: previous.stop_sequence,
                            last_stop_sequence: stop_sequence,
                        });
                    }
                }
            }
            anchor = Some(Anchor {
                stop_sequence,
                departure_seconds: i64::from(departure.total_seconds()),
            });
            distance_meters = 0.0;
        }
    }
    notices
}
