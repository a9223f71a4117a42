//! Semantic rule tests against stores populated with synthetic entities.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{NaiveDate, TimeDelta};
use gtfs_model::{GtfsTime, Notice, ParsedEntity, SchemaModel, TypedValue};
use gtfs_standards::SchemaRegistry;
use gtfs_validate::{
    GtfsDataRepository, InMemoryGtfsDataRepository, NoticeSink, RuleContext, RuleEngine,
    RuleRegistry, RuleUnit, ValidationOptions,
};

fn schema() -> SchemaModel {
    SchemaRegistry::bundled().expect("bundled schema").0.schema
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
}

fn options() -> ValidationOptions {
    ValidationOptions::new()
        .with_today(today())
        .with_parallel(false)
}

fn text(value: &str) -> TypedValue {
    TypedValue::Text(value.to_string())
}

fn run_rule(id: &str, schema: &SchemaModel, store: &dyn GtfsDataRepository) -> Vec<Notice> {
    let registry = RuleRegistry::default_rules();
    let rule = registry.get(id).expect("rule registered");
    let options = options();
    let ctx = RuleContext::new(store, schema, &options);
    (rule.check)(&ctx)
}

#[derive(Default)]
struct CountingSink {
    calls: AtomicUsize,
    notices: AtomicUsize,
}

impl NoticeSink for CountingSink {
    fn add_notice(&self, _notice: Notice) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.notices.fetch_add(1, Ordering::SeqCst);
    }

    fn add_notices(&self, notices: Vec<Notice>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.notices.fetch_add(notices.len(), Ordering::SeqCst);
    }
}

// === Feed coverage ===

fn feed_info(end_in_days: Option<i64>) -> ParsedEntity {
    let entity = ParsedEntity::new("feed_info.txt", 2)
        .with("feed_publisher_name", text("Metro Transit"))
        .with("feed_start_date", TypedValue::Date(today()));
    match end_in_days {
        Some(days) => entity.with(
            "feed_end_date",
            TypedValue::Date(today() + TimeDelta::days(days)),
        ),
        None => entity,
    }
}

fn coverage_store(schema: &SchemaModel, end_in_days: Option<i64>) -> InMemoryGtfsDataRepository {
    let store = InMemoryGtfsDataRepository::new(schema);
    store.add_entity(feed_info(end_in_days));
    store.mark_loaded("feed_info.txt");
    store
}

#[test]
fn coverage_warns_inside_the_window() {
    let schema = schema();
    let store = coverage_store(&schema, Some(10));
    let notices = run_rule("feed_coverage_30_days", &schema, &store);
    assert_eq!(notices.len(), 1);
    match &notices[0] {
        Notice::FeedInfoExpiresInLessThan30Days {
            filename,
            field_name,
            feed_publisher_name,
            feed_end_date,
            current_date,
        } => {
            assert_eq!(filename, "feed_info.txt");
            assert_eq!(field_name, "feed_end_date");
            assert_eq!(feed_publisher_name, "Metro Transit");
            assert_eq!(feed_end_date, "2024-03-11T00:00");
            assert_eq!(current_date, "2024-03-01T00:00");
        }
        other => panic!("unexpected notice {other:?}"),
    }
    assert_eq!(notices[0].severity(), gtfs_model::Severity::Warning);
}

#[test]
fn coverage_window_is_exclusive_at_both_ends() {
    let schema = schema();
    for (days, expected) in [(31, 0), (30, 0), (29, 1), (8, 1), (7, 0), (5, 0), (-3, 0)] {
        let store = coverage_store(&schema, Some(days));
        let notices = run_rule("feed_coverage_30_days", &schema, &store);
        assert_eq!(notices.len(), expected, "end date today{days:+}");
    }
}

#[test]
fn expiration_rule_covers_the_last_week() {
    let schema = schema();
    for (days, expected) in [(8, 0), (7, 1), (5, 1), (0, 1), (-3, 1)] {
        let store = coverage_store(&schema, Some(days));
        let notices = run_rule("feed_expiration_7_days", &schema, &store);
        assert_eq!(notices.len(), expected, "end date today{days:+}");
        if let Some(notice) = notices.first() {
            assert_eq!(notice.code(), "feed_info_expires_in_less_than7_days");
            assert_eq!(notice.severity(), gtfs_model::Severity::Error);
        }
    }
}

#[test]
fn absent_end_date_never_reaches_the_sink() {
    let schema = schema();
    let store = coverage_store(&schema, None);
    let mut registry = RuleRegistry::new();
    registry
        .register(
            *RuleRegistry::default_rules()
                .get("feed_coverage_30_days")
                .expect("rule registered"),
        )
        .expect("unique id");
    let engine = RuleEngine::new(registry);
    let sink = CountingSink::default();
    let options = options();

    let summary = engine.execute(&RuleContext::new(&store, &schema, &options), &sink);
    assert_eq!(summary.executed, vec!["feed_coverage_30_days"]);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    assert_eq!(sink.notices.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_end_date_with_start_date_is_flagged() {
    let schema = schema();
    let store = coverage_store(&schema, None);
    let notices = run_rule("feed_end_date_missing", &schema, &store);
    assert_eq!(notices.len(), 1);
    assert!(matches!(
        &notices[0],
        Notice::MissingFeedEndDate { feed_publisher_name, csv_row_number: 2, .. }
            if feed_publisher_name == "Metro Transit"
    ));

    let store = coverage_store(&schema, Some(60));
    assert!(run_rule("feed_end_date_missing", &schema, &store).is_empty());
}

// === Trips, stops and shapes ===

fn add_stop(store: &InMemoryGtfsDataRepository, row: u64, id: &str, lat: f64, lon: f64) {
    store.add_entity(
        ParsedEntity::new("stops.txt", row)
            .with("stop_id", text(id))
            .with("stop_lat", TypedValue::Float(lat))
            .with("stop_lon", TypedValue::Float(lon)),
    );
}

fn add_route(store: &InMemoryGtfsDataRepository, row: u64, id: &str, route_type: i64) {
    store.add_entity(
        ParsedEntity::new("routes.txt", row)
            .with("route_id", text(id))
            .with("route_type", TypedValue::Integer(route_type)),
    );
}

fn add_trip(
    store: &InMemoryGtfsDataRepository,
    row: u64,
    id: &str,
    route: &str,
    shape: Option<&str>,
) {
    let trip = ParsedEntity::new("trips.txt", row)
        .with("trip_id", text(id))
        .with("route_id", text(route))
        .with("service_id", text("WK"));
    store.add_entity(match shape {
        Some(shape) => trip.with("shape_id", text(shape)),
        None => trip,
    });
}

fn add_stop_time(
    store: &InMemoryGtfsDataRepository,
    row: u64,
    trip: &str,
    sequence: i64,
    stop: &str,
    time: Option<GtfsTime>,
) {
    let mut stop_time = ParsedEntity::new("stop_times.txt", row)
        .with("trip_id", text(trip))
        .with("stop_sequence", TypedValue::Integer(sequence))
        .with("stop_id", text(stop));
    if let Some(time) = time {
        stop_time = stop_time
            .with("arrival_time", TypedValue::Time(time))
            .with("departure_time", TypedValue::Time(time));
    }
    store.add_entity(stop_time);
}

fn at(hours: u32, minutes: u32) -> Option<GtfsTime> {
    Some(GtfsTime::from_hms(hours, minutes, 0))
}

/// Two stops about 11.1 km apart along the equator.
fn network(schema: &SchemaModel) -> InMemoryGtfsDataRepository {
    let store = InMemoryGtfsDataRepository::new(schema);
    add_stop(&store, 2, "S1", 0.0, 0.0);
    add_stop(&store, 3, "S2", 0.0, 0.1);
    add_route(&store, 2, "BUS", 3);
    add_route(&store, 3, "RAIL", 2);
    store
}

#[test]
fn too_fast_travel_uses_route_type_limit() {
    let schema = schema();
    let store = network(&schema);
    add_trip(&store, 2, "FAST_BUS", "BUS", None);
    add_trip(&store, 3, "FAST_RAIL", "RAIL", None);
    add_trip(&store, 4, "SLOW_BUS", "BUS", None);
    add_stop_time(&store, 2, "FAST_BUS", 1, "S1", at(8, 0));
    add_stop_time(&store, 3, "FAST_BUS", 2, "S2", at(8, 2));
    add_stop_time(&store, 4, "FAST_RAIL", 1, "S1", at(8, 0));
    add_stop_time(&store, 5, "FAST_RAIL", 2, "S2", at(8, 2));
    add_stop_time(&store, 6, "SLOW_BUS", 1, "S1", at(8, 0));
    add_stop_time(&store, 7, "SLOW_BUS", 2, "S2", at(8, 30));

    let notices = run_rule("too_fast_travel", &schema, &store);
    assert_eq!(notices.len(), 1, "{notices:?}");
    match &notices[0] {
        Notice::TooFastTravel {
            trip_id,
            speed_kmh,
            first_stop_sequence,
            last_stop_sequence,
        } => {
            assert_eq!(trip_id, "FAST_BUS");
            assert!((330.0..340.0).contains(speed_kmh), "{speed_kmh}");
            assert_eq!(*first_stop_sequence, 1);
            assert_eq!(*last_stop_sequence, 2);
        }
        other => panic!("unexpected notice {other:?}"),
    }
}

#[test]
fn untimed_stops_accumulate_distance() {
    let schema = schema();
    let store = network(&schema);
    add_stop(&store, 4, "S3", 0.0, 0.2);
    add_trip(&store, 2, "T1", "BUS", None);
    add_stop_time(&store, 2, "T1", 1, "S1", at(8, 0));
    add_stop_time(&store, 3, "T1", 2, "S2", None);
    add_stop_time(&store, 4, "T1", 3, "S3", at(8, 5));

    let notices = run_rule("too_fast_travel", &schema, &store);
    assert_eq!(notices.len(), 1);
    assert!(matches!(
        &notices[0],
        Notice::TooFastTravel { first_stop_sequence: 1, last_stop_sequence: 3, .. }
    ));
}

#[test]
fn zero_elapsed_time_counts_as_one_minute() {
    let schema = schema();
    let store = network(&schema);
    add_trip(&store, 2, "T1", "RAIL", None);
    add_stop_time(&store, 2, "T1", 1, "S1", at(8, 0));
    add_stop_time(&store, 3, "T1", 2, "S2", at(8, 0));

    // 11.1 km in one minute is well above the rail limit.
    let notices = run_rule("too_fast_travel", &schema, &store);
    assert_eq!(notices.len(), 1);
}

#[test]
fn stop_far_from_shape_is_reported_once_per_cause() {
    let schema = schema();
    let store = network(&schema);
    add_stop(&store, 4, "FAR", 0.01, 0.05);
    for (row, sequence, lon) in [(2, 1, 0.0), (3, 2, 0.05), (4, 3, 0.1)] {
        store.add_entity(
            ParsedEntity::new("shapes.txt", row)
                .with("shape_id", text("SH1"))
                .with("shape_pt_sequence", TypedValue::Integer(sequence))
                .with("shape_pt_lat", TypedValue::Float(0.0))
                .with("shape_pt_lon", TypedValue::Float(lon)),
        );
    }
    add_trip(&store, 2, "T1", "BUS", Some("SH1"));
    add_trip(&store, 3, "T2", "BUS", Some("SH1"));
    add_trip(&store, 4, "T3", "BUS", None);
    for trip in ["T1", "T2", "T3"] {
        add_stop_time(&store, 2, trip, 1, "S1", at(8, 0));
        add_stop_time(&store, 3, trip, 2, "FAR", at(8, 10));
        add_stop_time(&store, 4, trip, 3, "S2", at(8, 20));
    }

    let notices = run_rule("stop_too_far_from_trip_shape", &schema, &store);
    assert_eq!(notices.len(), 1, "{notices:?}");
    match &notices[0] {
        Notice::StopTooFarFromTripShape {
            stop_id,
            stop_sequence,
            trip_id,
            shape_id,
            stop_shape_threshold_meters,
        } => {
            assert_eq!(stop_id, "FAR");
            assert_eq!(*stop_sequence, 2);
            assert_eq!(trip_id, "T1");
            assert_eq!(shape_id, "SH1");
            assert_eq!(*stop_shape_threshold_meters, 100.0);
        }
        other => panic!("unexpected notice {other:?}"),
    }
}

// === Keys and references ===

#[test]
fn duplicate_keys_are_reported_with_both_rows() {
    let schema = schema();
    let store = network(&schema);
    add_stop(&store, 9, "S1", 1.0, 1.0);
    store.mark_loaded("stops.txt");
    store.mark_loaded("routes.txt");

    let notices = run_rule("duplicate_key", &schema, &store);
    assert_eq!(notices.len(), 1);
    assert!(matches!(
        &notices[0],
        Notice::DuplicateKey { filename, csv_row_number: 9, entity_id, previous_csv_row_number: 2 }
            if filename == "stops.txt" && entity_id == "S1"
    ));
}

#[test]
fn dangling_references_are_reported_when_both_files_loaded() {
    let schema = schema();
    let store = network(&schema);
    add_trip(&store, 2, "T1", "BUS", Some("NO_SHAPE"));
    add_stop_time(&store, 2, "T1", 1, "S1", at(8, 0));
    add_stop_time(&store, 3, "T1", 2, "S404", at(8, 5));
    for file in ["stops.txt", "routes.txt", "trips.txt", "stop_times.txt"] {
        store.mark_loaded(file);
    }

    let notices = run_rule("foreign_key", &schema, &store);
    assert_eq!(notices.len(), 1, "{notices:?}");
    match &notices[0] {
        Notice::ForeignKeyViolation {
            child_filename,
            child_field_name,
            parent_filename,
            parent_field_name,
            field_value,
            csv_row_number,
        } => {
            assert_eq!(child_filename, "stop_times.txt");
            assert_eq!(child_field_name, "stop_id");
            assert_eq!(parent_filename, "stops.txt");
            assert_eq!(parent_field_name, "stop_id");
            assert_eq!(field_value, "S404");
            assert_eq!(*csv_row_number, 3);
        }
        other => panic!("unexpected notice {other:?}"),
    }
}

// === Engine ===

fn exploding_rule(_ctx: &RuleContext<'_>) -> Vec<Notice> {
    panic!("index out of bounds")
}

fn steady_rule(_ctx: &RuleContext<'_>) -> Vec<Notice> {
    vec![Notice::UnknownFile {
        filename: "steady.txt".to_string(),
    }]
}

#[test]
fn panicking_rule_becomes_a_notice() {
    let schema = schema();
    let store = InMemoryGtfsDataRepository::new(&schema);
    let mut registry = RuleRegistry::new();
    registry
        .register(RuleUnit::new("exploding", "Always panics", &[], exploding_rule))
        .expect("unique id");
    registry
        .register(RuleUnit::new("steady", "Always reports", &[], steady_rule))
        .expect("unique id");
    let sink = gtfs_validate::InMemoryNoticeRepository::new();
    let options = options().with_parallel(true);

    let summary =
        RuleEngine::new(registry).execute(&RuleContext::new(&store, &schema, &options), &sink);
    assert_eq!(summary.executed, vec!["exploding", "steady"]);

    let notices = sink.notices();
    assert_eq!(notices.len(), 2);
    assert!(matches!(
        &notices[0],
        Notice::RuntimeExceptionInValidator { validator, message }
            if validator == "exploding" && message == "index out of bounds"
    ));
    assert_eq!(notices[1].code(), "unknown_file");
}

#[test]
fn rules_wait_for_their_dependency_closure() {
    let schema = schema();
    let store = network(&schema);
    for file in ["stops.txt", "routes.txt", "trips.txt", "stop_times.txt"] {
        store.mark_loaded(file);
    }
    let sink = gtfs_validate::InMemoryNoticeRepository::new();
    let options = options();

    let summary = RuleEngine::new(RuleRegistry::default_rules())
        .execute(&RuleContext::new(&store, &schema, &options), &sink);
    // routes.txt depends on agency.txt, which was never loaded.
    assert!(summary.skipped.contains(&"too_fast_travel".to_string()));
    assert!(summary.skipped.contains(&"feed_coverage_30_days".to_string()));
    assert!(summary.executed.contains(&"foreign_key".to_string()));
    assert!(summary.executed.contains(&"duplicate_key".to_string()));
}

#[test]
fn registry_rejects_duplicate_ids() {
    let mut registry = RuleRegistry::default_rules();
    assert_eq!(registry.len(), 7);
    let duplicate = *registry.get("foreign_key").expect("rule registered");
    assert!(registry.register(duplicate).is_err());
    assert_eq!(
        registry.ids(),
        vec![
            "duplicate_key",
            "foreign_key",
            "feed_end_date_missing",
            "feed_coverage_30_days",
            "feed_expiration_7_days",
            "too_fast_travel",
            "stop_too_far_from_trip_shape",
        ]
    );
}
