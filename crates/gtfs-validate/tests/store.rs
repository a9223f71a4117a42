//! Entity store tests.

use std::sync::Arc;

use gtfs_model::{EntityKey, FieldValue, ParsedEntity, SchemaModel, TypedValue};
use gtfs_standards::SchemaRegistry;
use gtfs_validate::{GtfsDataRepository, InMemoryGtfsDataRepository};

fn schema() -> SchemaModel {
    SchemaRegistry::bundled().expect("bundled schema").0.schema
}

fn stop(row: u64, id: &str, name: &str) -> ParsedEntity {
    ParsedEntity::new("stops.txt", row)
        .with("stop_id", TypedValue::Text(id.to_string()))
        .with("stop_name", TypedValue::Text(name.to_string()))
}

fn stop_time(row: u64, trip: &str, sequence: i64) -> ParsedEntity {
    ParsedEntity::new("stop_times.txt", row)
        .with("trip_id", TypedValue::Text(trip.to_string()))
        .with("stop_sequence", TypedValue::Integer(sequence))
}

#[test]
fn inserted_entities_are_found_by_natural_key() {
    let schema = schema();
    let store = InMemoryGtfsDataRepository::new(&schema);
    assert!(store.add_entity(stop(2, "S1", "Main St")).is_none());
    assert!(store.add_entity(stop_time(2, "T1", 5)).is_none());

    let found = store
        .get_by_key("stops.txt", &EntityKey::single("S1"))
        .expect("stop stored");
    assert_eq!(found.text("stop_name"), Some("Main St"));

    let composite = store
        .get_by_key("stop_times.txt", &EntityKey::composite(["T1", "5"]))
        .expect("stop time stored");
    assert_eq!(composite.csv_row_number, 2);
}

#[test]
fn unknown_keys_are_not_found() {
    let schema = schema();
    let store = InMemoryGtfsDataRepository::new(&schema);
    store.add_entity(stop(2, "S1", "Main St"));
    assert!(store.get_by_key("stops.txt", &EntityKey::single("S2")).is_none());
    assert!(store.get_by_key("routes.txt", &EntityKey::single("S1")).is_none());
    assert!(store.get_all("routes.txt").is_empty());
    assert_eq!(store.count("routes.txt"), 0);
}

#[test]
fn last_row_wins_and_displacement_is_recorded() {
    let schema = schema();
    let store = InMemoryGtfsDataRepository::new(&schema);
    store.add_entity(stop(2, "S1", "First"));
    store.add_entity(stop(3, "S2", "Other"));
    let displaced = store.add_entity(stop(4, "S1", "Second")).expect("displaced");
    assert_eq!(displaced.text("stop_name"), Some("First"));

    let kept = store
        .get_by_key("stops.txt", &EntityKey::single("S1"))
        .expect("stop stored");
    assert_eq!(kept.text("stop_name"), Some("Second"));
    assert_eq!(store.count("stops.txt"), 2);

    let records = store.displaced("stops.txt");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, EntityKey::single("S1"));
    assert_eq!(records[0].kept_row, 4);
    assert_eq!(records[0].displaced_row, 2);
}

#[test]
fn rows_without_a_usable_key_never_collide() {
    let schema = schema();
    let store = InMemoryGtfsDataRepository::new(&schema);
    for row in 4..=6 {
        let blank = ParsedEntity::new("stops.txt", row)
            .with_value("stop_id", FieldValue::MissingRequired)
            .with("stop_name", TypedValue::Text(format!("Unnamed {row}")));
        assert!(store.add_entity(blank).is_none());
    }
    let bad_sequence = ParsedEntity::new("stop_times.txt", 2)
        .with("trip_id", TypedValue::Text("T1".into()))
        .with_value("stop_sequence", FieldValue::Invalid { raw: "x".into() });
    let other_bad_sequence = ParsedEntity::new("stop_times.txt", 3)
        .with("trip_id", TypedValue::Text("T1".into()))
        .with_value("stop_sequence", FieldValue::Invalid { raw: "y".into() });
    assert!(store.add_entity(bad_sequence).is_none());
    assert!(store.add_entity(other_bad_sequence).is_none());

    assert_eq!(store.count("stops.txt"), 3);
    assert_eq!(store.count("stop_times.txt"), 2);
    assert!(store.displaced("stops.txt").is_empty());
    assert!(store.get_by_key("stops.txt", &EntityKey::Row(5)).is_some());
}

#[test]
fn keyless_files_are_indexed_by_row() {
    let schema = schema();
    let store = InMemoryGtfsDataRepository::new(&schema);
    for row in 2..5 {
        store.add_entity(
            ParsedEntity::new("feed_info.txt", row)
                .with("feed_publisher_name", TypedValue::Text("Metro".into())),
        );
    }
    assert_eq!(store.count("feed_info.txt"), 3);
    assert!(store.displaced("feed_info.txt").is_empty());
    assert!(store.get_by_key("feed_info.txt", &EntityKey::Row(3)).is_some());
}

#[test]
fn get_all_preserves_row_order() {
    let schema = schema();
    let store = InMemoryGtfsDataRepository::new(&schema);
    store.add_entity(stop(4, "A", "a"));
    store.add_entity(stop(2, "Z", "z"));
    store.add_entity(stop(3, "M", "m"));
    let rows: Vec<u64> = store
        .get_all("stops.txt")
        .iter()
        .map(|entity| entity.csv_row_number)
        .collect();
    assert_eq!(rows, vec![2, 3, 4]);
}

#[test]
fn grouping_orders_by_integer_field() {
    let schema = schema();
    let store = InMemoryGtfsDataRepository::new(&schema);
    store.add_entity(stop_time(2, "T1", 10));
    store.add_entity(stop_time(3, "T1", 2));
    store.add_entity(stop_time(4, "T2", 1));
    store.add_entity(
        ParsedEntity::new("stop_times.txt", 5).with("trip_id", TypedValue::Text("T3".into())),
    );

    let groups = store.get_grouped("stop_times.txt", "trip_id", "stop_sequence");
    assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["T1", "T2"]);
    let sequences: Vec<_> = groups["T1"]
        .iter()
        .map(|entity| entity.integer("stop_sequence"))
        .collect();
    assert_eq!(sequences, vec![Some(2), Some(10)]);
}

#[test]
fn files_populate_concurrently() {
    let schema = schema();
    let store = Arc::new(InMemoryGtfsDataRepository::new(&schema));
    std::thread::scope(|scope| {
        let stops = Arc::clone(&store);
        scope.spawn(move || {
            for row in 0..200 {
                stops.add_entity(stop(row + 2, &format!("S{row}"), "stop"));
            }
            stops.mark_loaded("stops.txt");
        });
        let times = Arc::clone(&store);
        scope.spawn(move || {
            for row in 0..200 {
                times.add_entity(stop_time(row + 2, "T1", row as i64));
            }
            times.mark_loaded("stop_times.txt");
        });
    });
    assert_eq!(store.count("stops.txt"), 200);
    assert_eq!(store.count("stop_times.txt"), 200);
    assert!(store.is_loaded("stops.txt"));
    assert!(store.is_loaded("stop_times.txt"));
    assert!(!store.is_loaded("trips.txt"));
}
