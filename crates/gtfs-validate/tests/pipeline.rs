//! End-to-end validation runs over in-memory and on-disk feeds.

use std::fs;

use chrono::NaiveDate;
use gtfs_ingest::InMemoryFeedRepository;
use gtfs_model::{Notice, Severity};
use gtfs_validate::{FeedValidator, InMemoryNoticeRepository, ValidationOptions};

const AGENCY: &str = "agency_id,agency_name,agency_url,agency_timezone
A1,Metro,https://metro.example,Europe/Paris
";
const STOPS: &str = "stop_id,stop_name,stop_lat,stop_lon
S1,Central,48.8566,2.3522
S2,Market,48.8600,2.3600
";
const ROUTES: &str = "route_id,agency_id,route_short_name,route_type,route_color
R1,A1,1,3,FF0000
";
const TRIPS: &str = "route_id,service_id,trip_id
R1,WK,T1
";
const STOP_TIMES: &str = "trip_id,arrival_time,departure_time,stop_id,stop_sequence
T1,08:00:00,08:00:00,S1,1
T1,08:05:00,08:05:00,S2,2
";
const SHAPES: &str = "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence
SH1,48.8566,2.3522,1
SH1,48.8600,2.3600,2
";
const FEED_INFO: &str = "feed_publisher_name,feed_publisher_url,feed_lang,feed_end_date
Metro,https://metro.example,en,20240601
";

fn validator() -> FeedValidator {
    let today = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
    FeedValidator::with_bundled_schema(ValidationOptions::new().with_today(today))
        .expect("bundled schema")
}

fn feed(files: &[(&str, &str)]) -> InMemoryFeedRepository {
    files
        .iter()
        .fold(InMemoryFeedRepository::new(), |repo, (name, text)| {
            repo.with_csv(name, text).expect("valid csv")
        })
}

fn clean_files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("agency.txt", AGENCY),
        ("stops.txt", STOPS),
        ("routes.txt", ROUTES),
        ("trips.txt", TRIPS),
        ("stop_times.txt", STOP_TIMES),
        ("shapes.txt", SHAPES),
        ("feed_info.txt", FEED_INFO),
    ]
}

fn replace(files: &mut [(&'static str, &'static str)], name: &str, text: &'static str) {
    for file in files.iter_mut() {
        if file.0 == name {
            file.1 = text;
        }
    }
}

fn codes(notices: &[Notice]) -> Vec<&'static str> {
    notices.iter().map(Notice::code).collect()
}

#[test]
fn clean_feed_has_no_notices() {
    let outcome = validator().validate(&feed(&clean_files()));
    assert!(outcome.is_empty(), "{:?}", outcome.notices());
    assert!(!outcome.has_errors());
    assert!(outcome.summary.rules.skipped.is_empty());
    assert_eq!(outcome.summary.rules.executed.len(), 7);

    let stop_times = outcome
        .summary
        .files
        .iter()
        .find(|stats| stats.filename == "stop_times.txt")
        .expect("stop_times parsed");
    assert_eq!(stop_times.rows, 2);
    assert_eq!(stop_times.entities, 2);
    assert!(stop_times.loaded);
}

#[test]
fn files_are_reported_in_dependency_order() {
    let outcome = validator().validate(&feed(&clean_files()));
    let order: Vec<_> = outcome
        .summary
        .files
        .iter()
        .map(|stats| stats.filename.as_str())
        .collect();
    assert_eq!(
        order,
        vec![
            "agency.txt",
            "stops.txt",
            "routes.txt",
            "trips.txt",
            "stop_times.txt",
            "shapes.txt",
            "feed_info.txt",
        ]
    );
}

#[test]
fn missing_and_unknown_files() {
    let mut files = clean_files();
    files.retain(|(name, _)| *name != "agency.txt");
    files.push(("notes.txt", "note\nhello\n"));
    let outcome = validator().validate(&feed(&files));

    let notices = outcome.notices();
    assert_eq!(
        notices[0],
        Notice::MissingRequiredFile {
            filename: "agency.txt".to_string()
        }
    );
    assert_eq!(
        notices[1],
        Notice::UnknownFile {
            filename: "notes.txt".to_string()
        }
    );
    // routes.txt depends on agency.txt, so every rule reading routes is skipped.
    assert!(
        outcome
            .summary
            .rules
            .skipped
            .contains(&"too_fast_travel".to_string())
    );
    assert_eq!(outcome.count(Severity::Info), 1);
}

#[test]
fn unreadable_file_yields_single_notice() {
    let repo = feed(&clean_files()).with_unreadable("trips.txt");
    let outcome = validator().validate(&repo);

    let trips: Vec<_> = outcome
        .notices()
        .iter()
        .filter(|notice| notice.filename() == Some("trips.txt"))
        .collect();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].code(), "cannot_construct_data_provider");

    let stats = outcome
        .summary
        .files
        .iter()
        .find(|stats| stats.filename == "trips.txt")
        .expect("trips listed");
    assert!(!stats.loaded);
    assert_eq!(stats.rows, 0);
    // The other files are still processed.
    assert!(
        outcome
            .summary
            .files
            .iter()
            .filter(|stats| stats.filename != "trips.txt")
            .all(|stats| stats.loaded)
    );
}

#[test]
fn field_and_header_problems_surface_as_notices() {
    let mut files = clean_files();
    replace(
        &mut files,
        "routes.txt",
        "route_id,agency_id,route_short_name,route_color,route_mood
R1,A1,1,#FF0000,happy
",
    );
    replace(
        &mut files,
        "stops.txt",
        "stop_id,stop_name,stop_lat,stop_lon
S1,Central,48.8566,2.3522
S2,Market,148.8600,2.3600
S1,Duplicate,48.8566,2.3522
",
    );
    let outcome = validator().validate(&feed(&files));
    let by_code = outcome.by_code();

    assert_eq!(by_code["missing_header"].len(), 1);
    assert_eq!(by_code["non_standard_header"].len(), 1);
    assert_eq!(by_code["invalid_color"].len(), 1);
    assert_eq!(by_code["invalid_coordinate"].len(), 1);
    assert_eq!(by_code["duplicate_key"].len(), 1);
    // The absent route_type column is reported once, not per row.
    assert!(!by_code.contains_key("missing_required_field"));
    assert!(outcome.has_errors());
}

#[test]
fn blank_key_rows_are_all_kept_and_reported_once() {
    let mut files = clean_files();
    replace(
        &mut files,
        "stops.txt",
        "stop_id,stop_name,stop_lat,stop_lon
S1,Central,48.8566,2.3522
S2,Market,48.8600,2.3600
,Blank A,48.8500,2.3500
,Blank B,48.8510,2.3510
,Blank C,48.8520,2.3520
",
    );
    let outcome = validator().validate(&feed(&files));
    let by_code = outcome.by_code();

    assert_eq!(by_code["missing_required_field"].len(), 3);
    assert!(!by_code.contains_key("duplicate_key"));
    assert!(by_code["missing_required_field"].iter().all(|notice| matches!(
        notice,
        Notice::MissingRequiredField { entity_id, .. } if entity_id == "no id"
    )));

    let stops = outcome
        .summary
        .files
        .iter()
        .find(|stats| stats.filename == "stops.txt")
        .expect("stops parsed");
    assert_eq!(stops.rows, 5);
    assert_eq!(stops.entities, 5);
}

#[test]
fn header_only_required_file_is_empty() {
    let mut files = clean_files();
    replace(
        &mut files,
        "agency.txt",
        "agency_id,agency_name,agency_url,agency_timezone\n",
    );
    let outcome = validator().validate(&feed(&files));
    assert!(
        outcome
            .notices()
            .iter()
            .any(|notice| matches!(notice, Notice::EmptyFile { filename } if filename == "agency.txt"))
    );
    // routes reference an agency that does not exist.
    assert_eq!(outcome.by_code()["foreign_key_violation"].len(), 1);
}

#[test]
fn expiring_feed_is_flagged() {
    let mut files = clean_files();
    replace(
        &mut files,
        "feed_info.txt",
        "feed_publisher_name,feed_publisher_url,feed_lang,feed_end_date
Metro,https://metro.example,en,20240311
",
    );
    let outcome = validator().validate(&feed(&files));
    assert_eq!(
        codes(outcome.notices()),
        vec!["feed_info_expires_in_less_than30_days"]
    );
}

#[test]
fn repeated_runs_produce_the_same_notices() {
    let mut files = clean_files();
    replace(
        &mut files,
        "stop_times.txt",
        "trip_id,arrival_time,departure_time,stop_id,stop_sequence
T1,08:00:00,08:00:00,S1,1
T1,08:00:30,08:00:30,S2,2
T1,8:61:00,08:70:00,S9,3
",
    );
    let repo = feed(&files);
    let validator = validator();

    let render = |notices: &[Notice]| {
        let mut lines: Vec<String> = notices
            .iter()
            .map(|notice| serde_json::to_string(notice).expect("serialize notice"))
            .collect();
        lines.sort();
        lines
    };
    let first = render(validator.validate(&repo).notices());
    let second = render(validator.validate(&repo).notices());
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn sequential_and_parallel_runs_agree() {
    let files = clean_files();
    let repo = feed(&files).with_unreadable("stops.txt");
    let today = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
    let parallel = validator().validate(&repo);
    let sequential = FeedValidator::with_bundled_schema(
        ValidationOptions::new()
            .with_today(today)
            .with_parallel(false),
    )
    .expect("bundled schema")
    .validate(&repo);
    assert_eq!(parallel.notices(), sequential.notices());
    assert_eq!(parallel.summary, sequential.summary);
}

#[test]
fn custom_sink_receives_every_notice() {
    let mut files = clean_files();
    files.push(("extra.txt", "a\n1\n"));
    let sink = InMemoryNoticeRepository::new();
    let summary = validator().validate_into(&feed(&files), &sink);
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.by_code("unknown_file").len(), 1);
    assert_eq!(summary.files.len(), 7);
}

#[test]
fn validates_a_directory_of_csv_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    for (name, text) in clean_files() {
        fs::write(dir.path().join(name), text).expect("write feed file");
    }
    let mut stops = STOPS.as_bytes().to_vec();
    stops.extend_from_slice(b"S3,");
    stops.extend_from_slice(&[0xff, 0xfe]);
    stops.extend_from_slice(b",48.0,2.0\n");
    fs::write(dir.path().join("stops.txt"), stops).expect("write stops");

    let outcome = validator()
        .validate_directory(dir.path())
        .expect("directory readable");
    assert_eq!(codes(outcome.notices()), vec!["csv_parsing_failed"]);
    assert!(matches!(
        &outcome.notices()[0],
        Notice::CsvParsingFailed { filename, csv_row_number: 4, .. } if filename == "stops.txt"
    ));
}

#[test]
fn notices_point_at_the_physical_line() {
    let dir = tempfile::tempdir().expect("temp dir");
    for (name, text) in clean_files() {
        fs::write(dir.path().join(name), text).expect("write feed file");
    }
    fs::write(
        dir.path().join("routes.txt"),
        "route_id,agency_id,route_short_name,route_type,route_color\n\nR1,A1,1,3,#FF0000\n",
    )
    .expect("write routes");

    let outcome = validator()
        .validate_directory(dir.path())
        .expect("directory readable");
    assert_eq!(codes(outcome.notices()), vec!["invalid_color"]);
    assert_eq!(outcome.notices()[0].csv_row_number(), Some(3));
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    assert!(validator().validate_directory(&dir.path().join("absent")).is_err());
}
