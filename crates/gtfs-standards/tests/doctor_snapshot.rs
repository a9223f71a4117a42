use gtfs_standards::hash::sha256_hex;
use gtfs_standards::{DoctorReport, JsonSchemaParser, SchemaRegistry};

const DOCUMENT: &str = r#"{
  "name": "mini",
  "version": "1",
  "files": [
    {
      "filename": "trips.txt",
      "required": true,
      "key": ["trip_id"],
      "depends_on": ["routes.txt"],
      "fields": [
        {"name": "trip_id", "type": "id", "required": true},
        {"name": "route_id", "type": "id", "required": true,
         "references": {"file": "routes.txt", "field": "route_id"}}
      ]
    },
    {
      "filename": "routes.txt",
      "required": true,
      "key": ["route_id"],
      "fields": [
        {"name": "route_id", "type": "id", "required": true},
        {"name": "route_color", "type": "color"}
      ]
    },
    {
      "filename": "feed_info.txt",
      "fields": [
        {"name": "feed_publisher_name", "type": "text", "required": true}
      ]
    }
  ]
}"#;

#[test]
fn doctor_report_is_stable() {
    let (registry, summary) =
        SchemaRegistry::from_document("mini.json", DOCUMENT, &JsonSchemaParser).unwrap();
    let report = DoctorReport::from_verify_summary(&registry, &summary).unwrap();

    assert_eq!(report.schema, "gtfs-validator.schema-doctor");
    assert_eq!(report.sha256, sha256_hex(DOCUMENT.as_bytes()));
    assert_eq!(
        report.dependency_order,
        vec!["routes.txt", "trips.txt", "feed_info.txt"]
    );

    insta::assert_json_snapshot!(report.counts, @r#"
    {
      "files": 3,
      "required_files": 2,
      "keyed_files": 2,
      "fields": 5,
      "required_fields": 4,
      "references": 1
    }
    "#);

    insta::assert_json_snapshot!(report.files, @r#"
    [
      {
        "filename": "trips.txt",
        "required": true,
        "fields": 2,
        "required_fields": 2,
        "key": [
          "trip_id"
        ],
        "depends_on": [
          "routes.txt"
        ]
      },
      {
        "filename": "routes.txt",
        "required": true,
        "fields": 2,
        "required_fields": 1,
        "key": [
          "route_id"
        ],
        "depends_on": []
      },
      {
        "filename": "feed_info.txt",
        "required": false,
        "fields": 1,
        "required_fields": 1,
        "key": [],
        "depends_on": []
      }
    ]
    "#);
}
