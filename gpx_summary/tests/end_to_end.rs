//! Whole-pipeline tests: GPX bytes in, summaries and export files out.

use gpx_summary::export::export_csv;
use gpx_summary::html::export_html;
use gpx_summary::report::render_report;
use gpx_summary::{
    analyze_gpx, Address, Coordinate, GeocodeError, OfflineGeocoder, Params, PlaceResolver,
    ReverseGeocoder,
};
use std::time::Duration;
use tempfile::TempDir;

/// Degrees of latitude per kilometre along a meridian.
const DEG_PER_KM: f64 = 1.0 / 111.194_926_644_558_7;

/// Names everything north of 45.02 "Northtown", the rest "Southville".
struct TwoTowns;

impl ReverseGeocoder for TwoTowns {
    fn reverse(&self, coordinate: Coordinate) -> Result<Option<Address>, GeocodeError> {
        let town = if coordinate.lat > 45.02 {
            "Northtown"
        } else {
            "Southville"
        };
        Ok(Some(Address {
            town: Some(town.to_string()),
            country: Some("Freedonia".to_string()),
            ..Address::default()
        }))
    }
}

fn trkpt(km_north: f64, minute: u32) -> String {
    format!(
        r#"<trkpt lat="{:.6}" lon="0.000000"><time>2024-06-01T08:{:02}:00Z</time></trkpt>"#,
        45.0 + km_north * DEG_PER_KM,
        minute
    )
}

/// One track, two segments of three points, 5 km north over one hour.
fn commute_gpx() -> String {
    let first: String = [(0.0, 0), (1.0, 12), (2.0, 24)]
        .iter()
        .map(|&(km, m)| trkpt(km, m))
        .collect();
    let second: String = [(3.0, 36), (4.0, 48), (5.0, 59)]
        .iter()
        .map(|&(km, m)| trkpt(km, m))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Morning commute</name>
    <desc>Along the meridian</desc>
    <trkseg>{}</trkseg>
    <trkseg>{}</trkseg>
  </trk>
  <trk>
    <trkseg>
      <trkpt lat="10.0" lon="10.0"></trkpt>
      <trkpt lat="10.001" lon="10.0"></trkpt>
    </trkseg>
  </trk>
</gpx>"#,
        first, second
    )
}

fn fast_resolver<G: ReverseGeocoder>(geocoder: G) -> PlaceResolver<G> {
    PlaceResolver::new(geocoder).with_retry(3, Duration::ZERO)
}

#[test]
fn test_two_segment_track_summary() {
    let gpx = commute_gpx();
    let summaries = analyze_gpx(
        gpx.as_bytes(),
        &fast_resolver(TwoTowns),
        &Params::default(),
    )
    .unwrap();
    assert_eq!(summaries.len(), 2);

    let commute = &summaries[0];
    assert_eq!(commute.index, 1);
    assert_eq!(commute.name, "Morning commute");
    assert_eq!(commute.description, "Along the meridian");
    assert_eq!(commute.num_segments, 2);
    assert_eq!(commute.total_points, 6);
    assert_eq!(commute.speed.qualifying_pairs, 5);
    // Latitudes are written to 6 decimals, so the path is 4.999991 km.
    assert!((commute.speed.total_distance_km - 4.999_991).abs() < 1e-5);
    assert_eq!(commute.speed.moving_time_s, 59.0 * 60.0);
    // 4.999991 km over 59 minutes.
    assert!((commute.speed.avg_speed_kmh - 5.084_737).abs() < 1e-5);
    assert_eq!(commute.start.place, "Southville, Freedonia");
    assert_eq!(commute.end.place, "Northtown, Freedonia");
    assert_eq!(
        commute.route_name,
        "Southville, Freedonia - Northtown, Freedonia"
    );

    let untimed = &summaries[1];
    assert_eq!(untimed.name, "Unnamed Track 2");
    assert!(untimed.time_range.is_none());
    assert_eq!(untimed.speed.total_distance_km, 0.0);
    assert_eq!(untimed.route_name, "Southville, Freedonia");
}

#[test]
fn test_max_tracks_limits_processing() {
    let gpx = commute_gpx();
    let params = Params {
        max_tracks: Some(1),
        ..Params::default()
    };
    let summaries = analyze_gpx(gpx.as_bytes(), &fast_resolver(OfflineGeocoder), &params).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].start.place, "(45.0000, 0.0000)");
    assert_eq!(summaries[0].end.place, "(45.0450, 0.0000)");
}

#[test]
fn test_malformed_document_produces_nothing() {
    let broken = b"<gpx version=\"1.1\"><trk><trkseg><trkpt lat=\"1\" lon=\"2\">";
    let result = analyze_gpx(broken, &fast_resolver(OfflineGeocoder), &Params::default());
    assert!(result.is_err());
}

#[test]
fn test_report_and_exports_are_written() {
    let gpx = commute_gpx();
    let summaries = analyze_gpx(
        gpx.as_bytes(),
        &fast_resolver(TwoTowns),
        &Params::default(),
    )
    .unwrap();

    let report = render_report(&summaries);
    assert!(report.contains("Total number of tracks: 2"));
    assert!(report.contains("SUMMARY STATISTICS"));
    assert!(report.contains("Tracks with Timestamps: 1"));

    let dir = TempDir::new().expect("failed to create temp dir");
    let csv_path = dir.path().join("tracks.csv");
    let html_path = dir.path().join("tracks.html");
    export_csv(&summaries, &csv_path).unwrap();
    export_html(&summaries, &html_path).unwrap();

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 21);
    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "Morning commute");
    assert_eq!(&rows[0][4], "Northtown, Freedonia");
    assert_eq!(&rows[0][7], "2024-06-01 08:00:00");
    assert_eq!(&rows[0][9], "0.98");
    assert_eq!(&rows[0][10], "5.00");
    assert_eq!(&rows[1][7], "");
    assert_eq!(&rows[1][9], "");

    let page = std::fs::read_to_string(&html_path).unwrap();
    assert!(page.contains("Morning commute"));
    assert!(page.contains("Unnamed Track 2"));
}

#[test]
fn test_export_to_missing_directory_fails() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("no_such_dir").join("out.csv");
    assert!(export_csv(&[], &path).is_err());
}
