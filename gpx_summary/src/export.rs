//! One-row-per-track CSV export.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::aggregate::{Bounds, TrackSummary};
use crate::report::format_timestamp;
use crate::SummaryError;

pub const CSV_HEADERS: [&str; 21] = [
    "Track_Number",
    "Track_Name",
    "Route_Description",
    "Start_Location",
    "End_Location",
    "Segments",
    "Total_Points",
    "Start_Time",
    "End_Time",
    "Duration_Hours",
    "Distance_KM",
    "Distance_Miles",
    "Distance_Nautical_Miles",
    "Moving_Time_Hours",
    "Average_Speed_KMH",
    "Average_Speed_MPH",
    "Average_Speed_Knots",
    "Min_Latitude",
    "Max_Latitude",
    "Min_Longitude",
    "Max_Longitude",
];

pub fn export_csv(tracks: &[TrackSummary], path: &Path) -> Result<(), SummaryError> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    write_csv_rows(tracks, &mut writer)?;
    info!("CSV data exported to: {}", path.display());
    Ok(())
}

pub fn write_csv_rows<W: Write>(
    tracks: &[TrackSummary],
    writer: &mut csv::Writer<W>,
) -> Result<(), SummaryError> {
    writer.write_record(CSV_HEADERS)?;

    for track in tracks {
        let (start_time, end_time, duration_hours) = match track.time_range {
            Some(range) => {
                let hours = range.duration_hours();
                (
                    format_timestamp(&range.start),
                    format_timestamp(&range.end),
                    if hours > 0.0 {
                        format!("{:.2}", hours)
                    } else {
                        String::new()
                    },
                )
            }
            None => (String::new(), String::new(), String::new()),
        };
        let end_place = if track.end.place != track.start.place {
            track.end.place.clone()
        } else {
            String::new()
        };
        let bound = |f: fn(&Bounds) -> f64| {
            track
                .bounds
                .as_ref()
                .map(|b| format!("{:.6}", f(b)))
                .unwrap_or_default()
        };
        let speed = &track.speed;

        writer.write_record([
            track.index.to_string(),
            track.name.clone(),
            track.route_name.clone(),
            track.start.place.clone(),
            end_place,
            track.num_segments.to_string(),
            track.total_points.to_string(),
            start_time,
            end_time,
            duration_hours,
            format!("{:.2}", speed.total_distance_km),
            format!("{:.2}", speed.distance_miles()),
            format!("{:.2}", speed.distance_nautical_miles()),
            format!("{:.2}", speed.moving_time_hours()),
            format!("{:.2}", speed.avg_speed_kmh),
            format!("{:.2}", speed.avg_speed_mph()),
            format!("{:.2}", speed.avg_speed_knots()),
            bound(|b| b.min_lat),
            bound(|b| b.max_lat),
            bound(|b| b.min_lon),
            bound(|b| b.max_lon),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Location, TimeRange};
    use crate::geo::Coordinate;
    use crate::movement::SpeedStats;
    use chrono::{TimeZone, Utc};

    fn location(place: &str) -> Location {
        Location {
            coordinate: Some(Coordinate::new(48.85, 2.35)),
            place: place.to_string(),
        }
    }

    fn summary(time_range: Option<TimeRange>) -> TrackSummary {
        TrackSummary {
            index: 3,
            name: "Evening, loop".into(),
            description: String::new(),
            route_name: "Paris, France".into(),
            num_segments: 2,
            total_points: 6,
            time_range,
            start: location("Paris, France"),
            end: location("Paris, France"),
            bounds: Some(Bounds {
                min_lat: 48.85,
                max_lat: 48.9,
                min_lon: 2.3,
                max_lon: 2.35,
            }),
            speed: SpeedStats {
                total_distance_km: 5.0,
                moving_time_s: 3600.0,
                avg_speed_kmh: 5.0,
                timed_points: 6,
                qualifying_pairs: 4,
            },
            path: Vec::new(),
        }
    }

    fn render(tracks: &[TrackSummary]) -> Vec<csv::StringRecord> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        write_csv_rows(tracks, &mut writer).unwrap();
        let bytes = writer.into_inner().unwrap();
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes.as_slice())
            .records()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_header_row() {
        let rows = render(&[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 21);
        assert_eq!(&rows[0][0], "Track_Number");
        assert_eq!(&rows[0][20], "Max_Longitude");
    }

    #[test]
    fn test_track_row() {
        let range = TimeRange {
            start: Utc.with_ymd_and_hms(2024, 3, 2, 17, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 2, 18, 15, 0).unwrap(),
        };
        let rows = render(&[summary(Some(range))]);
        let row = &rows[1];
        assert_eq!(&row[0], "3");
        assert_eq!(&row[1], "Evening, loop");
        assert_eq!(&row[3], "Paris, France");
        assert_eq!(&row[4], "", "end place matching start is blank");
        assert_eq!(&row[7], "2024-03-02 17:00:00");
        assert_eq!(&row[8], "2024-03-02 18:15:00");
        assert_eq!(&row[9], "1.25");
        assert_eq!(&row[10], "5.00");
        assert_eq!(&row[11], "3.11");
        assert_eq!(&row[12], "2.70");
        assert_eq!(&row[13], "1.00");
        assert_eq!(&row[17], "48.850000");
        assert_eq!(&row[20], "2.350000");
    }

    #[test]
    fn test_track_without_timestamps_has_blank_times() {
        let rows = render(&[summary(None)]);
        let row = &rows[1];
        assert_eq!(&row[7], "");
        assert_eq!(&row[8], "");
        assert_eq!(&row[9], "");
    }

    #[test]
    fn test_zero_duration_is_blank() {
        let t = Utc.with_ymd_and_hms(2024, 3, 2, 17, 0, 0).unwrap();
        let rows = render(&[summary(Some(TimeRange { start: t, end: t }))]);
        assert_eq!(&rows[1][7], "2024-03-02 17:00:00");
        assert_eq!(&rows[1][9], "");
    }

    #[test]
    fn test_missing_bounds_are_blank() {
        let mut track = summary(None);
        track.bounds = None;
        track.end = location("Versailles, France");
        let rows = render(&[track]);
        assert_eq!(&rows[1][4], "Versailles, France");
        assert!((17..21).all(|i| rows[1][i].is_empty()));
    }
}
