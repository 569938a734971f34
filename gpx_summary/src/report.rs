//! Plain-text track report.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::aggregate::{summarize_collection, TrackSummary};
use crate::geo::{km_to_miles, km_to_nautical_miles};

const WIDE_RULE: usize = 80;
const TRACK_RULE: usize = 70;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// `H:MM:SS`, prefixed with `N day(s), ` past 24 hours.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.num_milliseconds().max(0);
    let days = total_ms / 86_400_000;
    let rem = total_ms % 86_400_000;
    let hours = rem / 3_600_000;
    let minutes = rem / 60_000 % 60;
    let seconds = rem / 1000 % 60;
    let millis = rem % 1000;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!(
            "{} day{}, ",
            days,
            if days == 1 { "" } else { "s" }
        ));
    }
    out.push_str(&format!("{}:{:02}:{:02}", hours, minutes, seconds));
    if millis > 0 {
        out.push_str(&format!(".{:06}", millis * 1000));
    }
    out
}

pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn render_header(source: &str, generated: NaiveDateTime) -> String {
    format!(
        "GPX Track Analysis - {}\nSource file: {}\n",
        generated.format(TIME_FORMAT),
        source
    )
}

/// Per-track blocks, followed by collection statistics when there is more
/// than one track.
pub fn render_report(tracks: &[TrackSummary]) -> String {
    let mut report = String::new();
    if tracks.is_empty() {
        report.push_str("No tracks found in the GPX file.\n");
        return report;
    }

    let rule = "=".repeat(WIDE_RULE);
    report.push_str(&format!("\n{}\n", rule));
    report.push_str("GPX FILE SUMMARY\n");
    report.push_str(&format!("{}\n", rule));
    report.push_str(&format!("Total number of tracks: {}\n", tracks.len()));
    report.push_str(&format!("{}\n", rule));

    for track in tracks {
        render_track(&mut report, track);
    }

    if tracks.len() > 1 {
        render_collection(&mut report, tracks, &rule);
    }

    report.push('\n');
    report
}

fn render_track(report: &mut String, track: &TrackSummary) {
    report.push_str(&format!("\nTrack #{}\n", track.index));
    report.push_str(&format!("  Name: {}\n", track.name));
    report.push_str(&format!("  Route: {}\n", track.route_name));
    if !track.description.is_empty() {
        report.push_str(&format!("  Description: {}\n", track.description));
    }
    report.push_str(&format!("  Segments: {}\n", track.num_segments));
    report.push_str(&format!("  Total Points: {}\n", track.total_points));

    if let Some(range) = track.time_range {
        report.push_str(&format!(
            "  Time Range: {} to {}\n",
            format_timestamp(&range.start),
            format_timestamp(&range.end)
        ));
        report.push_str(&format!(
            "  Duration: {}\n",
            format_duration(range.duration())
        ));
    }

    let speed = &track.speed;
    if speed.total_distance_km > 0.0 {
        report.push_str(&format!(
            "  Distance: {:.2} km ({:.2} miles, {:.2} nm)\n",
            speed.total_distance_km,
            speed.distance_miles(),
            speed.distance_nautical_miles()
        ));
        report.push_str(&format!(
            "  Moving Time: {:.2} hours\n",
            speed.moving_time_hours()
        ));
        report.push_str(&format!(
            "  Average Speed: {:.2} km/h ({:.2} mph, {:.2} knots)\n",
            speed.avg_speed_kmh,
            speed.avg_speed_mph(),
            speed.avg_speed_knots()
        ));
    }

    if track.start.is_known() {
        report.push_str(&format!("  Start: {}\n", track.start.place));
    }
    if track.end.is_known() && track.end.place != track.start.place {
        report.push_str(&format!("  End: {}\n", track.end.place));
    }

    if let Some(b) = track.bounds {
        report.push_str(&format!(
            "  Bounds: ({:.6}, {:.6}) to ({:.6}, {:.6})\n",
            b.min_lat, b.min_lon, b.max_lat, b.max_lon
        ));
    }

    report.push_str(&format!("  {}\n", "-".repeat(TRACK_RULE)));
}

fn render_collection(report: &mut String, tracks: &[TrackSummary], rule: &str) {
    let stats = summarize_collection(tracks);

    report.push_str(&format!("\n{}\n", rule));
    report.push_str("SUMMARY STATISTICS\n");
    report.push_str(&format!("{}\n", rule));
    report.push_str(&format!("Total Tracks: {}\n", stats.total_tracks));
    report.push_str(&format!("Total Segments: {}\n", stats.total_segments));
    report.push_str(&format!(
        "Total Points: {}\n",
        group_thousands(stats.total_points)
    ));

    if let Some(span) = stats.time_span {
        report.push_str(&format!(
            "Time Span: {} to {}\n",
            format_timestamp(&span.start),
            format_timestamp(&span.end)
        ));
        report.push_str(&format!(
            "Total Elapsed Time: {}\n",
            format_duration(span.duration())
        ));
        report.push_str(&format!(
            "Tracks with Timestamps: {}\n",
            stats.tracks_with_time
        ));
    }

    if stats.total_distance_km > 0.0 {
        report.push_str(&format!(
            "Total Distance: {:.2} km ({:.2} miles, {:.2} nm)\n",
            stats.total_distance_km,
            stats.total_distance_miles(),
            stats.total_distance_nautical_miles()
        ));
        report.push_str(&format!(
            "Total Moving Time: {:.2} hours\n",
            stats.total_moving_hours()
        ));
        if let Some(kmh) = stats.overall_speed_kmh() {
            report.push_str(&format!(
                "Overall Average Speed: {:.2} km/h ({:.2} mph, {:.2} knots)\n",
                kmh,
                km_to_miles(kmh),
                km_to_nautical_miles(kmh)
            ));
        }
    }

    if let (Some(longest), Some(shortest), Some(average)) =
        (stats.longest_km, stats.shortest_km, stats.average_km)
    {
        report.push_str(&format!("Longest Track: {:.2} km\n", longest));
        report.push_str(&format!("Shortest Track: {:.2} km\n", shortest));
        report.push_str(&format!("Average Track Length: {:.2} km\n", average));
    }

    if let (Some(fastest), Some(slowest)) = (stats.fastest_kmh, stats.slowest_kmh) {
        report.push_str(&format!("Fastest Average Speed: {:.2} km/h\n", fastest));
        report.push_str(&format!("Slowest Average Speed: {:.2} km/h\n", slowest));
    }

    report.push_str(&format!("{}\n", rule));
}
