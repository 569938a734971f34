//! Per-track summaries and the cross-track statistics built from them.

use chrono::{DateTime, Duration, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::geo::{Coordinate, KM_TO_MILES, KM_TO_NAUTICAL_MILES};
use crate::movement::{moving_stats, SpeedStats};
use crate::places::{PlaceResolver, ReverseGeocoder};
use crate::{Params, Track};

/// Place label for tracks that have no points at all.
pub const UNKNOWN_PLACE: &str = "Unknown";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinate: Option<Coordinate>,
    pub place: String,
}

impl Location {
    fn unknown() -> Self {
        Self {
            coordinate: None,
            place: UNKNOWN_PLACE.to_string(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.place != UNKNOWN_PLACE
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    fn around(c: Coordinate) -> Self {
        Self {
            min_lat: c.lat,
            max_lat: c.lat,
            min_lon: c.lon,
            max_lon: c.lon,
        }
    }

    fn extend(self, c: Coordinate) -> Self {
        Self {
            min_lat: self.min_lat.min(c.lat),
            max_lat: self.max_lat.max(c.lat),
            min_lon: self.min_lon.min(c.lon),
            max_lon: self.max_lon.max(c.lon),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    fn at(t: DateTime<Utc>) -> Self {
        Self { start: t, end: t }
    }

    fn include(self, t: DateTime<Utc>) -> Self {
        Self {
            start: self.start.min(t),
            end: self.end.max(t),
        }
    }

    fn merge(self, other: TimeRange) -> Self {
        self.include(other.start).include(other.end)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 3_600_000.0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackSummary {
    pub index: usize,
    pub name: String,
    pub description: String,
    pub route_name: String,
    pub num_segments: usize,
    pub total_points: usize,
    pub time_range: Option<TimeRange>,
    pub start: Location,
    pub end: Location,
    pub bounds: Option<Bounds>,
    pub speed: SpeedStats,
    /// Every point's coordinate in file order.
    pub path: Vec<Coordinate>,
}

/// File-order pass over a track's points.
#[derive(Default)]
struct TrackScan {
    total_points: usize,
    first: Option<Coordinate>,
    last: Option<Coordinate>,
    time_range: Option<TimeRange>,
    bounds: Option<Bounds>,
    path: Vec<Coordinate>,
}

fn scan_track(track: &Track) -> TrackScan {
    track.points().fold(TrackScan::default(), |mut scan, point| {
        let c = point.coordinate;
        scan.total_points += 1;
        scan.first.get_or_insert(c);
        scan.last = Some(c);
        scan.bounds = Some(match scan.bounds {
            Some(bounds) => bounds.extend(c),
            None => Bounds::around(c),
        });
        if let Some(t) = point.time {
            scan.time_range = Some(match scan.time_range {
                Some(range) => range.include(t),
                None => TimeRange::at(t),
            });
        }
        scan.path.push(c);
        scan
    })
}

/// `"A"` when both ends resolve to the same place, `"A - B"` otherwise.
pub fn route_name(start_place: &str, end_place: &str) -> String {
    if start_place == end_place {
        start_place.to_string()
    } else {
        format!("{} - {}", start_place, end_place)
    }
}

/// Build the summary for one track.
///
/// The end point is only geocoded when it lies more than
/// `params.end_lookup_min_km` from the start; otherwise the start's place is
/// reused.
pub fn summarize_track<G: ReverseGeocoder>(
    track: &Track,
    resolver: &PlaceResolver<G>,
    params: &Params,
) -> TrackSummary {
    let scan = scan_track(track);
    let speed = moving_stats(track.points(), params);

    let (start, end) = match (scan.first, scan.last) {
        (Some(first), Some(last)) => {
            let start_place = resolver.resolve(first);
            let end_place = if first.distance_km(&last) > params.end_lookup_min_km {
                resolver.resolve(last)
            } else {
                start_place.clone()
            };
            (
                Location {
                    coordinate: Some(first),
                    place: start_place,
                },
                Location {
                    coordinate: Some(last),
                    place: end_place,
                },
            )
        }
        _ => (Location::unknown(), Location::unknown()),
    };

    TrackSummary {
        index: track.index,
        name: track.name.clone(),
        description: track.description.clone(),
        route_name: route_name(&start.place, &end.place),
        num_segments: track.segments.len(),
        total_points: scan.total_points,
        time_range: scan.time_range,
        start,
        end,
        bounds: scan.bounds,
        speed,
        path: scan.path,
    }
}

/// Totals and extremes across every summarized track.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_tracks: usize,
    pub total_segments: usize,
    pub total_points: usize,
    pub time_span: Option<TimeRange>,
    pub tracks_with_time: usize,
    pub total_distance_km: f64,
    pub total_moving_time_s: f64,
    /// Longest, shortest and mean distance over tracks that moved at all.
    pub longest_km: Option<f64>,
    pub shortest_km: Option<f64>,
    pub average_km: Option<f64>,
    /// Fastest and slowest average speed over tracks with a non-zero speed.
    pub fastest_kmh: Option<f64>,
    pub slowest_kmh: Option<f64>,
}

impl CollectionStats {
    pub fn total_distance_miles(&self) -> f64 {
        self.total_distance_km * KM_TO_MILES
    }

    pub fn total_distance_nautical_miles(&self) -> f64 {
        self.total_distance_km * KM_TO_NAUTICAL_MILES
    }

    pub fn total_moving_hours(&self) -> f64 {
        self.total_moving_time_s / 3600.0
    }

    pub fn overall_speed_kmh(&self) -> Option<f64> {
        let hours = self.total_moving_hours();
        (hours > 0.0).then(|| self.total_distance_km / hours)
    }
}

#[derive(Default)]
struct CollectionAcc {
    stats: CollectionStats,
    distances: Vec<f64>,
    speeds: Vec<f64>,
}

pub fn summarize_collection(tracks: &[TrackSummary]) -> CollectionStats {
    let acc = tracks
        .iter()
        .fold(CollectionAcc::default(), |mut acc, track| {
            let stats = &mut acc.stats;
            stats.total_tracks += 1;
            stats.total_segments += track.num_segments;
            stats.total_points += track.total_points;
            if let Some(range) = track.time_range {
                stats.tracks_with_time += 1;
                stats.time_span = Some(match stats.time_span {
                    Some(span) => span.merge(range),
                    None => range,
                });
            }
            if track.speed.total_distance_km > 0.0 {
                stats.total_distance_km += track.speed.total_distance_km;
                stats.total_moving_time_s += track.speed.moving_time_s;
                acc.distances.push(track.speed.total_distance_km);
                if track.speed.avg_speed_kmh > 0.0 {
                    acc.speeds.push(track.speed.avg_speed_kmh);
                }
            }
            acc
        });

    let mut stats = acc.stats;
    let (longest, shortest) = extremes(&acc.distances);
    stats.longest_km = longest;
    stats.shortest_km = shortest;
    stats.average_km = (!acc.distances.is_empty())
        .then(|| acc.distances.iter().sum::<f64>() / acc.distances.len() as f64);
    let (fastest, slowest) = extremes(&acc.speeds);
    stats.fastest_kmh = fastest;
    stats.slowest_kmh = slowest;
    stats
}

fn extremes(values: &[f64]) -> (Option<f64>, Option<f64>) {
    let max = values.iter().copied().map(OrderedFloat).max();
    let min = values.iter().copied().map(OrderedFloat).min();
    (max.map(|v| v.0), min.map(|v| v.0))
}
