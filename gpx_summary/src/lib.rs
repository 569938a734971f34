//! Track summaries for GPX recordings: moving distance and speed, bounds, time
//! ranges and start/end place names, plus text, CSV and HTML renderers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub mod aggregate;
pub mod export;
pub mod geo;
pub mod html;
pub mod ingest;
pub mod movement;
pub mod places;
pub mod report;

pub use aggregate::{
    route_name, summarize_collection, summarize_track, Bounds, CollectionStats, Location,
    TimeRange, TrackSummary, UNKNOWN_PLACE,
};
pub use geo::{haversine_km, Coordinate};
pub use ingest::read_tracks;
pub use movement::{moving_stats, SpeedStats};
pub use places::{
    format_place, Address, GeocodeError, GeocoderConfig, NominatimGeocoder, OfflineGeocoder,
    PlaceResolver, ReverseGeocoder,
};

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("malformed XML: {0}")]
    Xml(String),
    #[error("failed to parse GPX document: {0}")]
    GpxParse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("CSV output failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to serialize visualization data: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Analysis thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Params {
    /// Consecutive points closer than this are treated as GPS noise.
    pub min_movement_km: f64,
    /// Gaps longer than this are treated as dropouts, not movement.
    pub max_gap_s: f64,
    /// The end point gets its own place lookup only beyond this distance from the start.
    pub end_lookup_min_km: f64,
    /// Process only the first N tracks. `Some(0)` means no cap.
    pub max_tracks: Option<usize>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            min_movement_km: 0.01,
            max_gap_s: 3600.0,
            end_lookup_min_km: 0.5,
            max_tracks: None,
        }
    }
}

/// A single track point. Never mutated after ingestion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub coordinate: Coordinate,
    pub time: Option<DateTime<Utc>>,
}

impl Point {
    pub fn new(lat: f64, lon: f64, time: Option<DateTime<Utc>>) -> Self {
        Self {
            coordinate: Coordinate::new(lat, lon),
            time,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Segment {
    pub points: Vec<Point>,
}

/// One recorded route. Points keep file order within each segment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    /// 1-based position in the source document.
    pub index: usize,
    pub name: String,
    pub description: String,
    pub segments: Vec<Segment>,
}

impl Track {
    /// All points across segments, in file order.
    pub fn points(&self) -> impl Iterator<Item = &Point> + '_ {
        self.segments.iter().flat_map(|segment| segment.points.iter())
    }
}

/// Parse a GPX document and summarize each track, honouring `params.max_tracks`.
///
/// The whole document is parsed before any track is processed, so a malformed
/// file fails without producing partial summaries.
pub fn analyze_gpx<G: ReverseGeocoder>(
    input: &[u8],
    resolver: &PlaceResolver<G>,
    params: &Params,
) -> Result<Vec<TrackSummary>, SummaryError> {
    let mut tracks = read_tracks(input)?;
    info!("Found {} tracks", tracks.len());

    if let Some(limit) = params.max_tracks.filter(|&n| n > 0) {
        if tracks.len() > limit {
            tracks.truncate(limit);
            info!("Limited to processing first {} tracks", limit);
        }
    }

    let total = tracks.len();
    let summaries = tracks
        .iter()
        .map(|track| {
            info!("Processing track {}/{}", track.index, total);
            summarize_track(track, resolver, params)
        })
        .collect();
    Ok(summaries)
}
