//! Self-contained animated HTML view of every track, drawn as displacement
//! from its own first point so all tracks share one origin.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::TrackSummary;
use crate::geo::Coordinate;
use crate::SummaryError;

const TRACK_VIEWER_HTML: &str = include_str!("../static/track_viewer.html");
const DATA_PLACEHOLDER: &str = "__TRACK_DATA__";

/// Longest path handed to the page per track.
pub const MAX_PATH_POINTS: usize = 2000;

#[derive(Debug, Serialize)]
struct TrackPath<'a> {
    index: usize,
    name: &'a str,
    route: &'a str,
    distance_km: f64,
    /// `[east_km, north_km]` from the track's first point.
    points: Vec<[f64; 2]>,
}

/// East/north offsets in km of each coordinate from the first one.
pub fn relative_path(path: &[Coordinate]) -> Vec<(f64, f64)> {
    let Some(origin) = path.first() else {
        return Vec::new();
    };
    path.iter().map(|c| c.displacement_km(origin)).collect()
}

/// Keep every n-th item so at most `max` remain, always ending on the last one.
pub fn decimate<T: Copy>(items: &[T], max: usize) -> Vec<T> {
    if items.len() <= max || max < 2 {
        return items.to_vec();
    }
    let stride = items.len().div_ceil(max);
    let mut kept: Vec<T> = items.iter().step_by(stride).copied().collect();
    if (items.len() - 1) % stride != 0 {
        if kept.len() == max {
            kept.pop();
        }
        if let Some(last) = items.last() {
            kept.push(*last);
        }
    }
    kept
}

fn track_payload(tracks: &[TrackSummary]) -> Vec<TrackPath<'_>> {
    tracks
        .iter()
        .filter(|track| {
            let drawable = !track.path.is_empty();
            if !drawable {
                debug!("Track {} has no points to draw", track.index);
            }
            drawable
        })
        .map(|track| TrackPath {
            index: track.index,
            name: &track.name,
            route: &track.route_name,
            distance_km: track.speed.total_distance_km,
            points: decimate(&relative_path(&track.path), MAX_PATH_POINTS)
                .into_iter()
                .map(|(east, north)| [east, north])
                .collect(),
        })
        .collect()
}

pub fn render_html(tracks: &[TrackSummary]) -> Result<String, SummaryError> {
    let json = serde_json::to_string(&track_payload(tracks))?;
    // Track names are user text; keep them from closing the script element.
    let json = json.replace("</", "<\\/");
    Ok(TRACK_VIEWER_HTML.replace(DATA_PLACEHOLDER, &json))
}

pub fn export_html(tracks: &[TrackSummary], path: &Path) -> Result<(), SummaryError> {
    let page = render_html(tracks)?;
    fs::write(path, page)?;
    info!("HTML visualization written to: {}", path.display());
    Ok(())
}
