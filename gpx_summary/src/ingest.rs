//! GPX ingestion.
//!
//! The `gpx` reader rejects a whole document when a single point has a bad
//! coordinate, timestamp or child element. A streaming pre-clean pass
//! therefore runs first: it drops points without usable coordinates, strips
//! every point child other than `<time>`, rewrites each `<time>` to canonical
//! RFC 3339 UTC and removes the ones that cannot be parsed, so a bad point
//! costs only itself (or only its timestamp).

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, warn};

use crate::{Point, Segment, SummaryError, Track};

const POINT_ELEMENTS: [&[u8]; 3] = [b"trkpt", b"rtept", b"wpt"];
const NAIVE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// What the pre-clean pass removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrecleanReport {
    pub dropped_points: usize,
    pub dropped_times: usize,
}

/// Parse a GPX document into tracks, skipping unusable points and timestamps.
pub fn read_tracks(input: &[u8]) -> Result<Vec<Track>, SummaryError> {
    let (cleaned, report) = preclean_gpx(input)?;
    if report.dropped_points > 0 {
        warn!(
            "Skipped {} points with missing or invalid coordinates",
            report.dropped_points
        );
    }
    if report.dropped_times > 0 {
        warn!("Ignored {} unparseable timestamps", report.dropped_times);
    }

    let gpx = gpx::read(cleaned.as_slice()).map_err(|e| SummaryError::GpxParse(e.to_string()))?;

    let tracks = gpx
        .tracks
        .into_iter()
        .enumerate()
        .map(|(i, track)| {
            let index = i + 1;
            let segments = track
                .segments
                .into_iter()
                .map(|segment| Segment {
                    points: segment
                        .points
                        .iter()
                        .map(|waypoint| {
                            let geo = waypoint.point();
                            let time = waypoint.time.as_ref().and_then(utc_time);
                            Point::new(geo.y(), geo.x(), time)
                        })
                        .collect(),
                })
                .collect();
            Track {
                index,
                name: track
                    .name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| format!("Unnamed Track {}", index)),
                description: track.description.unwrap_or_default(),
                segments,
            }
        })
        .collect();
    Ok(tracks)
}

fn utc_time(time: &gpx::Time) -> Option<DateTime<Utc>> {
    let iso = match time.format() {
        Ok(iso) => iso,
        Err(err) => {
            debug!("dropping unformattable timestamp: {}", err);
            return None;
        }
    };
    DateTime::parse_from_rfc3339(&iso)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Parse a GPX timestamp. RFC 3339 (with `Z` or an offset) is preferred; a
/// naive ISO-8601 date-time is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Rewrite a GPX document so the strict reader accepts it.
pub fn preclean_gpx(input: &[u8]) -> Result<(Vec<u8>, PrecleanReport), SummaryError> {
    // Text outside points is copied verbatim, surrounding whitespace included.
    let mut reader = Reader::from_reader(input);

    let mut writer = Writer::new(Vec::with_capacity(input.len()));
    let mut report = PrecleanReport::default();
    let mut in_point = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                return Err(SummaryError::Xml(format!(
                    "{} (at byte {})",
                    err,
                    reader.buffer_position()
                )))
            }
        };

        match event {
            Event::Start(e) if in_point && e.local_name().as_ref() != b"time" => {
                debug!("skipping <{}> inside point", local_name_lossy(&e));
                reader
                    .read_to_end(e.name())
                    .map_err(|err| SummaryError::Xml(err.to_string()))?;
            }
            Event::Empty(e) if in_point && e.local_name().as_ref() != b"time" => {
                debug!("skipping <{}/> inside point", local_name_lossy(&e));
            }
            Event::Text(_) | Event::CData(_) if in_point => {}
            Event::End(e) if in_point && is_point_end(&e) => {
                in_point = false;
                write_event(&mut writer, Event::End(e))?;
            }
            Event::Start(e) if is_point_element(&e) => {
                if point_coordinate(&e).is_some() {
                    in_point = true;
                    write_event(&mut writer, Event::Start(e))?;
                } else {
                    report.dropped_points += 1;
                    debug!("dropping point without usable lat/lon");
                    reader
                        .read_to_end(e.name())
                        .map_err(|err| SummaryError::Xml(err.to_string()))?;
                }
            }
            Event::Empty(e) if is_point_element(&e) => {
                if point_coordinate(&e).is_some() {
                    write_event(&mut writer, Event::Empty(e))?;
                } else {
                    report.dropped_points += 1;
                    debug!("dropping point without usable lat/lon");
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"time" => {
                let raw = reader
                    .read_text(e.name())
                    .map_err(|err| SummaryError::Xml(err.to_string()))?;
                match parse_timestamp(&raw) {
                    Some(time) => {
                        let iso = time.to_rfc3339_opts(SecondsFormat::AutoSi, true);
                        let end = e.to_end().into_owned();
                        write_event(&mut writer, Event::Start(e))?;
                        write_event(&mut writer, Event::Text(BytesText::new(&iso)))?;
                        write_event(&mut writer, Event::End(end))?;
                    }
                    None => {
                        report.dropped_times += 1;
                        debug!("dropping unparseable timestamp {:?}", raw);
                    }
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"time" => {
                report.dropped_times += 1;
            }
            Event::Start(e) if is_gpx_root(&e) => {
                write_event(&mut writer, Event::Start(with_version(e)))?;
            }
            Event::Eof => break,
            other => write_event(&mut writer, other)?,
        }
    }

    Ok((writer.into_inner(), report))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), SummaryError> {
    writer
        .write_event(event)
        .map_err(|err| SummaryError::Xml(err.to_string()))
}

fn is_point_name(local: &[u8]) -> bool {
    POINT_ELEMENTS.iter().any(|name| *name == local)
}

fn is_point_element(e: &BytesStart<'_>) -> bool {
    is_point_name(e.local_name().as_ref())
}

fn is_point_end(e: &BytesEnd<'_>) -> bool {
    is_point_name(e.local_name().as_ref())
}

fn local_name_lossy(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn is_gpx_root(e: &BytesStart<'_>) -> bool {
    e.local_name().as_ref() == b"gpx"
}

/// Some exporters omit the mandatory `version` attribute.
fn with_version(mut e: BytesStart<'_>) -> BytesStart<'_> {
    if matches!(e.try_get_attribute("version"), Ok(None)) {
        e.push_attribute(("version", "1.1"));
    }
    e
}

fn point_coordinate(e: &BytesStart<'_>) -> Option<(f64, f64)> {
    let lat = attribute_f64(e, "lat")?;
    let lon = attribute_f64(e, "lon")?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}

fn attribute_f64(e: &BytesStart<'_>, name: &str) -> Option<f64> {
    let attr = e.try_get_attribute(name).ok()??;
    let value = attr.unescape_value().ok()?;
    value.trim().parse::<f64>().ok()
}
