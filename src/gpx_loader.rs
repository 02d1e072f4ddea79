/// GPX Loader - turn GPX track or route data into ordered raw points
///
/// Points are taken in file order across all tracks and their segments. When a
/// file has no track points (common for race course downloads) its routes are
/// used instead. Points without elevation are skipped.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use gpx::{read, Gpx, Waypoint};

use crate::error::{PacerError, Result};
use crate::track_reducer::RawPoint;

#[derive(Debug, Clone)]
pub struct TrackFile {
    pub name: String,
    pub points: Vec<RawPoint>,
}

impl TrackFile {
    pub fn timed_points(&self) -> usize {
        self.points.iter().filter(|p| p.timestamp.is_some()).count()
    }
}

pub fn load_track(path: &Path) -> Result<TrackFile> {
    let file = File::open(path)?;
    let fallback_name = clean_filename(
        path.file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown"),
    );
    parse_track(BufReader::new(file), &fallback_name)
}

/// Parses GPX from any reader; `fallback_name` is used when the file names no track.
pub fn parse_track<R: Read>(reader: R, fallback_name: &str) -> Result<TrackFile> {
    let gpx = read(reader).map_err(|e| PacerError::GpxParse(e.to_string()))?;

    let name = gpx
        .tracks
        .iter()
        .find_map(|t| t.name.clone())
        .or_else(|| gpx.routes.iter().find_map(|r| r.name.clone()))
        .unwrap_or_else(|| fallback_name.to_string());

    let points = extract_points(&gpx);
    if points.is_empty() {
        return Err(PacerError::EmptyTrack(name));
    }

    log::info!("loaded '{}': {} points", name, points.len());
    Ok(TrackFile { name, points })
}

fn extract_points(gpx: &Gpx) -> Vec<RawPoint> {
    let mut points: Vec<RawPoint> = gpx
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .filter_map(to_raw_point)
        .collect();

    if points.is_empty() {
        points = gpx
            .routes
            .iter()
            .flat_map(|route| route.points.iter())
            .filter_map(to_raw_point)
            .collect();
    }

    points
}

fn to_raw_point(waypoint: &Waypoint) -> Option<RawPoint> {
    let elevation = waypoint.elevation?;
    let point = waypoint.point();
    Some(RawPoint {
        latitude: point.y(),
        longitude: point.x(),
        elevation,
        timestamp: waypoint.time.as_ref().and_then(to_utc),
    })
}

fn to_utc(time: &gpx::Time) -> Option<DateTime<Utc>> {
    let formatted = time.format().ok()?;
    DateTime::parse_from_rfc3339(&formatted)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn clean_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}
