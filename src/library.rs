/// Track library - discover GPX files in a folder and predict them all against one reference
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::Writer;
use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{PacerError, Result};
use crate::gpx_loader::load_track;
use crate::pace_predictor::PredictionConfig;
use crate::report::format_hours;
use crate::session::{Prediction, ReferenceModel, TargetTrack};
use crate::track_reducer::ReducerConfig;

/// All `*.gpx` files below `folder`, sorted by path.
pub fn discover_gpx_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder) {
        let entry = entry.map_err(|e| PacerError::Io(e.into()))?;
        if entry.file_type().is_file() && is_gpx(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn is_gpx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("gpx"))
        .unwrap_or(false)
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub path: PathBuf,
    pub result: Result<Prediction>,
}

/// Predicts every file independently; one bad file does not stop the rest.
pub fn predict_all(
    reference: &ReferenceModel,
    files: &[PathBuf],
    reducer: &ReducerConfig,
    config: &PredictionConfig,
) -> Vec<BatchOutcome> {
    log::info!(
        "predicting {} targets on {} threads",
        files.len(),
        rayon::current_num_threads()
    );

    files
        .par_iter()
        .map(|path| BatchOutcome {
            path: path.clone(),
            result: predict_file(reference, path, reducer, config),
        })
        .collect()
}

fn predict_file(
    reference: &ReferenceModel,
    path: &Path,
    reducer: &ReducerConfig,
    config: &PredictionConfig,
) -> Result<Prediction> {
    let track = load_track(path)?;
    TargetTrack::reduce(&track.name, &track.points, reducer)?.predict(reference, config)
}

#[derive(Debug, Serialize)]
struct BatchRow {
    #[serde(rename = "Filename")]
    filename: String,
    #[serde(rename = "Track_Name")]
    track_name: String,
    #[serde(rename = "Distance_km")]
    distance_km: f64,
    #[serde(rename = "Ascent_m")]
    ascent_m: f64,
    #[serde(rename = "Predicted_Time_h")]
    time_h: f64,
    #[serde(rename = "Predicted_Time")]
    time: String,
    #[serde(rename = "Average_Pace")]
    average_pace: f64,
    #[serde(rename = "Status")]
    status: String,
}

pub fn write_batch_csv<W: Write>(writer: W, outcomes: &[BatchOutcome]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let row = match &outcome.result {
            Ok(p) => BatchRow {
                filename,
                track_name: p.target.clone(),
                distance_km: p.summary.total_distance_km,
                ascent_m: p.summary.total_ascent_m,
                time_h: p.summary.total_time_h,
                time: format_hours(p.summary.total_time_h),
                average_pace: p.summary.average_pace,
                status: "SUCCESS".to_string(),
            },
            Err(e) => BatchRow {
                filename,
                track_name: "ERROR".to_string(),
                distance_km: 0.0,
                ascent_m: 0.0,
                time_h: 0.0,
                time: String::new(),
                average_pace: 0.0,
                status: format!("ERROR: {}", e),
            },
        };
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
