/// CSV export and console summaries for reference and predicted series
use std::io::Write;
use std::path::Path;

use csv::Writer;
use serde::Serialize;

use crate::error::Result;
use crate::model_fitter::FitReport;
use crate::session::{Prediction, ReferenceModel};
use crate::track_reducer::Segment;

#[derive(Debug, Serialize)]
struct ReferenceRow {
    #[serde(rename = "Segment")]
    segment_index: usize,
    #[serde(rename = "Cumulative_Distance_m")]
    cumulative_distance: f64,
    #[serde(rename = "Mean_Elevation_m")]
    mean_elevation: f64,
    #[serde(rename = "Elevation_Delta_m")]
    elevation_delta: f64,
    #[serde(rename = "Elapsed_Time_s")]
    elapsed_time: Option<f64>,
    #[serde(rename = "Pace_min_per_km")]
    pace: Option<f64>,
}

#[derive(Debug, Serialize)]
struct PredictionRow {
    #[serde(rename = "Segment")]
    segment_index: usize,
    #[serde(rename = "Cumulative_Distance_m")]
    cumulative_distance: f64,
    #[serde(rename = "Mean_Elevation_m")]
    mean_elevation: f64,
    #[serde(rename = "Elevation_Delta_m")]
    elevation_delta: f64,
    #[serde(rename = "Cumulative_Elevation_m")]
    cumulative_elevation: Option<f64>,
    #[serde(rename = "Pace_min_per_km")]
    pace: f64,
    #[serde(rename = "Cumulative_Time_h")]
    cumulative_time_h: f64,
}

impl From<&Segment> for ReferenceRow {
    fn from(s: &Segment) -> Self {
        ReferenceRow {
            segment_index: s.segment_index,
            cumulative_distance: s.cumulative_distance,
            mean_elevation: s.mean_elevation,
            elevation_delta: s.elevation_delta_sum,
            elapsed_time: s.elapsed_time_sum,
            pace: s.pace,
        }
    }
}

pub fn write_reference_csv<W: Write>(writer: W, segments: &[Segment]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for segment in segments {
        wtr.serialize(ReferenceRow::from(segment))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_prediction_csv<W: Write>(writer: W, prediction: &Prediction) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for predicted in &prediction.segments {
        let s = &predicted.segment;
        wtr.serialize(PredictionRow {
            segment_index: s.segment_index,
            cumulative_distance: s.cumulative_distance,
            mean_elevation: s.mean_elevation,
            elevation_delta: s.elevation_delta_sum,
            cumulative_elevation: s.cumulative_elevation_gain,
            pace: predicted.pace(),
            cumulative_time_h: predicted.cumulative_time_h,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_reference_csv(path: &Path, segments: &[Segment]) -> Result<()> {
    write_reference_csv(std::fs::File::create(path)?, segments)
}

pub fn save_prediction_csv(path: &Path, prediction: &Prediction) -> Result<()> {
    write_prediction_csv(std::fs::File::create(path)?, prediction)
}

/// `h:mm:ss` for a duration in hours.
pub fn format_hours(hours: f64) -> String {
    if !hours.is_finite() || hours < 0.0 {
        return "--:--:--".to_string();
    }
    let total = (hours * 3600.0).round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// `m:ss` for a pace in min/km.
pub fn format_pace(pace: f64) -> String {
    if !pace.is_finite() || pace < 0.0 {
        return "-:--".to_string();
    }
    let total = (pace * 60.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

pub fn print_reference_summary(reference: &ReferenceModel) {
    let report: &FitReport = &reference.report;
    let p = &reference.parameters;
    let distance_km = reference
        .segments
        .last()
        .map(|s| s.cumulative_distance / 1000.0)
        .unwrap_or(0.0);

    println!("\n🏔️  REFERENCE: {}", reference.name);
    println!("==========================");
    println!("  Distance: {:.2}km in {} segments", distance_km, report.total_segments);
    println!(
        "  Fitted on {} segments ({} uphill, {} downhill/flat)",
        report.qualifying(),
        report.uphill,
        report.downhill
    );
    if report.without_pace + report.too_slow > 0 {
        println!(
            "  ⚠️  Skipped {} untimed and {} stopped segments",
            report.without_pace, report.too_slow
        );
    }
    println!("  Linear up:   {:+.4} * Δh + {:.3}", p.a_lin_up, p.b_lin_up);
    println!("  Linear down: {:+.4} * Δh + {:.3}", p.a_lin_down, p.b_lin_down);
    println!(
        "  Parabola:    {:+.5} * Δh² {:+.4} * Δh + {:.3}",
        p.a_para, p.b_para, p.c_para
    );
    println!(
        "  Down para:   {:+.5} * Δh² {:+.4} * Δh + {:.3}",
        p.a_para_down, p.b_para_down, p.c_para_down
    );
}

pub fn print_prediction_summary(prediction: &Prediction) {
    let s = &prediction.summary;
    println!("\n⏱️  PREDICTION: {} ({} model)", prediction.target, prediction.config.model);
    println!("==========================");
    println!("  Distance:      {:.2}km", s.total_distance_km);
    println!("  Ascent:        {:.0}m (net {:+.0}m)", s.total_ascent_m, s.net_elevation_m);
    println!("  Finish time:   {}", format_hours(s.total_time_h));
    println!("  Average pace:  {} min/km", format_pace(s.average_pace));
    if s.clamped_segments > 0 {
        println!(
            "  ⚠️  {} segments capped at {} min/km",
            s.clamped_segments,
            format_pace(prediction.config.min_pace)
        );
    }
}
