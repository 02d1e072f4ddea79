/// Target Pipeline - attach predicted pace and running time to reduced target segments
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model_fitter::ModelParameters;
use crate::pace_predictor::{predict_pace, PredictionConfig};
use crate::track_reducer::{Segment, PACE_TIME_CONSTANT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedSegment {
    /// The reduced segment with `pace` filled in from the model.
    pub segment: Segment,
    pub time_delta_s: f64,
    pub cumulative_time_h: f64,
}

impl PredictedSegment {
    pub fn pace(&self) -> f64 {
        self.segment.pace.unwrap_or(f64::NAN)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub segments: usize,
    pub total_distance_km: f64,
    pub total_ascent_m: f64,
    pub net_elevation_m: f64,
    pub total_time_h: f64,
    pub average_pace: f64,
    pub clamped_segments: usize,
}

/// Seconds needed to cover `distance_m` at `pace` min/km.
pub fn segment_time(distance_m: f64, pace: f64) -> f64 {
    distance_m / (PACE_TIME_CONSTANT / pace)
}

pub fn apply_prediction(
    segments: &[Segment],
    params: &ModelParameters,
    config: &PredictionConfig,
) -> Result<Vec<PredictedSegment>> {
    config.validate()?;

    let mut predicted = Vec::with_capacity(segments.len());
    let mut running_time_s = 0.0;
    let mut clamped = 0;

    for segment in segments {
        let pace = predict_pace(params, segment.elevation_delta_sum, config);
        if pace >= config.min_pace {
            clamped += 1;
        }
        if pace <= 0.0 {
            log::warn!(
                "model predicted non-positive pace {:.2} for segment {} ({:+.1} m)",
                pace,
                segment.segment_index,
                segment.elevation_delta_sum
            );
        }

        let time_delta_s = segment_time(segment.distance_sum, pace);
        running_time_s += time_delta_s;

        predicted.push(PredictedSegment {
            segment: Segment {
                pace: Some(pace),
                ..segment.clone()
            },
            time_delta_s,
            cumulative_time_h: running_time_s / 3600.0,
        });
    }

    if clamped > 0 {
        log::debug!(
            "{} of {} segments clamped to {:.1} min/km",
            clamped,
            segments.len(),
            config.min_pace
        );
    }

    Ok(predicted)
}

pub fn summarize(predicted: &[PredictedSegment], config: &PredictionConfig) -> PredictionSummary {
    let total_distance_m: f64 = predicted.iter().map(|p| p.segment.distance_sum).sum();
    let total_time_h = predicted.last().map(|p| p.cumulative_time_h).unwrap_or(0.0);
    let average_pace = if total_distance_m > 0.0 {
        (total_time_h * 60.0) / (total_distance_m / 1000.0)
    } else {
        0.0
    };

    PredictionSummary {
        segments: predicted.len(),
        total_distance_km: total_distance_m / 1000.0,
        total_ascent_m: predicted.iter().map(|p| p.segment.elevation_gain_sum).sum(),
        net_elevation_m: predicted
            .last()
            .and_then(|p| p.segment.cumulative_elevation_gain)
            .unwrap_or(0.0),
        total_time_h,
        average_pace,
        clamped_segments: predicted
            .iter()
            .filter(|p| p.pace() >= config.min_pace)
            .count(),
    }
}
