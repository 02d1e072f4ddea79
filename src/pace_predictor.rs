/// Pace Predictor - evaluate a fitted model for one segment's elevation change
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PacerError, Result};
use crate::model_fitter::ModelParameters;

pub const DEFAULT_BASE_PACE: f64 = 5.0;
pub const DEFAULT_MIN_PACE: f64 = 19.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaceModel {
    /// Base pace plus fixed per-meter penalties.
    Manual,
    /// One parabola over all segments.
    Parabolic,
    /// Separate lines for uphill and downhill.
    Linear,
    /// Uphill line, downhill parabola.
    Hybrid,
}

impl PaceModel {
    pub const ALL: [PaceModel; 4] = [
        PaceModel::Manual,
        PaceModel::Parabolic,
        PaceModel::Linear,
        PaceModel::Hybrid,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PaceModel::Manual => "manual",
            PaceModel::Parabolic => "parabolic",
            PaceModel::Linear => "linear",
            PaceModel::Hybrid => "hybrid",
        }
    }
}

impl Default for PaceModel {
    fn default() -> Self {
        PaceModel::Linear
    }
}

impl fmt::Display for PaceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaceModel {
    type Err = PacerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manual" => Ok(PaceModel::Manual),
            "parabolic" => Ok(PaceModel::Parabolic),
            "linear" => Ok(PaceModel::Linear),
            "hybrid" => Ok(PaceModel::Hybrid),
            other => Err(PacerError::UnrecognizedModel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    pub model: PaceModel,
    /// min/km, only read by the manual model.
    pub base_pace: f64,
    /// Numeric ceiling on predicted pace (min/km).
    pub min_pace: f64,
    /// Scales every raw prediction by `1 + pct / 100` before clamping.
    pub pace_adjust_percent: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            model: PaceModel::default(),
            base_pace: DEFAULT_BASE_PACE,
            min_pace: DEFAULT_MIN_PACE,
            pace_adjust_percent: 0.0,
        }
    }
}

impl PredictionConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.base_pace.is_finite() || self.base_pace <= 0.0 {
            return Err(PacerError::InvalidParameter(format!(
                "base pace must be positive, got {}",
                self.base_pace
            )));
        }
        if !self.min_pace.is_finite() || self.min_pace <= 0.0 {
            return Err(PacerError::InvalidParameter(format!(
                "min pace must be positive, got {}",
                self.min_pace
            )));
        }
        if !self.pace_adjust_percent.is_finite() || self.pace_adjust_percent <= -100.0 {
            return Err(PacerError::InvalidParameter(format!(
                "pace adjustment must be above -100%, got {}",
                self.pace_adjust_percent
            )));
        }
        Ok(())
    }
}

/// Unclamped model output in min/km.
pub fn predict_pace_raw(
    params: &ModelParameters,
    elevation_delta: f64,
    base_pace: f64,
    model: PaceModel,
) -> f64 {
    match model {
        PaceModel::Manual => {
            if elevation_delta > 0.0 {
                base_pace + elevation_delta * params.uphill_penalty_per_m
            } else {
                base_pace + elevation_delta.abs() * params.downhill_penalty_per_m
            }
        }
        PaceModel::Parabolic => parabola(
            params.a_para,
            params.b_para,
            params.c_para,
            elevation_delta,
        ),
        PaceModel::Linear => {
            if elevation_delta >= 0.0 {
                params.a_lin_up * elevation_delta + params.b_lin_up
            } else {
                params.a_lin_down * elevation_delta + params.b_lin_down
            }
        }
        PaceModel::Hybrid => {
            if elevation_delta > 0.0 {
                params.a_lin_up * elevation_delta + params.b_lin_up
            } else {
                parabola(
                    params.a_para_down,
                    params.b_para_down,
                    params.c_para_down,
                    elevation_delta,
                )
            }
        }
    }
}

/// Adjusted and clamped prediction: never numerically above `config.min_pace`.
pub fn predict_pace(params: &ModelParameters, elevation_delta: f64, config: &PredictionConfig) -> f64 {
    let raw = predict_pace_raw(params, elevation_delta, config.base_pace, config.model);
    let adjusted = raw * (1.0 + config.pace_adjust_percent / 100.0);
    adjusted.min(config.min_pace)
}

/// String-keyed entry point for callers holding a model name from user input.
pub fn predict_pace_named(
    params: &ModelParameters,
    elevation_delta: f64,
    base_pace: f64,
    model_name: &str,
    min_pace: f64,
) -> Result<f64> {
    let config = PredictionConfig {
        model: model_name.parse()?,
        base_pace,
        min_pace,
        ..PredictionConfig::default()
    };
    Ok(predict_pace(params, elevation_delta, &config))
}

fn parabola(a: f64, b: f64, c: f64, x: f64) -> f64 {
    a * x * x + b * x + c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ModelParameters {
        ModelParameters {
            uphill_penalty_per_m: 0.3,
            downhill_penalty_per_m: 0.15,
            a_para: 0.01,
            b_para: 0.1,
            c_para: 6.0,
            a_para_down: 0.02,
            b_para_down: 0.05,
            c_para_down: 5.5,
            a_lin_up: 0.25,
            b_lin_up: 6.2,
            a_lin_down: -0.08,
            b_lin_down: 5.4,
        }
    }

    fn config(model: PaceModel) -> PredictionConfig {
        PredictionConfig {
            model,
            ..PredictionConfig::default()
        }
    }

    #[test]
    fn model_names_round_trip() {
        for model in PaceModel::ALL {
            assert_eq!(model.name().parse::<PaceModel>().unwrap(), model);
        }
        assert!(matches!(
            "cubic".parse::<PaceModel>(),
            Err(PacerError::UnrecognizedModel(name)) if name == "cubic"
        ));
        assert!("Linear".parse::<PaceModel>().is_err());
    }

    #[test]
    fn manual_model_penalises_both_directions() {
        let p = params();
        assert!((predict_pace_raw(&p, 10.0, 5.0, PaceModel::Manual) - 8.0).abs() < 1e-12);
        assert!((predict_pace_raw(&p, -10.0, 5.0, PaceModel::Manual) - 6.5).abs() < 1e-12);
        assert_eq!(predict_pace_raw(&p, 0.0, 5.0, PaceModel::Manual), 5.0);
    }

    #[test]
    fn manual_model_is_monotonic_in_magnitude() {
        let p = params();
        let cfg = PredictionConfig {
            min_pace: 1000.0,
            ..config(PaceModel::Manual)
        };
        let mut prev = predict_pace(&p, 0.0, &cfg);
        for d in 1..40 {
            let next = predict_pace(&p, d as f64, &cfg);
            assert!(next > prev);
            prev = next;
        }
        let mut prev = predict_pace(&p, 0.0, &cfg);
        for d in 1..40 {
            let next = predict_pace(&p, -(d as f64), &cfg);
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn linear_uses_uphill_line_at_zero() {
        let p = params();
        assert_eq!(predict_pace_raw(&p, 0.0, 5.0, PaceModel::Linear), 6.2);
        assert!((predict_pace_raw(&p, -5.0, 5.0, PaceModel::Linear) - 5.8).abs() < 1e-12);
    }

    #[test]
    fn hybrid_uses_downhill_parabola_at_zero() {
        let p = params();
        assert_eq!(predict_pace_raw(&p, 0.0, 5.0, PaceModel::Hybrid), 5.5);
        let up = predict_pace_raw(&p, 4.0, 5.0, PaceModel::Hybrid);
        assert!((up - 7.2).abs() < 1e-12);
        let down = predict_pace_raw(&p, -10.0, 5.0, PaceModel::Hybrid);
        assert!((down - (2.0 - 0.5 + 5.5)).abs() < 1e-12);
    }

    #[test]
    fn parabolic_ignores_direction() {
        let p = params();
        let v = predict_pace_raw(&p, -10.0, 5.0, PaceModel::Parabolic);
        assert!((v - (1.0 - 1.0 + 6.0)).abs() < 1e-12);
    }

    #[test]
    fn predictions_never_exceed_min_pace() {
        let p = params();
        for model in PaceModel::ALL {
            let cfg = config(model);
            for d in -200..=200 {
                let pace = predict_pace(&p, d as f64, &cfg);
                assert!(pace <= cfg.min_pace, "{} at {} gave {}", model, d, pace);
            }
        }
        assert_eq!(predict_pace(&p, 500.0, &config(PaceModel::Manual)), 19.0);
    }

    #[test]
    fn adjustment_scales_before_clamp() {
        let p = params();
        let cfg = PredictionConfig {
            pace_adjust_percent: 10.0,
            ..config(PaceModel::Linear)
        };
        assert!((predict_pace(&p, 0.0, &cfg) - 6.82).abs() < 1e-12);

        let cfg = PredictionConfig {
            pace_adjust_percent: 300.0,
            ..config(PaceModel::Linear)
        };
        assert_eq!(predict_pace(&p, 0.0, &cfg), 19.0);
    }

    #[test]
    fn named_prediction_fails_fast_on_unknown_model() {
        let p = params();
        assert_eq!(predict_pace_named(&p, 0.0, 5.0, "linear", 19.0).unwrap(), 6.2);
        assert!(matches!(
            predict_pace_named(&p, 0.0, 5.0, "spline", 19.0),
            Err(PacerError::UnrecognizedModel(_))
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = PredictionConfig {
            base_pace: 0.0,
            ..PredictionConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = PredictionConfig {
            pace_adjust_percent: -100.0,
            ..PredictionConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(PredictionConfig::default().validate().is_ok());
    }
}
