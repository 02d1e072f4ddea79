/// Prediction session: one reference run, one target track, one set of settings.
///
/// The reference is reduced and fitted once when loaded. The target is reduced
/// once; predictions are re-derived from its segments whenever asked, so
/// switching model or base pace never refits or re-reduces anything.
use serde::Serialize;

use crate::error::{PacerError, Result};
use crate::model_fitter::{fit_with_report, FitConfig, FitReport, ModelParameters};
use crate::pace_predictor::PredictionConfig;
use crate::target_pipeline::{apply_prediction, summarize, PredictedSegment, PredictionSummary};
use crate::track_reducer::{reduce_reference, reduce_target, RawPoint, ReducerConfig, Segment};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SessionConfig {
    pub reducer: ReducerConfig,
    pub fit: FitConfig,
    pub prediction: PredictionConfig,
}

/// A reduced and fitted reference run. Read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceModel {
    pub name: String,
    pub segments: Vec<Segment>,
    pub parameters: ModelParameters,
    pub report: FitReport,
}

impl ReferenceModel {
    pub fn fit(
        name: &str,
        points: &[RawPoint],
        reducer: &ReducerConfig,
        fit: &FitConfig,
    ) -> Result<Self> {
        let segments = reduce_reference(points, reducer)?;
        let (parameters, report) = fit_with_report(&segments, fit)?;
        log::info!(
            "fitted reference '{}' on {} of {} segments",
            name,
            report.qualifying(),
            report.total_segments
        );
        Ok(ReferenceModel {
            name: name.to_string(),
            segments,
            parameters,
            report,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetTrack {
    pub name: String,
    pub segments: Vec<Segment>,
}

impl TargetTrack {
    pub fn reduce(name: &str, points: &[RawPoint], reducer: &ReducerConfig) -> Result<Self> {
        Ok(TargetTrack {
            name: name.to_string(),
            segments: reduce_target(points, reducer)?,
        })
    }

    pub fn predict(
        &self,
        reference: &ReferenceModel,
        config: &PredictionConfig,
    ) -> Result<Prediction> {
        let segments = apply_prediction(&self.segments, &reference.parameters, config)?;
        let summary = summarize(&segments, config);
        Ok(Prediction {
            target: self.name.clone(),
            reference: reference.name.clone(),
            config: *config,
            segments,
            summary,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub target: String,
    pub reference: String,
    pub config: PredictionConfig,
    pub segments: Vec<PredictedSegment>,
    pub summary: PredictionSummary,
}

#[derive(Debug, Default)]
pub struct PredictionSession {
    config: SessionConfig,
    reference: Option<ReferenceModel>,
    target: Option<TargetTrack>,
}

impl PredictionSession {
    pub fn new(config: SessionConfig) -> Self {
        PredictionSession {
            config,
            reference: None,
            target: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn reference(&self) -> Option<&ReferenceModel> {
        self.reference.as_ref()
    }

    pub fn target(&self) -> Option<&TargetTrack> {
        self.target.as_ref()
    }

    /// Replaces the reference. On failure the previous reference is kept.
    pub fn load_reference(&mut self, name: &str, points: &[RawPoint]) -> Result<&ReferenceModel> {
        let model = ReferenceModel::fit(name, points, &self.config.reducer, &self.config.fit)?;
        Ok(&*self.reference.insert(model))
    }

    pub fn load_target(&mut self, name: &str, points: &[RawPoint]) -> Result<&TargetTrack> {
        let target = TargetTrack::reduce(name, points, &self.config.reducer)?;
        log::info!("target '{}': {} segments", name, target.segments.len());
        Ok(&*self.target.insert(target))
    }

    pub fn set_prediction_config(&mut self, prediction: PredictionConfig) -> Result<()> {
        prediction.validate()?;
        self.config.prediction = prediction;
        Ok(())
    }

    pub fn predict(&self) -> Result<Prediction> {
        let reference = self
            .reference
            .as_ref()
            .ok_or(PacerError::MissingTrack("reference"))?;
        let target = self
            .target
            .as_ref()
            .ok_or(PacerError::MissingTrack("target"))?;
        target.predict(reference, &self.config.prediction)
    }

    pub fn reset(&mut self) {
        self.reference = None;
        self.target = None;
    }
}
