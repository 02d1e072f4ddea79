//! # GPX Pacer
//!
//! Predicts per-segment running pace along a GPS track. A completed reference
//! run is reduced into 100 m segments, pace is regressed against each segment's
//! elevation change, and the fitted model is applied to a target track's
//! elevation profile to give pace and running time per segment.
//!
//! ```no_run
//! use gpx_pacer::{PredictionSession, SessionConfig, load_track};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), gpx_pacer::PacerError> {
//! let reference = load_track(Path::new("reference.gpx"))?;
//! let target = load_track(Path::new("target.gpx"))?;
//!
//! let mut session = PredictionSession::new(SessionConfig::default());
//! session.load_reference(&reference.name, &reference.points)?;
//! session.load_target(&target.name, &target.points)?;
//! let prediction = session.predict()?;
//! println!("finish in {:.2}h", prediction.summary.total_time_h);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{PacerError, Result};

pub mod geo_metrics;
pub use geo_metrics::{distance, gain};

pub mod track_reducer;
pub use track_reducer::{
    reduce_reference, reduce_target, RawPoint, ReducerConfig, Segment, PACE_TIME_CONSTANT,
};

pub mod model_fitter;
pub use model_fitter::{fit_model_parameters, FitConfig, FitReport, ModelParameters};

pub mod pace_predictor;
pub use pace_predictor::{predict_pace, predict_pace_raw, PaceModel, PredictionConfig};

pub mod target_pipeline;
pub use target_pipeline::{apply_prediction, PredictedSegment, PredictionSummary};

pub mod session;
pub use session::{Prediction, PredictionSession, ReferenceModel, SessionConfig, TargetTrack};

pub mod gpx_loader;
pub use gpx_loader::{load_track, parse_track, TrackFile};

pub mod library;
pub mod report;
