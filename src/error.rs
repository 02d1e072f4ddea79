use thiserror::Error;

/// Errors surfaced by the pacing pipeline. None of them are retried internally.
#[derive(Error, Debug)]
pub enum PacerError {
    #[error("not enough {partition} segments to fit a model (need {needed}, got {got})")]
    InputData {
        partition: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("degenerate fit: {0}")]
    DegenerateFit(String),
    #[error("unrecognized pace model: {0} (expected manual, parabolic, linear or hybrid)")]
    UnrecognizedModel(String),
    #[error("failed to parse GPX: {0}")]
    GpxParse(String),
    #[error("no trackpoints with elevation found in {0}")]
    EmptyTrack(String),
    #[error("no {0} track loaded")]
    MissingTrack(&'static str),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PacerError>;
