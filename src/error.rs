use thiserror::Error;

use crate::tracker::{Score, ScoreMode};

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("outcomes and weights differ in length ({outcomes} != {weights})")]
    ShapeMismatch { outcomes: usize, weights: usize },
    #[error("no objective configured for the best sample tracker")]
    NotConfigured,
    #[error("weights must be finite, non-negative and not all zero")]
    DegenerateWeights,
    #[error("input sequence is empty")]
    EmptyInput,
    #[error("temperature must be positive and finite, got {0}")]
    InvalidTemperature(f64),
    #[error("score is not finite: {0}")]
    NonFiniteScore(Score),
    /// A score whose shape does not fit the configured mode, or a score
    /// shape that differs from the one already recorded in this run.
    #[error("score does not match scoring mode {mode:?}")]
    ScoreModeMismatch { mode: ScoreMode },
    #[error("column {0:?} not found in dataset")]
    MissingColumn(String),
    #[error("could not parse value {value:?} in column {column:?}, row {row}")]
    ParseValue {
        column: String,
        row: usize,
        value: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, SamplerError>;
