//! Projection errors

use thiserror::Error;

/// Projection result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the projection engine and its loaders
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fatal configuration problems, raised before any projection runs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no projection method requested")]
    NoMethodRequested,

    #[error("percentile method requested without a change model")]
    MissingChangeModel,

    #[error("speed method requested without a reference path")]
    MissingReferencePath,

    #[error("granularity must be positive and finite, got {0}")]
    InvalidGranularity(f64),

    #[error("invalid bounds: min {min} must be below max {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("bound {0} is not a multiple of granularity {1}")]
    BoundOffGrid(f64, f64),

    #[error("percentile set is empty")]
    EmptyPercentiles,

    #[error("speed set is empty")]
    EmptySpeeds,

    #[error("speed multiplier must be positive and finite, got {0}")]
    InvalidSpeed(f64),

    #[error("percentile label must lie in 0..=100, got {0}")]
    InvalidPercentile(u8),

    #[error("change model granularity {model} differs from configured granularity {config}")]
    GranularityMismatch { model: f64, config: f64 },

    #[error("invalid year window: start {start} is after end {end}")]
    InvalidWindow { start: i32, end: i32 },
}
