//! Indicator Paths - Path projection engine for bounded indicators over entity panels
//!
//! This library provides:
//! - Percentile-path projections driven by a change-prediction lookup table
//! - Speed-of-progress projections rescaled against a canonical reference path
//! - Future (forecast) and historical (counterfactual baseline) variants of both
//! - CSV loaders for observations, baselines and model artifacts

pub mod error;
pub mod baseline;
pub mod assumptions;
pub mod projection;

// Re-export commonly used types
pub use error::{ConfigError, Error, Result};
pub use baseline::{BaselineRecord, Observation, ObservationIndex};
pub use assumptions::{ChangeModel, Percentile, ReferencePath, ReferencePoint};
pub use projection::{
    MethodFlags, ProjectedPoint, ProjectionBundle, ProjectionConfig, ProjectionEngine,
    ProjectionInputs, SpeedMultiplier,
};
