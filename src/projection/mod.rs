//! Path projection engine for percentile and speed-of-progress scenarios

mod config;
mod grid;
mod percentile;
mod speed;
mod engine;
pub mod output;

pub use config::{Bounds, Direction, ProjectionConfig, ProjectionMode, ProjectionWindow, SpeedMultiplier};
pub use grid::{BoundsFilter, Granularity, SeriesCursor, SimulationGrid};
pub use percentile::PercentilePathProjector;
pub use speed::SpeedPathProjector;
pub use engine::{MethodFlags, ProjectionBundle, ProjectionEngine, ProjectionInputs};
pub use output::{ProjectedPoint, ScenarioKey};

// ============================================================================
// Default Scenario Sets
// ============================================================================
// Percentile labels and speed multipliers used when a configuration does not
// name its own.

/// Default percentile labels for the percentile method
pub const DEFAULT_PERCENTILES: [u8; 4] = [20, 40, 60, 80];

/// Default speed multipliers for the speed method (1 = reference pace)
pub const DEFAULT_SPEEDS: [f64; 5] = [0.25, 0.5, 1.0, 2.0, 4.0];
