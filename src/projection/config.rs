//! Projection configuration: grid, bounds, year window and scenario sets

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::engine::MethodFlags;
use super::grid::Granularity;
use super::{DEFAULT_PERCENTILES, DEFAULT_SPEEDS};
use crate::assumptions::Percentile;
use crate::error::{ConfigError, Result};

/// Which way of moving counts as progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    /// Whether the reference curve at `curve_value` has already reached
    /// `value`: at or below it when higher is better, at or above it otherwise
    pub fn reached(self, curve_value: f64, value: f64) -> bool {
        match self {
            Direction::HigherIsBetter => curve_value <= value,
            Direction::LowerIsBetter => curve_value >= value,
        }
    }
}

/// Forecast forward from the latest observation, or rebuild a counterfactual
/// path across the historical window from the earliest one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    #[default]
    Future,
    Historical,
}

/// Closed interval of valid indicator values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self { min: 0.0, max: 100.0 }
    }
}

/// Year window a projection runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionWindow {
    /// From each entity's anchor year up to `target_year`
    Future { target_year: i32 },
    /// From each entity's anchor year up to `end_year`; anchors must fall
    /// inside `[start_year, end_year]`
    Historical { start_year: i32, end_year: i32 },
}

impl ProjectionWindow {
    /// Whether a series anchored in `anchor_year` belongs to this window
    pub fn admits_anchor(&self, anchor_year: i32) -> bool {
        match *self {
            ProjectionWindow::Future { target_year } => anchor_year <= target_year,
            ProjectionWindow::Historical { start_year, end_year } => {
                (start_year..=end_year).contains(&anchor_year)
            }
        }
    }

    /// Last year any series may reach
    pub fn last_year(&self) -> i32 {
        match *self {
            ProjectionWindow::Future { target_year } => target_year,
            ProjectionWindow::Historical { end_year, .. } => end_year,
        }
    }
}

/// Rate-of-progress multiplier applied to the reference path timeline.
/// 1 is baseline pace, above 1 faster, below 1 slower.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeedMultiplier(f64);

impl SpeedMultiplier {
    pub fn new(value: f64) -> std::result::Result<Self, ConfigError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidSpeed(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    fn validate(self) -> std::result::Result<(), ConfigError> {
        Self::new(self.0).map(|_| ())
    }
}

impl PartialEq for SpeedMultiplier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SpeedMultiplier {}

impl PartialOrd for SpeedMultiplier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SpeedMultiplier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for SpeedMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters for a projection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Rounding grid applied to every stored value
    /// Default: 0.1
    #[serde(default = "default_granularity")]
    pub granularity: f64,

    /// Lowest valid indicator value
    #[serde(default = "default_min", alias = "floor")]
    pub min: f64,

    /// Highest valid indicator value
    #[serde(default = "default_max", alias = "ceiling")]
    pub max: f64,

    /// Last year of a future projection
    #[serde(default = "default_target_year")]
    pub target_year: i32,

    /// First year of the historical window
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    /// Last year of the historical window (default: current calendar year)
    #[serde(default = "default_end_year")]
    pub end_year: i32,

    /// Percentile labels for the percentile method
    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<Percentile>,

    /// Multipliers for the speed method
    #[serde(default = "default_speeds")]
    pub speeds: Vec<SpeedMultiplier>,

    #[serde(default)]
    pub direction: Direction,

    #[serde(default)]
    pub mode: ProjectionMode,
}

fn default_granularity() -> f64 { 0.1 }
fn default_min() -> f64 { 0.0 }
fn default_max() -> f64 { 100.0 }
fn default_target_year() -> i32 { 2030 }
fn default_start_year() -> i32 { 2000 }
fn default_end_year() -> i32 { chrono::Utc::now().year() }

fn default_percentiles() -> Vec<Percentile> {
    DEFAULT_PERCENTILES.into_iter().map(Percentile::from_label).collect()
}

fn default_speeds() -> Vec<SpeedMultiplier> {
    DEFAULT_SPEEDS.into_iter().map(SpeedMultiplier).collect()
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            granularity: default_granularity(),
            min: default_min(),
            max: default_max(),
            target_year: default_target_year(),
            start_year: default_start_year(),
            end_year: default_end_year(),
            percentiles: default_percentiles(),
            speeds: default_speeds(),
            direction: Direction::default(),
            mode: ProjectionMode::default(),
        }
    }
}

impl ProjectionConfig {
    /// Load from a JSON file; absent fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check every field; bounds must sit on the grid so clamping keeps
    /// values grid-aligned
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.validate_for(MethodFlags::both())
    }

    /// Like `validate`, but a scenario set is only checked when its method
    /// is requested
    pub fn validate_for(&self, methods: MethodFlags) -> std::result::Result<(), ConfigError> {
        let granularity = self.grid()?;

        if !(self.min.is_finite() && self.max.is_finite() && self.min < self.max) {
            return Err(ConfigError::InvalidBounds { min: self.min, max: self.max });
        }
        for bound in [self.min, self.max] {
            if !granularity.is_aligned(bound) {
                return Err(ConfigError::BoundOffGrid(bound, self.granularity));
            }
        }

        if methods.percentile {
            if self.percentiles.is_empty() {
                return Err(ConfigError::EmptyPercentiles);
            }
            for p in &self.percentiles {
                p.validate()?;
            }
        }

        if methods.speed {
            if self.speeds.is_empty() {
                return Err(ConfigError::EmptySpeeds);
            }
            for s in &self.speeds {
                s.validate()?;
            }
        }

        if self.mode == ProjectionMode::Historical && self.start_year > self.end_year {
            return Err(ConfigError::InvalidWindow {
                start: self.start_year,
                end: self.end_year,
            });
        }

        Ok(())
    }

    pub fn grid(&self) -> std::result::Result<Granularity, ConfigError> {
        Granularity::new(self.granularity)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.min, self.max)
    }

    pub fn window(&self) -> ProjectionWindow {
        match self.mode {
            ProjectionMode::Future => ProjectionWindow::Future {
                target_year: self.target_year,
            },
            ProjectionMode::Historical => ProjectionWindow::Historical {
                start_year: self.start_year,
                end_year: self.end_year,
            },
        }
    }
}
