//! Projected rows and CSV output

use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::config::SpeedMultiplier;
use crate::assumptions::Percentile;
use crate::error::Result;

/// Axis distinguishing parallel series for one entity
pub trait ScenarioKey: Copy + Ord + Send + Sync + fmt::Debug + fmt::Display + Serialize {}

impl ScenarioKey for Percentile {}
impl ScenarioKey for SpeedMultiplier {}

/// One projected value. A table holds a single scenario type, so percentile
/// and speed rows can never mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint<K> {
    pub entity_id: String,
    pub year: i32,
    pub scenario: K,
    pub value: f64,
}

impl<K> ProjectedPoint<K> {
    pub fn new(entity_id: impl Into<String>, year: i32, scenario: K, value: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            year,
            scenario,
            value,
        }
    }
}

/// Write a projected table as CSV (`entity_id,year,scenario,value`)
pub fn write_points<K: ScenarioKey, P: AsRef<Path>>(path: P, points: &[ProjectedPoint<K>]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_points_to_writer(file, points)
}

pub fn write_points_to_writer<K: ScenarioKey, W: Write>(writer: W, points: &[ProjectedPoint<K>]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for point in points {
        csv_writer.serialize(point)?;
    }
    csv_writer.flush()?;
    Ok(())
}
